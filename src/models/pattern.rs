use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The geometric shape a route candidate can take.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RouteShape {
    OutAndBack,
    Loop,
    Lollipop,
    /// Degradation target only (a "loop" that turned out to be a single
    /// stretch); never emitted as a recommendation.
    PointToPoint,
}

impl fmt::Display for RouteShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteShape::OutAndBack => write!(f, "out-and-back"),
            RouteShape::Loop => write!(f, "loop"),
            RouteShape::Lollipop => write!(f, "lollipop"),
            RouteShape::PointToPoint => write!(f, "point-to-point"),
        }
    }
}

impl FromStr for RouteShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "out_and_back" | "outandback" => Ok(RouteShape::OutAndBack),
            "loop" => Ok(RouteShape::Loop),
            "lollipop" => Ok(RouteShape::Lollipop),
            "point_to_point" | "p2p" => Ok(RouteShape::PointToPoint),
            _ => Err(format!("Invalid route shape: '{}'", s)),
        }
    }
}

/// One rung of the tolerance ladder: acceptable fractional deviation of
/// achieved distance and elevation from the pattern target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToleranceLevel {
    pub label: String,
    /// Fractional distance tolerance (0.10 = ±10%).
    pub distance_pct: f64,
    /// Fractional elevation tolerance.
    pub elevation_pct: f64,
}

impl ToleranceLevel {
    pub fn new(label: impl Into<String>, distance_pct: f64, elevation_pct: f64) -> Self {
        ToleranceLevel {
            label: label.into(),
            distance_pct,
            elevation_pct,
        }
    }

    /// The default ladder: strict, then relaxed, then wide.
    pub fn default_ladder() -> Vec<ToleranceLevel> {
        vec![
            ToleranceLevel::new("strict", 0.10, 0.10),
            ToleranceLevel::new("relaxed", 0.25, 0.25),
            ToleranceLevel::new("wide", 0.50, 0.50),
        ]
    }
}

/// A target route profile: desired distance and elevation gain under a
/// given shape, with an escalation ladder of tolerance levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub pattern_name: String,
    pub target_distance_km: f64,
    pub target_elevation_gain_m: f64,
    pub shape: RouteShape,
    /// Tried in order until enough routes are accepted.
    #[serde(default = "ToleranceLevel::default_ladder")]
    pub tolerance_levels: Vec<ToleranceLevel>,
}

impl Pattern {
    pub fn new(
        name: impl Into<String>,
        target_distance_km: f64,
        target_elevation_gain_m: f64,
        shape: RouteShape,
    ) -> Self {
        Pattern {
            pattern_name: name.into(),
            target_distance_km,
            target_elevation_gain_m,
            shape,
            tolerance_levels: ToleranceLevel::default_ladder(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.target_distance_km <= 0.0 {
            return Err(format!(
                "Pattern '{}': target_distance_km must be positive",
                self.pattern_name
            ));
        }
        if self.target_elevation_gain_m < 0.0 {
            return Err(format!(
                "Pattern '{}': target_elevation_gain_m must be non-negative",
                self.pattern_name
            ));
        }
        if self.tolerance_levels.is_empty() {
            return Err(format!(
                "Pattern '{}': at least one tolerance level required",
                self.pattern_name
            ));
        }
        if self.shape == RouteShape::PointToPoint {
            return Err(format!(
                "Pattern '{}': point-to-point is not a requestable shape",
                self.pattern_name
            ));
        }
        Ok(())
    }

    /// The widest configured distance tolerance, as a fraction.
    pub fn max_distance_pct(&self) -> f64 {
        self.tolerance_levels
            .iter()
            .map(|l| l.distance_pct)
            .fold(0.0, f64::max)
    }
}
