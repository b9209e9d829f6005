use crate::models::{Bbox, LineString3D, Point3D};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw input trail, prior to splitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trail {
    pub trail_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trail_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    pub geometry: LineString3D,
    pub length_km: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    pub bbox: Bbox,
    /// True when the source had no elevation data and zeros were filled in.
    #[serde(default)]
    pub elevation_deficient: bool,
}

impl Trail {
    pub fn new(name: impl Into<String>, geometry: LineString3D) -> Self {
        let mut trail = Trail {
            trail_id: Uuid::new_v4(),
            name: name.into(),
            trail_type: None,
            surface: None,
            difficulty: None,
            length_km: 0.0,
            elevation_gain_m: 0.0,
            elevation_loss_m: 0.0,
            bbox: geometry.bbox(),
            geometry,
            elevation_deficient: false,
        };
        trail.recompute_metrics();
        trail
    }

    /// Recompute length, elevation stats, and bbox from the geometry.
    pub fn recompute_metrics(&mut self) {
        self.length_km = self.geometry.length_km();
        let (gain, loss) = self.geometry.elevation_gain_loss();
        self.elevation_gain_m = gain;
        self.elevation_loss_m = loss;
        self.bbox = self.geometry.bbox();
    }

    /// True when the stored length disagrees with the geodesic length by
    /// more than one meter.
    pub fn length_inconsistent(&self) -> bool {
        (self.length_km * 1000.0 - self.geometry.length_m()).abs() > 1.0
    }
}

/// One piece of a split trail; the routable precursor of an edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: Uuid,
    pub original_trail_uuid: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trail_type: Option<String>,
    pub geometry: LineString3D,
    pub length_km: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    #[serde(default)]
    pub elevation_deficient: bool,
}

impl Segment {
    /// Derive a segment from its parent trail, recomputing metrics from the
    /// child geometry.
    pub fn from_parent(parent: &Trail, geometry: LineString3D) -> Self {
        let (gain, loss) = geometry.elevation_gain_loss();
        Segment {
            segment_id: Uuid::new_v4(),
            original_trail_uuid: parent.trail_id,
            name: parent.name.clone(),
            trail_type: parent.trail_type.clone(),
            length_km: geometry.length_km(),
            elevation_gain_m: gain,
            elevation_loss_m: loss,
            geometry,
            elevation_deficient: parent.elevation_deficient,
        }
    }

    /// A whole-trail segment for trails that needed no splitting.
    pub fn whole(parent: &Trail) -> Self {
        Segment::from_parent(parent, parent.geometry.clone())
    }

    /// A child of this segment produced by splitting. Keeps the original
    /// trail lineage across resolver iterations.
    pub fn derive(&self, geometry: LineString3D) -> Self {
        let (gain, loss) = geometry.elevation_gain_loss();
        Segment {
            segment_id: Uuid::new_v4(),
            original_trail_uuid: self.original_trail_uuid,
            name: self.name.clone(),
            trail_type: self.trail_type.clone(),
            length_km: geometry.length_km(),
            elevation_gain_m: gain,
            elevation_loss_m: loss,
            geometry,
            elevation_deficient: self.elevation_deficient,
        }
    }
}

/// Classification of a detected intersection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntersectionKind {
    /// Geometries actually touch or cross.
    Exact,
    /// One trail's endpoint lies in the interior of another, within tolerance.
    Y,
    /// Two trails meeting in two or more points (X- and P-shapes).
    Multipoint,
}

/// A trail's participation in an intersection: which trail, and where along
/// it (arc-length fraction) the intersection point falls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntersectionParticipant {
    pub trail_id: Uuid,
    pub fraction: f64,
}

/// An intersection point emitted by the resolver, consumed by the splitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntersectionPoint {
    pub point: Point3D,
    pub kind: IntersectionKind,
    pub participants: Vec<IntersectionParticipant>,
}

impl IntersectionPoint {
    pub fn participant_fraction(&self, trail_id: Uuid) -> Option<f64> {
        self.participants
            .iter()
            .find(|p| p.trail_id == trail_id)
            .map(|p| p.fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(f64, f64, f64)]) -> LineString3D {
        LineString3D::new(
            points
                .iter()
                .map(|&(lon, lat, elev)| Point3D::new(lon, lat, elev).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn trail_metrics_recomputed_on_build() {
        let trail = Trail::new(
            "Ridge Path",
            line(&[(2.35, 48.85, 100.0), (2.35, 48.86, 180.0)]),
        );
        assert!((trail.length_km - 1.112).abs() < 0.01);
        assert_eq!(trail.elevation_gain_m, 80.0);
        assert_eq!(trail.elevation_loss_m, 0.0);
    }

    #[test]
    fn length_inconsistency_detection() {
        let mut trail = Trail::new(
            "Ridge Path",
            line(&[(2.35, 48.85, 0.0), (2.35, 48.86, 0.0)]),
        );
        assert!(!trail.length_inconsistent());
        trail.length_km += 0.5;
        assert!(trail.length_inconsistent());
    }

    #[test]
    fn segment_inherits_parent_metadata() {
        let mut trail = Trail::new(
            "Ridge Path",
            line(&[(2.35, 48.85, 0.0), (2.35, 48.86, 0.0)]),
        );
        trail.trail_type = Some("singletrack".to_string());
        trail.elevation_deficient = true;

        let child_geom = trail.geometry.slice(0.0, 0.5).unwrap();
        let segment = Segment::from_parent(&trail, child_geom);

        assert_eq!(segment.original_trail_uuid, trail.trail_id);
        assert_eq!(segment.name, "Ridge Path");
        assert_eq!(segment.trail_type.as_deref(), Some("singletrack"));
        assert!(segment.elevation_deficient);
        assert!((segment.length_km - trail.length_km / 2.0).abs() < 0.001);
    }

    #[test]
    fn intersection_participant_lookup() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ip = IntersectionPoint {
            point: Point3D::new(2.35, 48.85, 0.0).unwrap(),
            kind: IntersectionKind::Y,
            participants: vec![
                IntersectionParticipant { trail_id: a, fraction: 1.0 },
                IntersectionParticipant { trail_id: b, fraction: 0.5 },
            ],
        };
        assert_eq!(ip.participant_fraction(b), Some(0.5));
        assert_eq!(ip.participant_fraction(Uuid::new_v4()), None);
    }
}
