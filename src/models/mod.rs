pub mod bbox;
pub mod geometry;
pub mod graph;
pub mod pattern;
pub mod point;
pub mod recommendation;
pub mod trail;

pub use bbox::Bbox;
pub use geometry::{ClosestLocation, LineString3D};
pub use graph::{DirectedEdge, Edge, TrailGraph, Vertex, VertexKind};
pub use pattern::{Pattern, RouteShape, ToleranceLevel};
pub use point::{Point3D, EARTH_RADIUS_M, GRID_DECIMALS};
pub use recommendation::{Candidate, ConstituentTrail, Recommendation, RouteEdgeRecord};
pub use trail::{IntersectionKind, IntersectionParticipant, IntersectionPoint, Segment, Trail};
