//! Stage S5: the three route enumerators. Each consumes the frozen graph
//! and produces [`Candidate`](crate::models::Candidate)s; they are
//! independent and run as parallel jobs.

mod lollipop;
mod loops;
mod out_and_back;

pub use lollipop::{edge_overlap_pct, LollipopEnumerator};
pub use loops::{classify_circuit, CircuitClass, LoopEnumerator};
pub use out_and_back::OutAndBackEnumerator;
