//! mt-core: stable foundation for moctrace.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - ids (compact IDs for regions, tracks, materials and cells)
//! - geom (2D points and directions shared by geometry and tracking)
//! - error (shared error types)
//! - timing (opt-in accumulating timers for the expensive phases)

pub mod error;
pub mod geom;
pub mod ids;
pub mod numeric;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use error::MtError;
pub use geom::{Direction, Point};
pub use ids::*;
pub use numeric::*;
