//! Track generation for 2D method-of-characteristics transport.
//!
//! This crate lays a cyclic set of parallel tracks over a [`Geometry`],
//! ray traces each one into region segments, links track ends through the
//! boundary conditions, and integrates region volumes and centroids from the
//! segments.
//!
//! [`Geometry`]: mt_geometry::Geometry

pub mod error;
pub mod generator;
pub mod laydown;
pub mod linking;
pub mod options;
pub mod quadrature;
pub mod raytrace;
pub mod track;

pub use error::{TrackError, TrackResult};
pub use generator::{TrackGenerator, TrackSet};
pub use options::TrackOptions;
pub use quadrature::{AzimuthalAngle, PolarKind, PolarQuadrature, Quadrature};
pub use track::{Segment, Track, TrackLink};
