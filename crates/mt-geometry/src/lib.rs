//! mt-geometry: the geometry interface consumed by track generation.
//!
//! Provides:
//! - The `Geometry` trait: region/material lookup, boundary conditions and
//!   next-surface queries for a finalized 2D domain
//! - `LatticeGeometry`: a rectangular lattice of pin cells, each split into
//!   concentric zones and angular sectors
//! - `LatticeBuilder` with validation
//!
//! # Example
//!
//! ```
//! use mt_geometry::{BoundaryType, LatticeBuilder, PinCell, Geometry};
//!
//! let mut builder = LatticeBuilder::new(1, 1, 1.26, 1.26);
//! let fuel = builder.add_material("fuel");
//! let water = builder.add_material("water");
//! let pin = builder.add_pin_cell(PinCell::new("pin").ring(0.54, fuel, 1).outer(water, 4));
//! builder.fill(pin);
//! builder.set_all_boundaries(BoundaryType::Reflective);
//! let geometry = builder.build().unwrap();
//!
//! assert_eq!(geometry.num_regions(), 5);
//! ```

pub mod builder;
pub mod error;
pub mod geometry;
pub mod lattice;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::LatticeBuilder;
pub use error::GeometryError;
pub use geometry::{BoundaryType, BoundingBox, Crossing, Geometry, Side};
pub use lattice::{LatticeGeometry, PinCell, RegionInfo, Zone};
