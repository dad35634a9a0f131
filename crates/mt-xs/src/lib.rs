//! mt-xs: multigroup macroscopic cross sections for moctrace.
//!
//! Provides:
//! - `Material`: per-group total, scattering matrix and fission data
//! - `MaterialLibrary`: materials keyed by name, with a uniform group count
//!
//! # Example
//!
//! ```
//! use mt_xs::{Material, MaterialLibrary};
//!
//! let water = Material::new("water", 1)
//!     .with_total(vec![1.0])
//!     .with_scatter(vec![0.9]);
//! let mut library = MaterialLibrary::new();
//! library.insert(water).unwrap();
//!
//! let xs = library.cross_sections("water", 0).unwrap();
//! assert!((xs.sigma_t - 1.0).abs() < 1e-15);
//! assert!((library.get("water").unwrap().absorption(0) - 0.1).abs() < 1e-12);
//! ```

pub mod error;
pub mod library;
pub mod material;

pub use error::{XsError, XsResult};
pub use library::MaterialLibrary;
pub use material::{GroupXs, Material};
