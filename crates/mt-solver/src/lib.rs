//! Method-of-characteristics neutron transport solver.
//!
//! The solver sweeps the tracks produced by `mt-tracks` and iterates on the
//! scattering and fission source until the scalar flux converges. It
//! supports flat or linear sources per region, fixed-source and eigenvalue
//! problems, and vacuum, reflective or periodic boundaries. Source iteration
//! can be accelerated with coarse mesh finite difference (see [`cmfd`]).
//!
//! # Example
//!
//! ```
//! use mt_geometry::{BoundaryType, LatticeBuilder, PinCell};
//! use mt_solver::{MocSolver, SolverOptions};
//! use mt_xs::{Material, MaterialLibrary};
//! use mt_core::RegionId;
//!
//! let mut builder = LatticeBuilder::new(1, 1, 1.0, 1.0);
//! let water = builder.add_material("water");
//! let pin = builder.add_pin_cell(PinCell::homogeneous("box", water, 1));
//! builder.fill(pin).set_all_boundaries(BoundaryType::Reflective);
//! let geometry = builder.build().unwrap();
//!
//! let library = MaterialLibrary::from_materials([Material::new("water", 1)
//!     .with_total(vec![1.0])
//!     .with_scatter(vec![0.5])])
//! .unwrap();
//!
//! let options = SolverOptions {
//!     num_azim: 4,
//!     track_spacing: 0.2,
//!     num_polar: 2,
//!     ..Default::default()
//! };
//! let mut solver = MocSolver::new(&geometry, &library, options).unwrap();
//! solver.set_fixed_source(RegionId::from_index(0), 0, 1.0).unwrap();
//! let solution = solver.solve().unwrap();
//!
//! assert!(solution.converged);
//! // Infinite medium: φ = Q / Σa
//! assert!((solution.flux(RegionId::from_index(0), 0) - 2.0).abs() < 1e-4);
//! ```

pub mod cmfd;
pub mod convergence;
pub mod error;
pub mod exponentials;
pub mod fsr;
pub mod options;
pub mod solver;
pub mod source;
pub mod sweep;

pub use cmfd::{Cmfd, CmfdStep, CoarseMesh};
pub use convergence::{ConvergenceMonitor, ResidualNorm, SolverState};
pub use error::{SolverError, SolverResult};
pub use fsr::{FsrRow, FsrTable};
pub use options::{CmfdOptions, SolveMode, SolverOptions, SourceMode};
pub use solver::{MocSolver, SolveProgressEvent, Solution};
pub use source::{FixedSource, SourceUpdater};
pub use sweep::{SweepEngine, SweepTally};
