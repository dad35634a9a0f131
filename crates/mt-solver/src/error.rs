//! Error types for solver operations.

use mt_core::error::MtError;
use mt_geometry::GeometryError;
use mt_tracks::TrackError;
use mt_xs::XsError;
use thiserror::Error;

use crate::solver::Solution;

/// Errors that can occur while setting up or running a transport solve.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Configuration error: {what}")]
    Configuration { what: String },

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Track generation error: {0}")]
    Tracks(#[from] TrackError),

    #[error("Cross-section error: {0}")]
    CrossSections(#[from] XsError),

    /// Flux became non-finite or exceeded the divergence limit.
    #[error("Numerical divergence at iteration {iteration}: {what}")]
    NumericalDivergence {
        iteration: usize,
        what: String,
        last_finite: Box<Solution>,
    },

    #[error("Invalid state: {what}")]
    InvalidState { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for MtError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::Configuration { what } => MtError::InvalidArg { what },
            SolverError::Geometry(g) => g.into(),
            SolverError::Tracks(t) => t.into(),
            SolverError::CrossSections(x) => x.into(),
            other => MtError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
