//! Error types for track generation.

use mt_core::{MtError, Real};
use thiserror::Error;

/// Errors that abort track generation.
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Invalid tracking option: {what}")]
    Config { what: String },

    /// The ray left the geometry or hit the segment cap before its end point.
    #[error(
        "Track {track} did not terminate: traced {travelled:.6} of {length:.6} cm in {segments} segments"
    )]
    RayNotTerminated {
        track: usize,
        travelled: Real,
        length: Real,
        segments: usize,
    },

    /// A region was never crossed by any track.
    #[error("Region {region} has zero volume (not reached by any track)")]
    ZeroVolume { region: usize },

    /// The geometry classified a point into a region it does not declare.
    #[error("Region {region} out of range ({num_regions} regions)")]
    RegionOutOfRange { region: usize, num_regions: usize },

    /// A track end could not be matched with a partner track.
    #[error("No {boundary} partner for track {track} at ({x:.6}, {y:.6})")]
    Link {
        track: usize,
        boundary: &'static str,
        x: Real,
        y: Real,
    },

    #[error("Thread pool error: {message}")]
    ThreadPool { message: String },
}

pub type TrackResult<T> = Result<T, TrackError>;

impl From<TrackError> for MtError {
    fn from(e: TrackError) -> Self {
        match e {
            TrackError::Config { what } => MtError::InvalidArg { what },
            other => MtError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
