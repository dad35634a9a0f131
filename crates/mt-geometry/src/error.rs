//! Geometry-specific error types.

use mt_core::{MaterialId, MtError, Real};

/// Geometry construction and validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A lattice dimension (pitch, count) is zero, negative or non-finite.
    InvalidDimension { what: &'static str, value: Real },

    /// A lattice position was never assigned a pin cell.
    UnfilledCell { ix: usize, iy: usize },

    /// A lattice position refers to a pin cell that was never added.
    UnknownPinCell { index: usize },

    /// A zone refers to a material that was never declared.
    UnknownMaterial { material: MaterialId },

    /// A pin cell has no zones, or its last zone is bounded.
    MissingOuterZone { pin: String },

    /// A bounded zone follows the unbounded outer zone or radii do not increase.
    RadiusOrder { pin: String, zone: usize },

    /// A ring does not fit inside the lattice cell.
    RadiusTooLarge {
        pin: String,
        radius: Real,
        limit: Real,
    },

    /// A zone requests zero angular sectors.
    ZeroSectors { pin: String, zone: usize },

    /// Only one side of an axis is periodic.
    UnpairedPeriodic { axis: char },
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::InvalidDimension { what, value } => {
                write!(f, "Invalid lattice dimension {}: {}", what, value)
            }
            GeometryError::UnfilledCell { ix, iy } => {
                write!(f, "Lattice position ({}, {}) has no pin cell", ix, iy)
            }
            GeometryError::UnknownPinCell { index } => {
                write!(f, "Pin cell {} was never added", index)
            }
            GeometryError::UnknownMaterial { material } => {
                write!(f, "Material {} was never declared", material)
            }
            GeometryError::MissingOuterZone { pin } => {
                write!(f, "Pin cell '{}' must end with an unbounded outer zone", pin)
            }
            GeometryError::RadiusOrder { pin, zone } => {
                write!(
                    f,
                    "Pin cell '{}' zone {} breaks increasing radius order",
                    pin, zone
                )
            }
            GeometryError::RadiusTooLarge { pin, radius, limit } => {
                write!(
                    f,
                    "Pin cell '{}' ring radius {} exceeds half pitch {}",
                    pin, radius, limit
                )
            }
            GeometryError::ZeroSectors { pin, zone } => {
                write!(f, "Pin cell '{}' zone {} has zero sectors", pin, zone)
            }
            GeometryError::UnpairedPeriodic { axis } => {
                write!(
                    f,
                    "Periodic boundary on the {} axis must be set on both sides",
                    axis
                )
            }
        }
    }
}

impl std::error::Error for GeometryError {}

impl From<GeometryError> for MtError {
    fn from(err: GeometryError) -> Self {
        MtError::Invariant {
            what: err.to_string(),
        }
    }
}
