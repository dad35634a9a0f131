//! Geometry validation logic.

use mt_core::Real;

use crate::error::GeometryError;
use crate::geometry::{BoundaryType, Side};
use crate::lattice::PinCell;

fn positive(what: &'static str, value: Real) -> Result<(), GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidDimension { what, value })
    }
}

pub(crate) fn validate_lattice(
    nx: usize,
    ny: usize,
    pitch_x: Real,
    pitch_y: Real,
) -> Result<(), GeometryError> {
    positive("nx", nx as Real)?;
    positive("ny", ny as Real)?;
    positive("pitch_x", pitch_x)?;
    positive("pitch_y", pitch_y)?;
    Ok(())
}

/// Periodic sides must come in opposite pairs.
pub(crate) fn validate_boundaries(boundaries: &[BoundaryType; 4]) -> Result<(), GeometryError> {
    for (side, axis) in [(Side::XMin, 'x'), (Side::YMin, 'y')] {
        let lo = boundaries[side.index()] == BoundaryType::Periodic;
        let hi = boundaries[side.opposite().index()] == BoundaryType::Periodic;
        if lo != hi {
            return Err(GeometryError::UnpairedPeriodic { axis });
        }
    }
    Ok(())
}

pub(crate) fn validate_pin(
    pin: &PinCell,
    pitch_x: Real,
    pitch_y: Real,
    num_materials: usize,
) -> Result<(), GeometryError> {
    let last = pin.zones.len().checked_sub(1).ok_or_else(|| {
        GeometryError::MissingOuterZone {
            pin: pin.name.clone(),
        }
    })?;
    if pin.zones[last].outer_radius.is_some() {
        return Err(GeometryError::MissingOuterZone {
            pin: pin.name.clone(),
        });
    }

    let limit = 0.5 * pitch_x.min(pitch_y);
    let mut previous = 0.0;
    for (i, zone) in pin.zones.iter().enumerate() {
        if zone.sectors == 0 {
            return Err(GeometryError::ZeroSectors {
                pin: pin.name.clone(),
                zone: i,
            });
        }
        if zone.material.idx() >= num_materials {
            return Err(GeometryError::UnknownMaterial {
                material: zone.material,
            });
        }
        match zone.outer_radius {
            Some(radius) => {
                if !(radius.is_finite() && radius > previous) {
                    return Err(GeometryError::RadiusOrder {
                        pin: pin.name.clone(),
                        zone: i,
                    });
                }
                if radius > limit {
                    return Err(GeometryError::RadiusTooLarge {
                        pin: pin.name.clone(),
                        radius,
                        limit,
                    });
                }
                previous = radius;
            }
            None if i != last => {
                return Err(GeometryError::RadiusOrder {
                    pin: pin.name.clone(),
                    zone: i,
                });
            }
            None => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_core::MaterialId;

    #[test]
    fn rejects_unpaired_periodic() {
        let mut b = [BoundaryType::Reflective; 4];
        b[Side::XMin.index()] = BoundaryType::Periodic;
        assert_eq!(
            validate_boundaries(&b),
            Err(GeometryError::UnpairedPeriodic { axis: 'x' })
        );
        b[Side::XMax.index()] = BoundaryType::Periodic;
        assert!(validate_boundaries(&b).is_ok());
    }

    #[test]
    fn rejects_bad_radii() {
        let m = MaterialId::from_index(0);
        let shrinking = PinCell::new("p").ring(0.4, m, 1).ring(0.3, m, 1).outer(m, 1);
        assert!(matches!(
            validate_pin(&shrinking, 1.0, 1.0, 1),
            Err(GeometryError::RadiusOrder { zone: 1, .. })
        ));

        let too_big = PinCell::new("p").ring(0.6, m, 1).outer(m, 1);
        assert!(matches!(
            validate_pin(&too_big, 1.0, 1.0, 1),
            Err(GeometryError::RadiusTooLarge { .. })
        ));

        let open = PinCell::new("p").ring(0.3, m, 1);
        assert!(matches!(
            validate_pin(&open, 1.0, 1.0, 1),
            Err(GeometryError::MissingOuterZone { .. })
        ));
    }

    #[test]
    fn rejects_zero_sectors_and_unknown_material() {
        let m = MaterialId::from_index(0);
        let zero = PinCell::homogeneous("p", m, 0);
        assert!(matches!(
            validate_pin(&zero, 1.0, 1.0, 1),
            Err(GeometryError::ZeroSectors { zone: 0, .. })
        ));
        let unknown = PinCell::homogeneous("p", MaterialId::from_index(3), 1);
        assert!(matches!(
            validate_pin(&unknown, 1.0, 1.0, 1),
            Err(GeometryError::UnknownMaterial { .. })
        ));
    }
}
