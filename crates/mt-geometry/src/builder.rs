//! Incremental lattice builder.

use mt_core::{MaterialId, Real};

use crate::error::GeometryError;
use crate::geometry::{BoundaryType, BoundingBox, Side};
use crate::lattice::{LatticeGeometry, PinCell, PreparedPin, RegionInfo};
use crate::validate;

/// Builder for a rectangular lattice of pin cells.
///
/// Declare materials and pin cells, place pin cells in lattice positions,
/// choose boundary conditions, then call `build()` to validate and freeze the
/// geometry into an immutable [`LatticeGeometry`].
#[derive(Debug)]
pub struct LatticeBuilder {
    nx: usize,
    ny: usize,
    pitch_x: Real,
    pitch_y: Real,
    origin: (Real, Real),
    boundaries: [BoundaryType; 4],
    materials: Vec<String>,
    pins: Vec<PinCell>,
    layout: Vec<Option<usize>>,
}

impl LatticeBuilder {
    /// Lattice of `nx` × `ny` positions with the given pitches (cm), origin at (0, 0).
    pub fn new(nx: usize, ny: usize, pitch_x: Real, pitch_y: Real) -> Self {
        Self {
            nx,
            ny,
            pitch_x,
            pitch_y,
            origin: (0.0, 0.0),
            boundaries: [BoundaryType::Vacuum; 4],
            materials: Vec::new(),
            pins: Vec::new(),
            layout: vec![None; nx * ny],
        }
    }

    /// Move the lower-left corner of the lattice.
    pub fn set_origin(&mut self, x_min: Real, y_min: Real) -> &mut Self {
        self.origin = (x_min, y_min);
        self
    }

    /// Declare a material by name; repeated names return the same id.
    pub fn add_material(&mut self, name: impl Into<String>) -> MaterialId {
        let name = name.into();
        if let Some(i) = self.materials.iter().position(|m| *m == name) {
            return MaterialId::from_usize(i);
        }
        self.materials.push(name);
        MaterialId::from_usize(self.materials.len() - 1)
    }

    /// Register a pin cell and return its index for placement.
    pub fn add_pin_cell(&mut self, pin: PinCell) -> usize {
        self.pins.push(pin);
        self.pins.len() - 1
    }

    /// Place a pin cell at lattice position `(ix, iy)` (iy = 0 is the bottom row).
    pub fn set_cell(&mut self, ix: usize, iy: usize, pin: usize) -> &mut Self {
        if ix < self.nx && iy < self.ny {
            self.layout[iy * self.nx + ix] = Some(pin);
        }
        self
    }

    /// Place the same pin cell everywhere.
    pub fn fill(&mut self, pin: usize) -> &mut Self {
        self.layout.iter_mut().for_each(|slot| *slot = Some(pin));
        self
    }

    pub fn set_boundary(&mut self, side: Side, boundary: BoundaryType) -> &mut Self {
        self.boundaries[side.index()] = boundary;
        self
    }

    pub fn set_all_boundaries(&mut self, boundary: BoundaryType) -> &mut Self {
        self.boundaries = [boundary; 4];
        self
    }

    /// Validate and freeze the geometry.
    pub fn build(self) -> Result<LatticeGeometry, GeometryError> {
        validate::validate_lattice(self.nx, self.ny, self.pitch_x, self.pitch_y)?;
        validate::validate_boundaries(&self.boundaries)?;
        for pin in &self.pins {
            validate::validate_pin(pin, self.pitch_x, self.pitch_y, self.materials.len())?;
        }

        let mut layout = Vec::with_capacity(self.layout.len());
        for (c, slot) in self.layout.iter().enumerate() {
            let pin = slot.ok_or(GeometryError::UnfilledCell {
                ix: c % self.nx,
                iy: c / self.nx,
            })?;
            if pin >= self.pins.len() {
                return Err(GeometryError::UnknownPinCell { index: pin });
            }
            layout.push(pin);
        }

        let pins: Vec<PreparedPin> = self.pins.into_iter().map(PreparedPin::new).collect();

        // Regions are numbered by lattice position, then zone, then sector.
        let mut cell_offsets = Vec::with_capacity(layout.len() + 1);
        let mut regions = Vec::new();
        for (c, &pin_idx) in layout.iter().enumerate() {
            cell_offsets.push(regions.len());
            let cell = mt_core::CellId::from_usize(c);
            for (zone_idx, zone) in pins[pin_idx].pin.zones.iter().enumerate() {
                for sector in 0..zone.sectors {
                    regions.push(RegionInfo {
                        cell,
                        zone: zone_idx,
                        sector,
                        material: zone.material,
                    });
                }
            }
        }
        cell_offsets.push(regions.len());

        let (x_min, y_min) = self.origin;
        let bbox = BoundingBox {
            x_min,
            x_max: x_min + self.nx as Real * self.pitch_x,
            y_min,
            y_max: y_min + self.ny as Real * self.pitch_y,
        };
        let eps = 1e-12 * bbox.width().max(bbox.height());

        Ok(LatticeGeometry {
            bbox,
            nx: self.nx,
            ny: self.ny,
            pitch_x: self.pitch_x,
            pitch_y: self.pitch_y,
            boundaries: self.boundaries,
            materials: self.materials,
            pins,
            layout,
            cell_offsets,
            regions,
            eps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Geometry;

    #[test]
    fn material_names_are_deduplicated() {
        let mut b = LatticeBuilder::new(1, 1, 1.0, 1.0);
        let a = b.add_material("water");
        let c = b.add_material("fuel");
        assert_eq!(b.add_material("water"), a);
        assert_ne!(a, c);
    }

    #[test]
    fn unfilled_position_is_rejected() {
        let mut b = LatticeBuilder::new(2, 1, 1.0, 1.0);
        let m = b.add_material("water");
        let pin = b.add_pin_cell(PinCell::homogeneous("w", m, 1));
        b.set_cell(0, 0, pin);
        assert_eq!(
            b.build().unwrap_err(),
            GeometryError::UnfilledCell { ix: 1, iy: 0 }
        );
    }

    #[test]
    fn region_numbering_follows_cells_then_zones() {
        let mut b = LatticeBuilder::new(2, 1, 1.0, 1.0);
        let fuel = b.add_material("fuel");
        let water = b.add_material("water");
        let pin = b.add_pin_cell(PinCell::new("pin").ring(0.3, fuel, 1).outer(water, 2));
        let plain = b.add_pin_cell(PinCell::homogeneous("w", water, 1));
        b.set_cell(0, 0, pin).set_cell(1, 0, plain);
        let g = b.build().unwrap();
        assert_eq!(g.num_regions(), 4);
        assert_eq!(g.cell_regions(0, 0), 0..3);
        assert_eq!(g.cell_regions(1, 0), 3..4);
        assert_eq!(g.zone_regions(0, 0, 1), 1..3);
        assert_eq!(g.regions()[0].material, fuel);
        assert_eq!(g.regions()[3].material, water);
    }
}
