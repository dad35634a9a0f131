//! Rectangular lattice of pin cells.

use core::f64::consts::TAU;
use core::ops::Range;

use mt_core::{CellId, Direction, MaterialId, Point, Real, RegionId};

use crate::geometry::{BoundaryType, BoundingBox, Crossing, Geometry, Side};

/// One radial zone of a pin cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    /// Outer radius; `None` for the zone filling the rest of the lattice cell.
    pub outer_radius: Option<Real>,
    pub material: MaterialId,
    /// Number of equal azimuthal wedges the zone is split into.
    pub sectors: u32,
}

/// A universe placed in lattice positions: concentric rings plus an outer zone.
#[derive(Debug, Clone, PartialEq)]
pub struct PinCell {
    pub name: String,
    pub zones: Vec<Zone>,
}

impl PinCell {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            zones: Vec::new(),
        }
    }

    /// Append a ring of the given outer radius.
    pub fn ring(mut self, radius: Real, material: MaterialId, sectors: u32) -> Self {
        self.zones.push(Zone {
            outer_radius: Some(radius),
            material,
            sectors,
        });
        self
    }

    /// Append the unbounded outer zone.
    pub fn outer(mut self, material: MaterialId, sectors: u32) -> Self {
        self.zones.push(Zone {
            outer_radius: None,
            material,
            sectors,
        });
        self
    }

    /// A pin cell made of a single material.
    pub fn homogeneous(name: impl Into<String>, material: MaterialId, sectors: u32) -> Self {
        Self::new(name).outer(material, sectors)
    }

    /// Number of regions one placement of this pin cell creates.
    pub fn num_regions(&self) -> usize {
        self.zones.iter().map(|z| z.sectors as usize).sum()
    }
}

/// Where a region sits in the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionInfo {
    pub cell: CellId,
    pub zone: usize,
    pub sector: u32,
    pub material: MaterialId,
}

/// Pin cell with precomputed region layout.
#[derive(Debug, Clone)]
pub(crate) struct PreparedPin {
    pub(crate) pin: PinCell,
    /// Region offset of each zone within one placement; len zones + 1.
    pub(crate) zone_offsets: Vec<usize>,
    /// Ring radii, one per bounded zone, increasing.
    pub(crate) radii: Vec<Real>,
    /// Distinct sector boundary half-lines (directions from the cell center).
    pub(crate) sector_lines: Vec<Direction>,
}

impl PreparedPin {
    pub(crate) fn new(pin: PinCell) -> Self {
        let mut zone_offsets = Vec::with_capacity(pin.zones.len() + 1);
        let mut offset = 0;
        for zone in &pin.zones {
            zone_offsets.push(offset);
            offset += zone.sectors as usize;
        }
        zone_offsets.push(offset);

        let radii = pin
            .zones
            .iter()
            .filter_map(|z| z.outer_radius)
            .collect::<Vec<_>>();

        let mut angles: Vec<Real> = Vec::new();
        for zone in pin.zones.iter().filter(|z| z.sectors > 1) {
            let wedge = TAU / zone.sectors as Real;
            for k in 0..zone.sectors {
                let a = wedge * k as Real;
                if !angles.iter().any(|&b| (a - b).abs() < 1e-12) {
                    angles.push(a);
                }
            }
        }
        let sector_lines = angles.into_iter().map(Direction::from_angle).collect();

        Self {
            pin,
            zone_offsets,
            radii,
            sector_lines,
        }
    }

    /// Local region offset (zone base + sector) of a point relative to the cell center.
    fn local_region(&self, rel: Point) -> (usize, u32) {
        let r = rel.norm();
        let zone = self
            .radii
            .iter()
            .position(|&radius| r < radius)
            .unwrap_or(self.radii.len());
        let sectors = self.pin.zones[zone].sectors;
        let sector = if sectors > 1 {
            sector_of(rel, sectors)
        } else {
            0
        };
        (zone, sector)
    }
}

/// Sector index of an offset from the cell center.
///
/// The wedge `[2πk/n, 2π(k+1)/n)` is sector `k`: a point exactly on a
/// boundary angle belongs to the wedge that starts there.
pub(crate) fn sector_of(rel: Point, sectors: u32) -> u32 {
    let mut angle = rel.y.atan2(rel.x);
    if angle < 0.0 {
        angle += TAU;
    }
    let wedge = TAU / sectors as Real;
    let k = (angle / wedge).floor() as u32;
    k.min(sectors - 1)
}

/// A validated lattice geometry. Build with [`crate::LatticeBuilder`].
#[derive(Debug, Clone)]
pub struct LatticeGeometry {
    pub(crate) bbox: BoundingBox,
    pub(crate) nx: usize,
    pub(crate) ny: usize,
    pub(crate) pitch_x: Real,
    pub(crate) pitch_y: Real,
    pub(crate) boundaries: [BoundaryType; 4],
    pub(crate) materials: Vec<String>,
    pub(crate) pins: Vec<PreparedPin>,
    /// Pin index per lattice position, row-major from the bottom-left.
    pub(crate) layout: Vec<usize>,
    /// First region id of each lattice position; len nx*ny + 1.
    pub(crate) cell_offsets: Vec<usize>,
    pub(crate) regions: Vec<RegionInfo>,
    /// Distance below which crossings are treated as the current point.
    pub(crate) eps: Real,
}

impl LatticeGeometry {
    pub fn num_x(&self) -> usize {
        self.nx
    }

    pub fn num_y(&self) -> usize {
        self.ny
    }

    pub fn pitch(&self) -> (Real, Real) {
        (self.pitch_x, self.pitch_y)
    }

    /// Region metadata in region-id order.
    pub fn regions(&self) -> &[RegionInfo] {
        &self.regions
    }

    pub fn region_info(&self, region: RegionId) -> Option<&RegionInfo> {
        self.regions.get(region.idx())
    }

    /// All regions of the lattice position `(ix, iy)`.
    pub fn cell_regions(&self, ix: usize, iy: usize) -> Range<usize> {
        let c = iy * self.nx + ix;
        self.cell_offsets[c]..self.cell_offsets[c + 1]
    }

    /// Regions of one zone at lattice position `(ix, iy)`.
    pub fn zone_regions(&self, ix: usize, iy: usize, zone: usize) -> Range<usize> {
        let c = iy * self.nx + ix;
        let base = self.cell_offsets[c];
        let offsets = &self.pins[self.layout[c]].zone_offsets;
        base + offsets[zone]..base + offsets[zone + 1]
    }

    /// Center of lattice position `(ix, iy)`.
    pub fn cell_center(&self, ix: usize, iy: usize) -> Point {
        Point::new(
            self.bbox.x_min + (ix as Real + 0.5) * self.pitch_x,
            self.bbox.y_min + (iy as Real + 0.5) * self.pitch_y,
        )
    }

    /// Lattice position holding `p` (clamped onto the lattice).
    pub fn cell_index(&self, p: Point) -> (usize, usize) {
        let fx = ((p.x - self.bbox.x_min) / self.pitch_x).floor();
        let fy = ((p.y - self.bbox.y_min) / self.pitch_y).floor();
        let ix = (fx.max(0.0) as usize).min(self.nx - 1);
        let iy = (fy.max(0.0) as usize).min(self.ny - 1);
        (ix, iy)
    }

    fn offer(best: &mut (Real, Option<Side>), t: Real, side: Option<Side>) {
        if t < best.0 {
            *best = (t, side);
        }
    }
}

#[inline]
fn cross(a: Point, dir: Direction) -> Real {
    a.x * dir.sin - a.y * dir.cos
}

impl Geometry for LatticeGeometry {
    fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    fn boundary_type(&self, side: Side) -> BoundaryType {
        self.boundaries[side.index()]
    }

    fn num_regions(&self) -> usize {
        self.regions.len()
    }

    fn region_at(&self, p: Point) -> Option<RegionId> {
        if !self.bbox.contains(p) {
            return None;
        }
        let (ix, iy) = self.cell_index(p);
        let c = iy * self.nx + ix;
        let prepared = &self.pins[self.layout[c]];
        let (zone, sector) = prepared.local_region(p - self.cell_center(ix, iy));
        let id = self.cell_offsets[c] + prepared.zone_offsets[zone] + sector as usize;
        Some(RegionId::from_usize(id))
    }

    fn region_material(&self, region: RegionId) -> MaterialId {
        self.regions[region.idx()].material
    }

    fn material_name(&self, material: MaterialId) -> &str {
        &self.materials[material.idx()]
    }

    fn num_materials(&self) -> usize {
        self.materials.len()
    }

    fn next_crossing(&self, p: Point, dir: Direction) -> Option<Crossing> {
        let eps = self.eps;
        let ahead = p.advance(dir, eps);
        if !self.bbox.contains(ahead) {
            return None;
        }
        let (ix, iy) = self.cell_index(ahead);
        let mut best: (Real, Option<Side>) = (Real::INFINITY, None);

        // Lattice walls; the outermost ones are the domain edge.
        if dir.cos > 0.0 {
            let x = self.bbox.x_min + (ix + 1) as Real * self.pitch_x;
            let side = (ix + 1 == self.nx).then_some(Side::XMax);
            Self::offer(&mut best, (x - p.x) / dir.cos, side);
        } else if dir.cos < 0.0 {
            let x = self.bbox.x_min + ix as Real * self.pitch_x;
            let side = (ix == 0).then_some(Side::XMin);
            Self::offer(&mut best, (x - p.x) / dir.cos, side);
        }
        if dir.sin > 0.0 {
            let y = self.bbox.y_min + (iy + 1) as Real * self.pitch_y;
            let side = (iy + 1 == self.ny).then_some(Side::YMax);
            Self::offer(&mut best, (y - p.y) / dir.sin, side);
        } else if dir.sin < 0.0 {
            let y = self.bbox.y_min + iy as Real * self.pitch_y;
            let side = (iy == 0).then_some(Side::YMin);
            Self::offer(&mut best, (y - p.y) / dir.sin, side);
        }

        let prepared = &self.pins[self.layout[iy * self.nx + ix]];
        let rel = p - self.cell_center(ix, iy);

        // Rings: |rel + t·u|² = R²
        let b = rel.dot(dir);
        let c0 = rel.x * rel.x + rel.y * rel.y;
        for &radius in &prepared.radii {
            let disc = b * b - (c0 - radius * radius);
            if disc <= 0.0 {
                continue;
            }
            let sq = disc.sqrt();
            for t in [-b - sq, -b + sq] {
                if t > eps {
                    Self::offer(&mut best, t, None);
                }
            }
        }

        // Sector half-lines from the cell center
        for &line in &prepared.sector_lines {
            let denom = dir.cos * line.sin - dir.sin * line.cos;
            if denom.abs() < 1e-14 {
                continue;
            }
            let t = -cross(rel, line) / denom;
            if t <= eps {
                continue;
            }
            let hit = rel.advance(dir, t);
            if hit.dot(line) > eps {
                Self::offer(&mut best, t, None);
            }
        }

        let (distance, side) = best;
        if !distance.is_finite() {
            return None;
        }
        Some(Crossing {
            point: p.advance(dir, distance),
            distance,
            boundary: side.map(|s| (s, self.boundaries[s.index()])),
        })
    }
}
