//! The read-only geometry interface consumed by ray tracing.

use mt_core::{Direction, MaterialId, Point, Real, RegionId};

/// Boundary condition applied where a track leaves the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BoundaryType {
    /// No incoming flux; outgoing flux is counted as leakage.
    #[default]
    Vacuum,
    /// Flux returns along the mirror-image track.
    Reflective,
    /// Flux re-enters at the translated point on the opposite side.
    Periodic,
}

/// One side of the rectangular domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    XMin,
    XMax,
    YMin,
    YMax,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::XMin, Side::XMax, Side::YMin, Side::YMax];

    /// Index into per-side arrays.
    pub fn index(self) -> usize {
        match self {
            Side::XMin => 0,
            Side::XMax => 1,
            Side::YMin => 2,
            Side::YMax => 3,
        }
    }

    /// The side facing this one across the domain.
    pub fn opposite(self) -> Side {
        match self {
            Side::XMin => Side::XMax,
            Side::XMax => Side::XMin,
            Side::YMin => Side::YMax,
            Side::YMax => Side::YMin,
        }
    }

    /// True for the two sides normal to the x axis.
    pub fn is_x(self) -> bool {
        matches!(self, Side::XMin | Side::XMax)
    }
}

/// Axis-aligned bounding box of the domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x_min: Real,
    pub x_max: Real,
    pub y_min: Real,
    pub y_max: Real,
}

impl BoundingBox {
    pub fn width(&self) -> Real {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> Real {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> Real {
        self.width() * self.height()
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    /// Side on which a boundary point lies, within `tol`.
    pub fn side_of(&self, p: Point, tol: Real) -> Option<Side> {
        if (p.x - self.x_min).abs() <= tol {
            Some(Side::XMin)
        } else if (p.x - self.x_max).abs() <= tol {
            Some(Side::XMax)
        } else if (p.y - self.y_min).abs() <= tol {
            Some(Side::YMin)
        } else if (p.y - self.y_max).abs() <= tol {
            Some(Side::YMax)
        } else {
            None
        }
    }
}

/// The next surface a ray meets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Crossing location.
    pub point: Point,
    /// Distance travelled from the query point.
    pub distance: Real,
    /// Set when the surface is the domain edge.
    pub boundary: Option<(Side, BoundaryType)>,
}

/// A finalized 2D domain that can be ray traced.
///
/// Region ids are dense (`0..num_regions()`); each region has exactly one
/// material. Implementations must be immutable once built: track generation
/// queries them from several threads at once.
pub trait Geometry: Send + Sync {
    fn bounding_box(&self) -> BoundingBox;

    fn boundary_type(&self, side: Side) -> BoundaryType;

    /// Number of flat source regions the geometry defines.
    fn num_regions(&self) -> usize;

    /// Region containing `p`, or `None` outside the domain.
    fn region_at(&self, p: Point) -> Option<RegionId>;

    /// Material of a region.
    fn region_material(&self, region: RegionId) -> MaterialId;

    /// Name of a material, used to resolve cross sections.
    fn material_name(&self, material: MaterialId) -> &str;

    /// Number of distinct materials referenced by the geometry.
    fn num_materials(&self) -> usize;

    /// Material at `p`, or `None` outside the domain.
    fn material_at(&self, p: Point) -> Option<MaterialId> {
        self.region_at(p).map(|r| self.region_material(r))
    }

    /// Next surface crossed by the ray leaving `p` along `dir`.
    ///
    /// Crossings at (numerically) zero distance are ignored so that a ray
    /// sitting on a surface advances to the following one. Returns `None`
    /// when `p` is outside the domain or the ray is already leaving it.
    fn next_crossing(&self, p: Point, dir: Direction) -> Option<Crossing>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_helpers() {
        assert_eq!(Side::XMin.opposite(), Side::XMax);
        assert!(Side::XMax.is_x());
        assert!(!Side::YMin.is_x());
        let idx: Vec<usize> = Side::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(idx, vec![0, 1, 2, 3]);
    }

    #[test]
    fn bbox_side_detection() {
        let b = BoundingBox {
            x_min: 0.0,
            x_max: 2.0,
            y_min: -1.0,
            y_max: 1.0,
        };
        assert_eq!(b.side_of(Point::new(2.0, 0.3), 1e-9), Some(Side::XMax));
        assert_eq!(b.side_of(Point::new(0.5, -1.0), 1e-9), Some(Side::YMin));
        assert_eq!(b.side_of(Point::new(0.5, 0.5), 1e-9), None);
        assert!((b.area() - 4.0).abs() < 1e-15);
    }
}
