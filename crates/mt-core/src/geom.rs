//! Plain 2D points and unit directions.

use crate::Real;
use core::ops::{Add, Sub};

/// A point in the x-y plane (cm).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: Real,
    pub y: Real,
}

impl Point {
    pub const fn new(x: Real, y: Real) -> Self {
        Self { x, y }
    }

    /// Point reached after travelling `distance` along `dir`.
    #[inline]
    pub fn advance(self, dir: Direction, distance: Real) -> Self {
        Self {
            x: self.x + dir.cos * distance,
            y: self.y + dir.sin * distance,
        }
    }

    pub fn distance(self, other: Point) -> Real {
        (self - other).norm()
    }

    #[inline]
    pub fn norm(self) -> Real {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn dot(self, dir: Direction) -> Real {
        self.x * dir.cos + self.y * dir.sin
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Unit direction in the x-y plane, stored as (cos φ, sin φ).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Direction {
    pub cos: Real,
    pub sin: Real,
}

impl Direction {
    pub fn from_angle(phi: Real) -> Self {
        let (sin, cos) = phi.sin_cos();
        Self { cos, sin }
    }

    /// The opposite direction (φ + π).
    #[inline]
    pub fn reversed(self) -> Self {
        Self {
            cos: -self.cos,
            sin: -self.sin,
        }
    }

    /// Angle in [0, 2π).
    pub fn angle(self) -> Real {
        let a = self.sin.atan2(self.cos);
        if a < 0.0 {
            a + core::f64::consts::TAU
        } else {
            a
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn advance_along_axis() {
        let p = Point::new(1.0, 2.0).advance(Direction::from_angle(FRAC_PI_2), 3.0);
        assert!((p.x - 1.0).abs() < 1e-12);
        assert!((p.y - 5.0).abs() < 1e-12);
    }

    #[test]
    fn reversed_angle_adds_pi() {
        let d = Direction::from_angle(0.3);
        assert!((d.reversed().angle() - (0.3 + PI)).abs() < 1e-12);
    }
}
