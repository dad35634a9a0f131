/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

/// Relative difference `|new - old| / |new|`, or `None` when `new` is zero.
///
/// Entries with a zero reference value carry no relative information and are
/// skipped by the residual norms.
#[inline]
pub fn relative_change(new: Real, old: Real) -> Option<Real> {
    if new == 0.0 {
        None
    } else {
        Some(((new - old) / new).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn relative_change_skips_zero_reference() {
        assert_eq!(relative_change(0.0, 1.0), None);
        let rc = relative_change(2.0, 1.0).unwrap();
        assert!((rc - 0.5).abs() < 1e-15);
    }
}
