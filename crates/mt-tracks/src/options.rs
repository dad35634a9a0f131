//! Tracking options.

use mt_core::Real;

use crate::error::{TrackError, TrackResult};
use crate::quadrature::PolarKind;

/// Immutable tracking configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrackOptions {
    /// Azimuthal angles over [0, 2π); must be a multiple of 4.
    pub num_azim: usize,
    /// Target perpendicular distance between parallel tracks (cm).
    pub spacing: Real,
    /// Polar angles over the full sphere; must be even.
    pub num_polar: usize,
    pub polar_kind: PolarKind,
    /// Geometric tolerance for ray tracing (cm).
    pub tolerance: Real,
    /// Segment cap per track before the ray is declared stuck.
    pub max_segments_per_track: usize,
    /// Worker threads for ray tracing.
    pub num_threads: usize,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            num_azim: 16,
            spacing: 0.05,
            num_polar: 6,
            polar_kind: PolarKind::TabuchiYamamoto,
            tolerance: 1e-9,
            max_segments_per_track: 100_000,
            num_threads: 1,
        }
    }
}

impl TrackOptions {
    pub fn validate(&self) -> TrackResult<()> {
        let bad = |what: String| Err(TrackError::Config { what });
        if self.num_azim == 0 || self.num_azim % 4 != 0 {
            return bad(format!(
                "num_azim must be a positive multiple of 4, got {}",
                self.num_azim
            ));
        }
        if !(self.spacing.is_finite() && self.spacing > 0.0) {
            return bad(format!("spacing must be positive, got {}", self.spacing));
        }
        if self.num_polar == 0 || self.num_polar % 2 != 0 {
            return bad(format!(
                "num_polar must be a positive even number, got {}",
                self.num_polar
            ));
        }
        if self.polar_kind == PolarKind::TabuchiYamamoto && self.num_polar > 6 {
            return bad(format!(
                "Tabuchi-Yamamoto quadrature supports up to 6 polar angles, got {}",
                self.num_polar
            ));
        }
        if self.polar_kind == PolarKind::GaussLegendre && self.num_polar > 12 {
            return bad(format!(
                "Gauss-Legendre quadrature supports up to 12 polar angles, got {}",
                self.num_polar
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return bad(format!("tolerance must be positive, got {}", self.tolerance));
        }
        if self.max_segments_per_track == 0 {
            return bad("max_segments_per_track must be positive".to_string());
        }
        if self.num_threads == 0 {
            return bad("num_threads must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(TrackOptions::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_angles() {
        for num_azim in [0, 6, 10] {
            let opts = TrackOptions {
                num_azim,
                ..Default::default()
            };
            assert!(matches!(opts.validate(), Err(TrackError::Config { .. })));
        }
        let odd_polar = TrackOptions {
            num_polar: 3,
            ..Default::default()
        };
        assert!(odd_polar.validate().is_err());
        let ty_too_many = TrackOptions {
            num_polar: 8,
            ..Default::default()
        };
        assert!(ty_too_many.validate().is_err());
        let gl_many = TrackOptions {
            num_polar: 8,
            polar_kind: PolarKind::GaussLegendre,
            ..Default::default()
        };
        assert!(gl_many.validate().is_ok());
    }

    #[test]
    fn gauss_legendre_caps_polar_angles_at_twelve() {
        let at_cap = TrackOptions {
            num_polar: 12,
            polar_kind: PolarKind::GaussLegendre,
            ..Default::default()
        };
        assert!(at_cap.validate().is_ok());
        let over_cap = TrackOptions {
            num_polar: 14,
            ..at_cap
        };
        assert!(matches!(over_cap.validate(), Err(TrackError::Config { .. })));
    }

    #[test]
    fn rejects_bad_spacing_and_threads() {
        let zero_spacing = TrackOptions {
            spacing: 0.0,
            ..Default::default()
        };
        assert!(zero_spacing.validate().is_err());
        let no_threads = TrackOptions {
            num_threads: 0,
            ..Default::default()
        };
        assert!(no_threads.validate().is_err());
    }
}
