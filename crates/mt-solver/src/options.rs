//! Solver configuration.

use mt_core::Real;
use mt_tracks::{PolarKind, TrackOptions};

use crate::convergence::ResidualNorm;
use crate::error::{SolverError, SolverResult};

/// Spatial shape of the source within each flat source region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SourceMode {
    #[default]
    Flat,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SolveMode {
    /// Inhomogeneous problem driven by fixed sources; fission uses k = 1.
    #[default]
    FixedSource,
    /// k-eigenvalue problem by power iteration.
    Eigenvalue,
}

/// Coarse mesh finite difference acceleration settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CmfdOptions {
    /// Mesh cells along x and y, laid uniformly over the domain. Every
    /// region must fall inside one mesh cell.
    pub mesh: [usize; 2],
    /// Fine groups collapsed into each coarse group, listed in order.
    /// `None` keeps one coarse group per fine group.
    pub group_structure: Option<Vec<Vec<usize>>>,
    /// Rescale the fine flux by the coarse solution and take its k. When off
    /// the coarse solve is only reported.
    pub flux_update: bool,
    /// Convergence tolerance of the coarse power iteration
    pub source_tolerance: Real,
    pub max_iterations: usize,
}

impl Default for CmfdOptions {
    fn default() -> Self {
        Self {
            mesh: [1, 1],
            group_structure: None,
            flux_update: true,
            source_tolerance: 1e-10,
            max_iterations: 1000,
        }
    }
}

impl CmfdOptions {
    pub fn validate(&self) -> SolverResult<()> {
        let bad = |what: String| Err(SolverError::Configuration { what });
        if self.mesh.contains(&0) {
            return bad(format!("cmfd mesh must be at least 1x1, got {:?}", self.mesh));
        }
        if !(self.source_tolerance.is_finite() && self.source_tolerance > 0.0) {
            return bad(format!(
                "cmfd source_tolerance must be positive, got {}",
                self.source_tolerance
            ));
        }
        if self.max_iterations == 0 {
            return bad("cmfd max_iterations must be positive".to_string());
        }
        Ok(())
    }

    /// Coarse group of every fine group.
    pub fn group_map(&self, num_groups: usize) -> SolverResult<Vec<usize>> {
        let Some(structure) = &self.group_structure else {
            return Ok((0..num_groups).collect());
        };
        let mut map = Vec::with_capacity(num_groups);
        for (coarse, fine) in structure.iter().enumerate() {
            if fine.is_empty() {
                return Err(SolverError::Configuration {
                    what: format!("cmfd coarse group {coarse} holds no fine group"),
                });
            }
            for &g in fine {
                if g != map.len() {
                    return Err(SolverError::Configuration {
                        what: format!(
                            "cmfd group structure must list fine groups 0..{num_groups} in order, found {g}"
                        ),
                    });
                }
                map.push(coarse);
            }
        }
        if map.len() != num_groups {
            return Err(SolverError::Configuration {
                what: format!(
                    "cmfd group structure covers {} of {num_groups} groups",
                    map.len()
                ),
            });
        }
        Ok(map)
    }
}

/// Transport solve configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverOptions {
    /// Azimuthal angles over [0, 2π); multiple of 4.
    pub num_azim: usize,
    /// Track spacing (cm)
    pub track_spacing: Real,
    /// Polar angles over the full sphere; even.
    pub num_polar: usize,
    pub polar_quadrature: PolarKind,
    /// Convergence tolerance on the flux residual (and on k in eigenvalue mode)
    pub tolerance: Real,
    pub max_iterations: usize,
    /// Passing checks required in a row before declaring convergence
    pub consecutive_converged: usize,
    pub residual_norm: ResidualNorm,
    pub source_mode: SourceMode,
    /// Keep negative scalar fluxes instead of clamping them to zero
    pub allow_negative_flux: bool,
    pub num_threads: usize,
    pub mode: SolveMode,
    /// Ray-tracing tolerance (cm)
    pub geometry_tolerance: Real,
    pub max_segments_per_track: usize,
    /// Scalar flux magnitude treated as divergence
    pub divergence_limit: Real,
    /// Coarse mesh acceleration; off when `None`.
    pub cmfd: Option<CmfdOptions>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            num_azim: 16,
            track_spacing: 0.05,
            num_polar: 6,
            polar_quadrature: PolarKind::TabuchiYamamoto,
            tolerance: 1e-6,
            max_iterations: 1000,
            consecutive_converged: 1,
            residual_norm: ResidualNorm::RelativeL2,
            source_mode: SourceMode::Flat,
            allow_negative_flux: false,
            num_threads: 1,
            mode: SolveMode::FixedSource,
            geometry_tolerance: 1e-9,
            max_segments_per_track: 100_000,
            divergence_limit: 1e30,
            cmfd: None,
        }
    }
}

impl SolverOptions {
    /// Options forwarded to track generation.
    pub fn track_options(&self) -> TrackOptions {
        TrackOptions {
            num_azim: self.num_azim,
            spacing: self.track_spacing,
            num_polar: self.num_polar,
            polar_kind: self.polar_quadrature,
            tolerance: self.geometry_tolerance,
            max_segments_per_track: self.max_segments_per_track,
            num_threads: self.num_threads,
        }
    }

    pub fn validate(&self) -> SolverResult<()> {
        self.track_options()
            .validate()
            .map_err(|e| SolverError::Configuration {
                what: e.to_string(),
            })?;
        let bad = |what: String| Err(SolverError::Configuration { what });
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return bad(format!("tolerance must be positive, got {}", self.tolerance));
        }
        if self.max_iterations == 0 {
            return bad("max_iterations must be positive".to_string());
        }
        if self.consecutive_converged == 0 {
            return bad("consecutive_converged must be positive".to_string());
        }
        if !(self.divergence_limit.is_finite() && self.divergence_limit > 0.0) {
            return bad(format!(
                "divergence_limit must be positive and finite, got {}",
                self.divergence_limit
            ));
        }
        if let Some(cmfd) = &self.cmfd {
            cmfd.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SolverOptions::default().validate().is_ok());
    }

    #[test]
    fn bad_values_are_configuration_errors() {
        let cases = [
            SolverOptions {
                num_azim: 0,
                ..Default::default()
            },
            SolverOptions {
                num_azim: 10,
                ..Default::default()
            },
            SolverOptions {
                num_polar: 5,
                ..Default::default()
            },
            SolverOptions {
                tolerance: 0.0,
                ..Default::default()
            },
            SolverOptions {
                max_iterations: 0,
                ..Default::default()
            },
            SolverOptions {
                num_threads: 0,
                ..Default::default()
            },
            SolverOptions {
                track_spacing: -1.0,
                ..Default::default()
            },
            SolverOptions {
                cmfd: Some(CmfdOptions {
                    mesh: [0, 2],
                    ..Default::default()
                }),
                ..Default::default()
            },
        ];
        for opts in cases {
            assert!(
                matches!(opts.validate(), Err(SolverError::Configuration { .. })),
                "{opts:?}"
            );
        }
    }

    #[test]
    fn track_options_carry_tracking_fields() {
        let opts = SolverOptions {
            num_azim: 32,
            track_spacing: 0.02,
            num_threads: 3,
            ..Default::default()
        };
        let t = opts.track_options();
        assert_eq!(t.num_azim, 32);
        assert_eq!(t.spacing, 0.02);
        assert_eq!(t.num_threads, 3);
    }

    #[test]
    fn cmfd_group_structure_maps_fine_to_coarse() {
        let identity = CmfdOptions::default();
        assert_eq!(identity.group_map(3).unwrap(), vec![0, 1, 2]);

        let collapsed = CmfdOptions {
            group_structure: Some(vec![vec![0, 1], vec![2]]),
            ..Default::default()
        };
        assert_eq!(collapsed.group_map(3).unwrap(), vec![0, 0, 1]);
        assert!(collapsed.group_map(4).is_err());

        for structure in [vec![vec![1], vec![0]], vec![vec![0], vec![]], vec![vec![0, 2]]] {
            let opts = CmfdOptions {
                group_structure: Some(structure),
                ..Default::default()
            };
            assert!(matches!(
                opts.group_map(2),
                Err(SolverError::Configuration { .. })
            ));
        }
    }
}
