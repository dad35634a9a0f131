//! The outer source iteration tying tracks, sweep, source and convergence together.

use std::time::Instant;

use mt_core::timing::{Timer, moc_timing};
use mt_core::{MaterialId, Real, RegionId};
use mt_geometry::Geometry;
use mt_tracks::{TrackGenerator, TrackSet};
use mt_xs::{Material, MaterialLibrary};
use tracing::{debug, info, warn};

use crate::cmfd::{Cmfd, CmfdStep};
use crate::convergence::{ConvergenceMonitor, SolverState};
use crate::error::{SolverError, SolverResult};
use crate::fsr::FsrTable;
use crate::options::{SolveMode, SolverOptions, SourceMode};
use crate::source::{FixedSource, SourceUpdater};
use crate::sweep::SweepEngine;

/// Result of a transport solve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Scalar flux indexed `region * num_groups + group`
    pub scalar_flux: Vec<Real>,
    pub num_groups: usize,
    /// Multiplication factor (eigenvalue mode only)
    pub k_eff: Option<Real>,
    pub iterations: usize,
    pub converged: bool,
    /// Residual of the last convergence check
    pub residual: Real,
    /// Neutrons leaving through vacuum boundaries per unit height, all groups
    pub leakage: Real,
}

impl Solution {
    pub fn num_regions(&self) -> usize {
        self.scalar_flux.len() / self.num_groups.max(1)
    }

    pub fn flux(&self, region: RegionId, group: usize) -> Real {
        self.scalar_flux[region.idx() * self.num_groups + group]
    }

    /// All group fluxes of one region.
    pub fn region_flux(&self, region: RegionId) -> &[Real] {
        let r = region.idx();
        &self.scalar_flux[r * self.num_groups..(r + 1) * self.num_groups]
    }
}

/// Per-iteration progress report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveProgressEvent {
    pub iteration: usize,
    pub state: SolverState,
    pub residual: Real,
    pub k_eff: Option<Real>,
}

/// Everything built by track generation.
struct Prepared {
    tracks: TrackSet,
    fsr: FsrTable,
    engine: SweepEngine,
    /// Σt per region and group
    sigma_t: Vec<Real>,
    cmfd: Option<Cmfd>,
}

/// Method-of-characteristics solver over a borrowed geometry.
pub struct MocSolver<'g, G: Geometry + ?Sized> {
    geometry: &'g G,
    options: SolverOptions,
    /// Resolved cross sections, indexed by geometry material id.
    materials: Vec<Material>,
    num_groups: usize,
    fixed: FixedSource,
    initial_flux: Option<Vec<Real>>,
    prepared: Option<Prepared>,
    state: SolverState,
    cmfd_step: Option<CmfdStep>,
}

impl<'g, G: Geometry + ?Sized> MocSolver<'g, G> {
    /// Validate `options` and resolve every geometry material in `library`.
    pub fn new(
        geometry: &'g G,
        library: &MaterialLibrary,
        options: SolverOptions,
    ) -> SolverResult<Self> {
        options.validate()?;
        let num_groups = library.num_groups();
        if num_groups == 0 {
            return Err(SolverError::Configuration {
                what: "material library is empty".to_string(),
            });
        }
        if let Some(cmfd) = &options.cmfd {
            cmfd.group_map(num_groups)?;
        }

        let materials = (0..geometry.num_materials())
            .map(|m| {
                let name = geometry.material_name(MaterialId::from_usize(m));
                library
                    .get(name)
                    .cloned()
                    .map_err(|e| SolverError::Configuration {
                        what: e.to_string(),
                    })
            })
            .collect::<SolverResult<Vec<_>>>()?;

        if options.mode == SolveMode::Eigenvalue && !materials.iter().any(Material::is_fissionable)
        {
            return Err(SolverError::Configuration {
                what: "eigenvalue mode needs at least one fissionable material".to_string(),
            });
        }

        Ok(Self {
            geometry,
            fixed: FixedSource::new(geometry.num_regions(), num_groups),
            options,
            materials,
            num_groups,
            initial_flux: None,
            prepared: None,
            state: SolverState::Init,
            cmfd_step: None,
        })
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    pub fn num_regions(&self) -> usize {
        self.geometry.num_regions()
    }

    /// Tracks laid down so far (0 before generation).
    pub fn num_tracks(&self) -> usize {
        self.prepared.as_ref().map_or(0, |p| p.tracks.num_tracks())
    }

    pub fn num_segments(&self) -> usize {
        self.prepared.as_ref().map_or(0, |p| p.tracks.num_segments())
    }

    pub fn tracks(&self) -> Option<&TrackSet> {
        self.prepared.as_ref().map(|p| &p.tracks)
    }

    pub fn fsr_table(&self) -> Option<&FsrTable> {
        self.prepared.as_ref().map(|p| &p.fsr)
    }

    /// Coarse mesh accelerator, once tracks exist and `options.cmfd` is set.
    pub fn cmfd(&self) -> Option<&Cmfd> {
        self.prepared.as_ref().and_then(|p| p.cmfd.as_ref())
    }

    /// Coarse mesh step of the last completed iteration.
    pub fn cmfd_step(&self) -> Option<&CmfdStep> {
        self.cmfd_step.as_ref()
    }

    /// Phase reached by the most recent solve.
    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Lay down and trace tracks, then size the region table and sweep state.
    pub fn generate_tracks(&mut self) -> SolverResult<()> {
        let tracks = TrackGenerator::new(self.geometry, self.options.track_options())?.generate()?;
        let num_regions = self.geometry.num_regions();
        if tracks.num_regions() != num_regions {
            return Err(SolverError::InvalidState {
                what: format!(
                    "tracks cover {} regions, geometry has {num_regions}",
                    tracks.num_regions()
                ),
            });
        }

        let g_count = self.num_groups;
        let region_materials: Vec<usize> = (0..num_regions)
            .map(|r| self.geometry.region_material(RegionId::from_usize(r)).idx())
            .collect();
        let mut sigma_t = Vec::with_capacity(num_regions * g_count);
        for &m in &region_materials {
            sigma_t.extend_from_slice(&self.materials[m].sigma_t);
        }

        let linear = self.options.source_mode == SourceMode::Linear;
        let fsr = FsrTable::new(&tracks, region_materials, g_count, linear);
        let mut engine = SweepEngine::new(
            &tracks,
            g_count,
            self.options.source_mode,
            self.options.num_threads,
        )?;
        let cmfd = match &self.options.cmfd {
            Some(copts) => {
                let (cmfd, surfaces) = Cmfd::new(copts, &tracks, &fsr, copts.group_map(g_count)?)?;
                engine.set_surface_map(surfaces);
                Some(cmfd)
            }
            None => None,
        };
        info!(
            tracks = tracks.num_tracks(),
            segments = tracks.num_segments(),
            regions = num_regions,
            groups = g_count,
            partitions = engine.num_partitions(),
            cmfd = cmfd.is_some(),
            "solver ready"
        );
        self.prepared = Some(Prepared {
            tracks,
            fsr,
            engine,
            sigma_t,
            cmfd,
        });
        Ok(())
    }

    fn require_fixed_source_mode(&self) -> SolverResult<()> {
        if self.options.mode == SolveMode::Eigenvalue {
            return Err(SolverError::Configuration {
                what: "fixed sources are not used in eigenvalue mode".to_string(),
            });
        }
        Ok(())
    }

    /// Set the fixed source density of one region and group.
    pub fn set_fixed_source(
        &mut self,
        region: RegionId,
        group: usize,
        value: Real,
    ) -> SolverResult<()> {
        self.require_fixed_source_mode()?;
        self.fixed.set(region, group, value)
    }

    /// Set the same fixed source in every listed region, e.g. all regions of a cell.
    pub fn set_fixed_source_in(
        &mut self,
        regions: impl IntoIterator<Item = RegionId>,
        group: usize,
        value: Real,
    ) -> SolverResult<()> {
        self.require_fixed_source_mode()?;
        for region in regions {
            self.fixed.set(region, group, value)?;
        }
        Ok(())
    }

    /// First moments (x, y) of the fixed source about the region centroid.
    /// Only linear sources see them.
    pub fn set_fixed_source_moments(
        &mut self,
        region: RegionId,
        group: usize,
        mx: Real,
        my: Real,
    ) -> SolverResult<()> {
        self.require_fixed_source_mode()?;
        self.fixed.set_moments(region, group, mx, my)
    }

    /// Set the same fixed source moments in every listed region.
    pub fn set_fixed_source_moments_in(
        &mut self,
        regions: impl IntoIterator<Item = RegionId>,
        group: usize,
        mx: Real,
        my: Real,
    ) -> SolverResult<()> {
        self.require_fixed_source_mode()?;
        for region in regions {
            self.fixed.set_moments(region, group, mx, my)?;
        }
        Ok(())
    }

    pub fn fixed_source(&self) -> &FixedSource {
        &self.fixed
    }

    /// Starting scalar flux, indexed `region * num_groups + group`.
    pub fn set_initial_flux(&mut self, flux: Vec<Real>) -> SolverResult<()> {
        let expected = self.num_regions() * self.num_groups;
        if flux.len() != expected {
            return Err(SolverError::Configuration {
                what: format!(
                    "initial flux has {} entries, expected {expected}",
                    flux.len()
                ),
            });
        }
        if let Some(bad) = flux.iter().find(|v| !v.is_finite()) {
            return Err(SolverError::Configuration {
                what: format!("initial flux must be finite, found {bad}"),
            });
        }
        self.initial_flux = Some(flux);
        Ok(())
    }

    /// Fission rate density Σ_g Σf·φ per region from the current flux.
    pub fn fission_rates(&self) -> SolverResult<Vec<Real>> {
        let prepared = self.prepared.as_ref().ok_or_else(|| SolverError::InvalidState {
            what: "no flux yet: generate tracks and solve first".to_string(),
        })?;
        let updater = SourceUpdater::new(&self.materials, self.num_groups, false);
        Ok(updater.fission_rates(&prepared.fsr))
    }

    pub fn solve(&mut self) -> SolverResult<Solution> {
        self.solve_with_progress(|_| {})
    }

    /// Run source iteration to convergence or the iteration cap.
    ///
    /// Tracks are generated on first use. Every call starts again from the
    /// initial flux guess with zero boundary flux.
    pub fn solve_with_progress(
        &mut self,
        mut progress: impl FnMut(&SolveProgressEvent),
    ) -> SolverResult<Solution> {
        if self.prepared.is_none() {
            self.generate_tracks()?;
        }
        let Some(prepared) = self.prepared.as_mut() else {
            return Err(SolverError::InvalidState {
                what: "track generation produced no state".to_string(),
            });
        };
        let Prepared {
            tracks,
            fsr,
            engine,
            sigma_t,
            cmfd,
        } = prepared;

        let opts = &self.options;
        let g_count = self.num_groups;
        let n = fsr.num_regions() * g_count;
        let eigen = opts.mode == SolveMode::Eigenvalue;
        let linear = opts.source_mode == SourceMode::Linear;
        let updater = SourceUpdater::new(&self.materials, g_count, linear);
        let mut monitor = ConvergenceMonitor::new(
            opts.residual_norm,
            opts.tolerance,
            opts.consecutive_converged,
        );
        let started = Instant::now();

        // Init
        self.state = SolverState::Init;
        self.cmfd_step = None;
        fsr.reset();
        engine.reset_boundary();
        match &self.initial_flux {
            Some(guess) => fsr.scalar_flux_mut().copy_from_slice(guess),
            None => fsr.scalar_flux_mut().fill(1.0),
        }
        let mut k = 1.0;
        if eigen {
            let production = updater.fission_production(fsr, fsr.scalar_flux());
            if !(production.is_finite() && production > 0.0) {
                return Err(SolverError::Configuration {
                    what: "initial flux produces no fission".to_string(),
                });
            }
            for v in fsr.scalar_flux_mut() {
                *v /= production;
            }
            updater.update(fsr, &self.fixed, k);
        } else {
            updater.seed_fixed(fsr, &self.fixed);
        }
        let mut old_flux = fsr.scalar_flux().to_vec();
        let mut old_production = if eigen {
            updater.fission_production(fsr, &old_flux)
        } else {
            0.0
        };
        progress(&SolveProgressEvent {
            iteration: 0,
            state: SolverState::Init,
            residual: Real::INFINITY,
            k_eff: eigen.then_some(k),
        });
        info!(
            mode = ?opts.mode,
            source = ?opts.source_mode,
            regions = fsr.num_regions(),
            groups = g_count,
            "starting transport solve"
        );

        let mut new_flux = vec![0.0; n];
        let mut new_moments = vec![[0.0; 2]; if linear { n } else { 0 }];
        let mut leakage = 0.0;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < opts.max_iterations {
            iterations += 1;
            let (k_prev, leakage_prev, residual_prev) = (k, leakage, monitor.last_residual());
            let last_finite = move |flux: Vec<Real>| {
                Box::new(Solution {
                    scalar_flux: flux,
                    num_groups: g_count,
                    k_eff: eigen.then_some(k_prev),
                    iterations: iterations - 1,
                    converged: false,
                    residual: residual_prev,
                    leakage: leakage_prev,
                })
            };

            // Sweep
            self.state = SolverState::Sweep;
            let tally = engine.sweep(tracks, fsr, sigma_t);
            let sweep_leakage = tally.leakage;
            for r in 0..fsr.num_regions() {
                let volume = fsr.volume(r);
                for g in 0..g_count {
                    let i = r * g_count + g;
                    let sig = sigma_t[i];
                    new_flux[i] = fsr.source()[i] / sig + tally.flux[i] / (sig * volume);
                    if linear {
                        let m = tally.moments[i];
                        new_moments[i] = [m[0] / volume, m[1] / volume];
                    }
                }
            }
            let imbalance = cmfd
                .as_ref()
                .map(|c| c.neutron_balance(fsr, sigma_t, &new_flux, &tally.currents));

            if let Some(what) = divergence(&new_flux, &new_moments, opts.divergence_limit) {
                return Err(SolverError::NumericalDivergence {
                    iteration: iterations,
                    what,
                    last_finite: last_finite(old_flux),
                });
            }
            if !opts.allow_negative_flux {
                let mut clamped = 0usize;
                for v in new_flux.iter_mut().filter(|v| **v < 0.0) {
                    *v = 0.0;
                    clamped += 1;
                }
                if clamped > 0 {
                    debug!(iteration = iterations, clamped, "negative scalar flux clamped");
                }
            }

            // Coarse mesh acceleration
            let coarse = cmfd.as_ref().map(|c| {
                let timer = Timer::start("cmfd");
                let coarse = c.accelerate(
                    fsr,
                    &self.materials,
                    &self.fixed,
                    &tally.currents,
                    &new_flux,
                    eigen.then_some(k),
                );
                timer.stop_into(&moc_timing::CMFD);
                coarse
            });
            engine.exchange();
            let mut coarse_k = None;
            if let (Some(c), Some(imbalance)) = (cmfd.as_ref(), imbalance) {
                let solution = coarse.flatten();
                let flux_updated = c.flux_update() && solution.is_some();
                if let Some(solution) = solution.as_ref().filter(|_| flux_updated) {
                    c.prolongate(&solution.ratios, &mut new_flux, &mut new_moments);
                    c.rescale_boundary(engine, &solution.ratios);
                    coarse_k = solution.k_eff;
                }
                let step = CmfdStep {
                    k_eff: solution.as_ref().and_then(|s| s.k_eff),
                    coarse_iterations: solution.as_ref().map_or(0, |s| s.iterations),
                    imbalance,
                    flux_updated,
                };
                debug!(
                    iteration = iterations,
                    coarse_k = ?step.k_eff,
                    coarse_iterations = step.coarse_iterations,
                    imbalance,
                    "cmfd step"
                );
                self.cmfd_step = Some(step);
            }

            leakage = sweep_leakage;
            if eigen {
                let production = updater.fission_production(fsr, &new_flux);
                if !(production.is_finite() && production > 0.0) {
                    return Err(SolverError::NumericalDivergence {
                        iteration: iterations,
                        what: format!("fission production is {production}"),
                        last_finite: last_finite(old_flux),
                    });
                }
                k = coarse_k.unwrap_or(k * production / old_production);
                let scale = 1.0 / production;
                for v in &mut new_flux {
                    *v *= scale;
                }
                for m in &mut new_moments {
                    m[0] *= scale;
                    m[1] *= scale;
                }
                engine.scale_boundary(scale);
                leakage *= scale;
                old_production = 1.0;
            }
            fsr.scalar_flux_mut().copy_from_slice(&new_flux);
            if linear {
                fsr.flux_moments_mut().copy_from_slice(&new_moments);
            }

            // Source update
            self.state = SolverState::SourceUpdate;
            let timer = Timer::start("source_update");
            updater.update(fsr, &self.fixed, k);
            timer.stop_into(&moc_timing::SOURCE_UPDATE);

            // Check
            self.state = SolverState::Check;
            let timer = Timer::start("convergence_check");
            converged = monitor.check(iterations, &new_flux, &old_flux, eigen.then_some(k));
            timer.stop_into(&moc_timing::CONVERGENCE_CHECK);
            progress(&SolveProgressEvent {
                iteration: iterations,
                state: SolverState::Check,
                residual: monitor.last_residual(),
                k_eff: eigen.then_some(k),
            });

            core::mem::swap(&mut old_flux, &mut new_flux);
            if converged {
                break;
            }
        }

        self.state = if converged {
            SolverState::Converged
        } else {
            SolverState::MaxItersReached
        };
        let residual = monitor.last_residual();
        if converged {
            info!(
                iterations,
                residual,
                k_eff = ?eigen.then_some(k),
                elapsed_s = started.elapsed().as_secs_f64(),
                "transport solve converged"
            );
        } else {
            warn!(
                iterations,
                residual,
                tolerance = opts.tolerance,
                "transport solve stopped at the iteration cap without converging"
            );
        }
        progress(&SolveProgressEvent {
            iteration: iterations,
            state: self.state,
            residual,
            k_eff: eigen.then_some(k),
        });

        Ok(Solution {
            scalar_flux: old_flux,
            num_groups: g_count,
            k_eff: eigen.then_some(k),
            iterations,
            converged,
            residual,
            leakage,
        })
    }
}

/// Description of the first non-finite or runaway value, if any.
fn divergence(flux: &[Real], moments: &[[Real; 2]], limit: Real) -> Option<String> {
    if let Some((i, v)) = flux
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || v.abs() > limit)
    {
        return Some(format!("scalar flux entry {i} is {v}"));
    }
    moments
        .iter()
        .position(|m| !(m[0].is_finite() && m[1].is_finite()))
        .map(|i| format!("flux moment entry {i} is not finite"))
}
