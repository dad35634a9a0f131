//! Source update from the current flux iterate.

use mt_core::{Real, RegionId};
use mt_xs::Material;
use nalgebra::Vector2;

use crate::error::{SolverError, SolverResult};
use crate::fsr::{FsrTable, SourceView};

/// Caller-supplied fixed sources per region and group. Never touched by the solve.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSource {
    num_groups: usize,
    strength: Vec<Real>,
    moments: Vec<[Real; 2]>,
}

impl FixedSource {
    pub fn new(num_regions: usize, num_groups: usize) -> Self {
        Self {
            num_groups,
            strength: vec![0.0; num_regions * num_groups],
            moments: vec![[0.0; 2]; num_regions * num_groups],
        }
    }

    pub fn num_regions(&self) -> usize {
        self.strength.len() / self.num_groups.max(1)
    }

    fn slot(&self, region: RegionId, group: usize) -> SolverResult<usize> {
        let r = region.idx();
        if r >= self.num_regions() {
            return Err(SolverError::Configuration {
                what: format!(
                    "region {r} out of range ({} regions)",
                    self.num_regions()
                ),
            });
        }
        if group >= self.num_groups {
            return Err(SolverError::Configuration {
                what: format!("group {group} out of range ({} groups)", self.num_groups),
            });
        }
        Ok(r * self.num_groups + group)
    }

    /// Set the isotropic source density (neutrons/cm³/s) of one region and group.
    pub fn set(&mut self, region: RegionId, group: usize, value: Real) -> SolverResult<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(SolverError::Configuration {
                what: format!("fixed source must be finite and non-negative, got {value}"),
            });
        }
        let i = self.slot(region, group)?;
        self.strength[i] = value;
        Ok(())
    }

    /// Set the source first moments about the region centroid.
    pub fn set_moments(
        &mut self,
        region: RegionId,
        group: usize,
        mx: Real,
        my: Real,
    ) -> SolverResult<()> {
        if !(mx.is_finite() && my.is_finite()) {
            return Err(SolverError::Configuration {
                what: format!("fixed source moments must be finite, got ({mx}, {my})"),
            });
        }
        let i = self.slot(region, group)?;
        self.moments[i] = [mx, my];
        Ok(())
    }

    pub fn strength(&self) -> &[Real] {
        &self.strength
    }

    pub fn moments(&self) -> &[[Real; 2]] {
        &self.moments
    }

    pub fn is_empty(&self) -> bool {
        self.strength.iter().all(|&q| q == 0.0) && self.moments.iter().all(|m| *m == [0.0; 2])
    }

    /// Volume-integrated fixed source over all regions and groups.
    pub fn total(&self, volumes: &[Real]) -> Real {
        self.strength
            .chunks(self.num_groups.max(1))
            .zip(volumes)
            .map(|(q, v)| v * q.iter().sum::<Real>())
            .sum()
    }
}

/// Computes scattering, fission and fixed sources from the current flux.
pub struct SourceUpdater<'a> {
    materials: &'a [Material],
    num_groups: usize,
    linear: bool,
}

impl<'a> SourceUpdater<'a> {
    pub fn new(materials: &'a [Material], num_groups: usize, linear: bool) -> Self {
        Self {
            materials,
            num_groups,
            linear,
        }
    }

    /// Source from the fixed source alone (initial iterate).
    pub fn seed_fixed(&self, fsr: &mut FsrTable, fixed: &FixedSource) {
        let view = fsr.source_view();
        view.source.copy_from_slice(fixed.strength());
        if self.linear {
            self.expand_moments(view, fixed.moments().to_vec());
        } else {
            view.source_moments.fill([0.0; 2]);
        }
    }

    /// Q = scattering + χ/k · fission + fixed, per region and group.
    pub fn update(&self, fsr: &mut FsrTable, fixed: &FixedSource, k: Real) {
        let g_count = self.num_groups;
        let view = fsr.source_view();
        let mut moment_sums = if self.linear {
            fixed.moments().to_vec()
        } else {
            Vec::new()
        };

        for (r, &m) in view.materials.iter().enumerate() {
            let mat = &self.materials[m];
            let base = r * g_count;
            let flux = &view.flux[base..base + g_count];
            let fission: Real = flux
                .iter()
                .zip(&mat.nu_sigma_f)
                .map(|(phi, nsf)| phi * nsf)
                .sum();
            let fission_moment = if self.linear {
                let fm = &view.flux_moments[base..base + g_count];
                fm.iter().zip(&mat.nu_sigma_f).fold([0.0; 2], |acc, (phi, nsf)| {
                    [acc[0] + nsf * phi[0], acc[1] + nsf * phi[1]]
                })
            } else {
                [0.0; 2]
            };

            for g in 0..g_count {
                let scatter: Real = (0..g_count).map(|gp| mat.scatter(gp, g) * flux[gp]).sum();
                let chi = mat.chi[g] / k;
                view.source[base + g] = scatter + chi * fission + fixed.strength()[base + g];

                if self.linear {
                    let fm = &view.flux_moments[base..base + g_count];
                    let mut s = [chi * fission_moment[0], chi * fission_moment[1]];
                    for (gp, phi) in fm.iter().enumerate() {
                        let sig = mat.scatter(gp, g);
                        s[0] += sig * phi[0];
                        s[1] += sig * phi[1];
                    }
                    moment_sums[base + g][0] += s[0];
                    moment_sums[base + g][1] += s[1];
                }
            }
        }

        if self.linear {
            self.expand_moments(view, moment_sums);
        }
    }

    /// Convert source first moments into linear expansion coefficients.
    fn expand_moments(&self, view: SourceView<'_>, sums: Vec<[Real; 2]>) {
        let g_count = self.num_groups.max(1);
        for (i, (out, s)) in view.source_moments.iter_mut().zip(sums).enumerate() {
            *out = match &view.inverses[i / g_count] {
                Some(inv) => {
                    let q = inv * Vector2::new(s[0], s[1]);
                    [q.x, q.y]
                }
                None => [0.0; 2],
            };
        }
    }

    /// Volume-integrated ν-fission production of `flux`.
    pub fn fission_production(&self, fsr: &FsrTable, flux: &[Real]) -> Real {
        let g_count = self.num_groups;
        (0..fsr.num_regions())
            .map(|r| {
                let mat = &self.materials[fsr.material(r)];
                let f: Real = flux[r * g_count..(r + 1) * g_count]
                    .iter()
                    .zip(&mat.nu_sigma_f)
                    .map(|(phi, nsf)| phi * nsf)
                    .sum();
                fsr.volume(r) * f
            })
            .sum()
    }

    /// Fission rate density Σ_g Σf·φ per region.
    pub fn fission_rates(&self, fsr: &FsrTable) -> Vec<Real> {
        let g_count = self.num_groups;
        (0..fsr.num_regions())
            .map(|r| {
                let mat = &self.materials[fsr.material(r)];
                fsr.scalar_flux()[r * g_count..(r + 1) * g_count]
                    .iter()
                    .zip(&mat.sigma_f)
                    .map(|(phi, sf)| phi * sf)
                    .sum()
            })
            .collect()
    }
}
