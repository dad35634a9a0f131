//! Multigroup macroscopic cross sections of one material.

use mt_core::Real;

use crate::error::{XsError, XsResult};

/// Macroscopic cross sections (1/cm) for one material.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    pub name: String,
    pub sigma_t: Vec<Real>,
    /// Scattering matrix, row-major: `sigma_s[from * G + to]`.
    pub sigma_s: Vec<Real>,
    pub nu_sigma_f: Vec<Real>,
    pub sigma_f: Vec<Real>,
    pub chi: Vec<Real>,
}

/// View of one group's data.
#[derive(Debug, Clone, Copy)]
pub struct GroupXs<'a> {
    pub sigma_t: Real,
    /// Out-scatter row Σs[g→g'] for all g'.
    pub scatter_out: &'a [Real],
    pub nu_sigma_f: Real,
    pub sigma_f: Real,
    pub chi: Real,
}

impl Material {
    /// A material with `num_groups` groups and all data zero.
    pub fn new(name: impl Into<String>, num_groups: usize) -> Self {
        Self {
            name: name.into(),
            sigma_t: vec![0.0; num_groups],
            sigma_s: vec![0.0; num_groups * num_groups],
            nu_sigma_f: vec![0.0; num_groups],
            sigma_f: vec![0.0; num_groups],
            chi: vec![0.0; num_groups],
        }
    }

    pub fn with_total(mut self, sigma_t: Vec<Real>) -> Self {
        self.sigma_t = sigma_t;
        self
    }

    /// Row-major scattering matrix `[from * G + to]`.
    pub fn with_scatter(mut self, sigma_s: Vec<Real>) -> Self {
        self.sigma_s = sigma_s;
        self
    }

    /// Fission production, fission spectrum, and Σf taken as νΣf / 2.43
    /// unless set separately with [`Material::with_sigma_f`].
    pub fn with_fission(mut self, nu_sigma_f: Vec<Real>, chi: Vec<Real>) -> Self {
        self.sigma_f = nu_sigma_f.iter().map(|v| v / 2.43).collect();
        self.nu_sigma_f = nu_sigma_f;
        self.chi = chi;
        self
    }

    pub fn with_sigma_f(mut self, sigma_f: Vec<Real>) -> Self {
        self.sigma_f = sigma_f;
        self
    }

    pub fn num_groups(&self) -> usize {
        self.sigma_t.len()
    }

    #[inline]
    pub fn scatter(&self, from: usize, to: usize) -> Real {
        self.sigma_s[from * self.num_groups() + to]
    }

    pub fn is_fissionable(&self) -> bool {
        self.nu_sigma_f.iter().any(|&v| v > 0.0)
    }

    /// Σa = Σt − Σ_g' Σs[g→g'].
    pub fn absorption(&self, group: usize) -> Real {
        let g = self.num_groups();
        let out: Real = self.sigma_s[group * g..(group + 1) * g].iter().sum();
        self.sigma_t[group] - out
    }

    pub fn group(&self, group: usize) -> XsResult<GroupXs<'_>> {
        let g = self.num_groups();
        if group >= g {
            return Err(XsError::GroupOutOfRange {
                group,
                num_groups: g,
            });
        }
        Ok(GroupXs {
            sigma_t: self.sigma_t[group],
            scatter_out: &self.sigma_s[group * g..(group + 1) * g],
            nu_sigma_f: self.nu_sigma_f[group],
            sigma_f: self.sigma_f[group],
            chi: self.chi[group],
        })
    }

    /// Check shapes and physical ranges.
    ///
    /// Σt must be strictly positive: the characteristic solution divides by it.
    pub fn validate(&self) -> XsResult<()> {
        let g = self.num_groups();
        let shape = |what: &'static str, expected: usize, actual: usize| {
            if expected == actual {
                Ok(())
            } else {
                Err(XsError::Shape {
                    material: self.name.clone(),
                    what,
                    expected,
                    actual,
                })
            }
        };
        shape("sigma_t", g.max(1), g)?;
        shape("sigma_s", g * g, self.sigma_s.len())?;
        shape("nu_sigma_f", g, self.nu_sigma_f.len())?;
        shape("sigma_f", g, self.sigma_f.len())?;
        shape("chi", g, self.chi.len())?;

        let non_physical = |what: &'static str, group: usize, value: Real| XsError::NonPhysical {
            material: self.name.clone(),
            what,
            group,
            value,
        };
        for (i, &v) in self.sigma_t.iter().enumerate() {
            if !(v.is_finite() && v > 0.0) {
                return Err(non_physical("sigma_t", i, v));
            }
        }
        for (i, &v) in self.sigma_s.iter().enumerate() {
            if !(v.is_finite() && v >= 0.0) {
                return Err(non_physical("sigma_s", i / g, v));
            }
        }
        for (what, data) in [
            ("nu_sigma_f", &self.nu_sigma_f),
            ("sigma_f", &self.sigma_f),
            ("chi", &self.chi),
        ] {
            for (i, &v) in data.iter().enumerate() {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(non_physical(what, i, v));
                }
            }
        }

        if self.is_fissionable() && self.chi.iter().sum::<Real>() <= 0.0 {
            return Err(XsError::MissingChi {
                material: self.name.clone(),
            });
        }
        Ok(())
    }
}
