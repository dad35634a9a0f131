//! Azimuthal and polar angular quadrature.
//!
//! Azimuthal angles are corrected so every track family closes cyclically
//! on the rectangular domain. Polar angles cover one hemisphere; the other
//! is folded in by symmetry, so polar weights sum to one.

use core::f64::consts::{FRAC_PI_2, PI, TAU};

use mt_core::{Direction, Real};
use mt_geometry::BoundingBox;

use crate::error::{TrackError, TrackResult};

/// Polar quadrature family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PolarKind {
    #[default]
    TabuchiYamamoto,
    GaussLegendre,
}

/// Polar angles over one hemisphere.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarQuadrature {
    kind: PolarKind,
    sin_theta: Vec<Real>,
    weights: Vec<Real>,
}

// Tabuchi-Yamamoto optimal angles, indexed by half the polar count.
const TY_SIN: [&[Real]; 3] = [
    &[0.798184],
    &[0.363900, 0.899900],
    &[0.166648, 0.537707, 0.932954],
];
const TY_WEIGHT: [&[Real]; 3] = [
    &[1.0],
    &[0.212854, 0.787146],
    &[0.046233, 0.283619, 0.670148],
];

impl PolarQuadrature {
    /// `num_polar` counts angles over the full sphere and must be even.
    pub fn new(kind: PolarKind, num_polar: usize) -> TrackResult<Self> {
        if num_polar == 0 || num_polar % 2 != 0 {
            return Err(TrackError::Config {
                what: format!("num_polar must be a positive even number, got {num_polar}"),
            });
        }
        let half = num_polar / 2;
        let (sin_theta, weights) = match kind {
            PolarKind::TabuchiYamamoto => {
                if half > TY_SIN.len() {
                    return Err(TrackError::Config {
                        what: format!(
                            "Tabuchi-Yamamoto quadrature supports up to 6 polar angles, got {num_polar}"
                        ),
                    });
                }
                (TY_SIN[half - 1].to_vec(), TY_WEIGHT[half - 1].to_vec())
            }
            PolarKind::GaussLegendre => gauss_legendre_half(num_polar),
        };
        Ok(Self {
            kind,
            sin_theta,
            weights,
        })
    }

    pub fn kind(&self) -> PolarKind {
        self.kind
    }

    /// Number of polar angles per hemisphere.
    pub fn len(&self) -> usize {
        self.sin_theta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sin_theta.is_empty()
    }

    pub fn sin_theta(&self) -> &[Real] {
        &self.sin_theta
    }

    pub fn weights(&self) -> &[Real] {
        &self.weights
    }
}

/// Positive Gauss-Legendre nodes of order `n` on [-1, 1] mapped to sin θ,
/// with weights normalized over the hemisphere. Ordered by increasing sin θ.
fn gauss_legendre_half(n: usize) -> (Vec<Real>, Vec<Real>) {
    let half = n / 2;
    let mut sin_theta = Vec::with_capacity(half);
    let mut weights = Vec::with_capacity(half);
    for i in 0..half {
        // Newton iteration on P_n from the Tricomi initial guess.
        let mut mu = (PI * (i as Real + 0.75) / (n as Real + 0.5)).cos();
        for _ in 0..100 {
            let (p, d) = legendre(n, mu);
            let step = p / d;
            mu -= step;
            if step.abs() < 1e-15 {
                break;
            }
        }
        let (_, d) = legendre(n, mu);
        let w = 2.0 / ((1.0 - mu * mu) * d * d);
        sin_theta.push((1.0 - mu * mu).sqrt());
        weights.push(w);
    }
    let sum: Real = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    (sin_theta, weights)
}

/// P_n(x) and P_n'(x) by the three-term recurrence.
fn legendre(n: usize, x: Real) -> (Real, Real) {
    let mut p0 = 1.0;
    let mut p1 = x;
    for k in 2..=n {
        let k = k as Real;
        let p2 = ((2.0 * k - 1.0) * x * p1 - (k - 1.0) * p0) / k;
        p0 = p1;
        p1 = p2;
    }
    let deriv = n as Real * (x * p1 - p0) / (x * x - 1.0);
    (p1, deriv)
}

/// One corrected azimuthal angle in [0, π).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AzimuthalAngle {
    /// Corrected angle φ.
    pub phi: Real,
    /// Tracks starting on the bottom edge.
    pub nx: usize,
    /// Tracks starting on the left (φ < π/2) or right (φ > π/2) edge.
    pub ny: usize,
    /// Distance between track starts along x.
    pub dx: Real,
    /// Distance between track starts along y.
    pub dy: Real,
    /// Effective perpendicular track spacing.
    pub spacing: Real,
    /// Fraction of [0, π) represented by this angle.
    pub weight: Real,
}

impl AzimuthalAngle {
    pub fn direction(&self) -> Direction {
        Direction::from_angle(self.phi)
    }

    pub fn num_tracks(&self) -> usize {
        self.nx + self.ny
    }
}

/// Product quadrature: corrected azimuthal angles times polar angles.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadrature {
    azim: Vec<AzimuthalAngle>,
    polar: PolarQuadrature,
    /// 2π ω_a ω_p δ_a sin θ_p, row-major by azimuthal angle.
    total_weights: Vec<Real>,
}

impl Quadrature {
    /// Lay out `num_azim / 2` corrected angles over [0, π) for `bbox`.
    pub fn new(
        bbox: &BoundingBox,
        num_azim: usize,
        spacing: Real,
        polar: PolarQuadrature,
    ) -> TrackResult<Self> {
        if num_azim == 0 || num_azim % 4 != 0 {
            return Err(TrackError::Config {
                what: format!("num_azim must be a positive multiple of 4, got {num_azim}"),
            });
        }
        let width = bbox.width();
        let height = bbox.height();
        if !(width > 0.0 && height > 0.0) {
            return Err(TrackError::Config {
                what: format!("domain must have positive extent, got {width} x {height}"),
            });
        }

        let half = num_azim / 2;
        let quarter = num_azim / 4;
        let mut azim = vec![
            AzimuthalAngle {
                phi: 0.0,
                nx: 0,
                ny: 0,
                dx: 0.0,
                dy: 0.0,
                spacing: 0.0,
                weight: 0.0,
            };
            half
        ];

        for a in 0..quarter {
            let desired = TAU / num_azim as Real * (a as Real + 0.5);
            let nx = (width / spacing * desired.sin().abs()).floor() as usize + 1;
            let ny = (height / spacing * desired.cos().abs()).floor() as usize + 1;
            let phi = (height * nx as Real / (width * ny as Real)).atan();
            let dx = width / nx as Real;
            let dy = height / ny as Real;
            let angle = AzimuthalAngle {
                phi,
                nx,
                ny,
                dx,
                dy,
                spacing: dx * phi.sin(),
                weight: 0.0,
            };
            azim[a] = angle;
            azim[half - a - 1] = AzimuthalAngle {
                phi: PI - phi,
                ..angle
            };
        }

        for a in 0..quarter {
            let upper = if a + 1 < quarter {
                0.5 * (azim[a + 1].phi - azim[a].phi)
            } else {
                FRAC_PI_2 - azim[a].phi
            };
            let lower = if a > 0 {
                0.5 * (azim[a].phi - azim[a - 1].phi)
            } else {
                azim[a].phi
            };
            let weight = (upper + lower) / PI;
            azim[a].weight = weight;
            azim[half - a - 1].weight = weight;
        }

        let num_polar = polar.len();
        let mut total_weights = Vec::with_capacity(half * num_polar);
        for angle in &azim {
            for (sin, w) in polar.sin_theta().iter().zip(polar.weights()) {
                total_weights.push(TAU * angle.weight * w * angle.spacing * sin);
            }
        }

        Ok(Self {
            azim,
            polar,
            total_weights,
        })
    }

    pub fn azimuthal(&self) -> &[AzimuthalAngle] {
        &self.azim
    }

    pub fn num_azim_half(&self) -> usize {
        self.azim.len()
    }

    pub fn polar(&self) -> &PolarQuadrature {
        &self.polar
    }

    pub fn num_polar_half(&self) -> usize {
        self.polar.len()
    }

    /// Index of the angle mirrored about the y axis (π - φ).
    pub fn complement(&self, azim: usize) -> usize {
        self.azim.len() - azim - 1
    }

    /// Weights for every polar angle of azimuthal angle `azim`.
    pub fn total_weights(&self, azim: usize) -> &[Real] {
        let p = self.polar.len();
        &self.total_weights[azim * p..(azim + 1) * p]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(w: Real, h: Real) -> BoundingBox {
        BoundingBox {
            x_min: 0.0,
            x_max: w,
            y_min: 0.0,
            y_max: h,
        }
    }

    #[test]
    fn polar_weights_sum_to_one() {
        for n in [2, 4, 6] {
            let q = PolarQuadrature::new(PolarKind::TabuchiYamamoto, n).unwrap();
            let s: Real = q.weights().iter().sum();
            assert!((s - 1.0).abs() < 1e-5, "TY{n}: {s}");
        }
        for n in [2, 4, 6, 8, 12] {
            let q = PolarQuadrature::new(PolarKind::GaussLegendre, n).unwrap();
            let s: Real = q.weights().iter().sum();
            assert!((s - 1.0).abs() < 1e-12, "GL{n}: {s}");
            assert_eq!(q.len(), n / 2);
        }
    }

    #[test]
    fn gauss_legendre_nodes() {
        // Order 2: mu = 1/sqrt(3).
        let q = PolarQuadrature::new(PolarKind::GaussLegendre, 2).unwrap();
        let mu = (1.0 / 3.0 as Real).sqrt();
        assert!((q.sin_theta()[0] - (1.0 - mu * mu).sqrt()).abs() < 1e-12);

        // Order 4: mu = 0.339981, 0.861136 with weights 0.652145, 0.347855.
        let q = PolarQuadrature::new(PolarKind::GaussLegendre, 4).unwrap();
        let mu_small = (1.0 - q.sin_theta()[1].powi(2)).sqrt();
        let mu_large = (1.0 - q.sin_theta()[0].powi(2)).sqrt();
        assert!((mu_small - 0.339981).abs() < 1e-6);
        assert!((mu_large - 0.861136).abs() < 1e-6);
        assert!((q.weights()[0] - 0.347855).abs() < 1e-6);
        assert!((q.weights()[1] - 0.652145).abs() < 1e-6);
    }

    #[test]
    fn gauss_legendre_integrates_cosine_moments() {
        // Over the hemisphere, mean of mu^2 is 1/3.
        let q = PolarQuadrature::new(PolarKind::GaussLegendre, 6).unwrap();
        let m2: Real = q
            .sin_theta()
            .iter()
            .zip(q.weights())
            .map(|(s, w)| w * (1.0 - s * s))
            .sum();
        assert!((m2 - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn azimuthal_angles_are_cyclic() {
        let polar = PolarQuadrature::new(PolarKind::TabuchiYamamoto, 2).unwrap();
        let b = bbox(3.0, 2.0);
        let q = Quadrature::new(&b, 8, 0.1, polar).unwrap();
        assert_eq!(q.num_azim_half(), 4);
        for (a, angle) in q.azimuthal().iter().enumerate() {
            let tan = angle.phi.tan().abs();
            let expected = b.height() * angle.nx as Real / (b.width() * angle.ny as Real);
            assert!((tan - expected).abs() < 1e-12);
            let comp = q.azimuthal()[q.complement(a)];
            assert!((angle.phi + comp.phi - PI).abs() < 1e-12);
            assert!((angle.spacing - angle.dy * angle.phi.cos().abs()).abs() < 1e-12);
            assert!(angle.spacing <= 0.1 + 1e-12);
        }
    }

    #[test]
    fn azimuthal_weights_sum_to_one() {
        let polar = PolarQuadrature::new(PolarKind::TabuchiYamamoto, 2).unwrap();
        for num_azim in [4, 8, 16, 32] {
            let q = Quadrature::new(&bbox(1.0, 1.5), num_azim, 0.05, polar.clone()).unwrap();
            let s: Real = q.azimuthal().iter().map(|a| a.weight).sum();
            assert!((s - 1.0).abs() < 1e-12, "{num_azim}: {s}");
        }
    }

    #[test]
    fn rejects_non_multiple_of_four() {
        let polar = PolarQuadrature::new(PolarKind::TabuchiYamamoto, 2).unwrap();
        assert!(matches!(
            Quadrature::new(&bbox(1.0, 1.0), 6, 0.1, polar),
            Err(TrackError::Config { .. })
        ));
    }
}
