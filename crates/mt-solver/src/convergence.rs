//! Convergence monitoring for the outer source iteration.

use mt_core::{Real, relative_change};
use tracing::debug;

/// How flux changes between iterations are reduced to one residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ResidualNorm {
    /// RMS of the relative change over entries with nonzero new flux.
    #[default]
    RelativeL2,
    /// Largest relative change.
    MaxRelative,
}

impl ResidualNorm {
    pub fn residual(self, new: &[Real], old: &[Real]) -> Real {
        let changes = new
            .iter()
            .zip(old)
            .filter_map(|(&n, &o)| relative_change(n, o));
        match self {
            ResidualNorm::RelativeL2 => {
                let (sum, count) = changes.fold((0.0, 0usize), |(s, c), r| (s + r * r, c + 1));
                if count == 0 {
                    0.0
                } else {
                    (sum / count as Real).sqrt()
                }
            }
            ResidualNorm::MaxRelative => changes.map(Real::abs).fold(0.0, Real::max),
        }
    }
}

/// Phase of the outer iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverState {
    Init,
    Sweep,
    SourceUpdate,
    Check,
    Converged,
    MaxItersReached,
}

impl SolverState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SolverState::Converged | SolverState::MaxItersReached)
    }
}

/// Tracks residuals and the run of passing checks.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    norm: ResidualNorm,
    tolerance: Real,
    consecutive: usize,
    streak: usize,
    last_residual: Real,
    last_k: Option<Real>,
}

impl ConvergenceMonitor {
    pub fn new(norm: ResidualNorm, tolerance: Real, consecutive: usize) -> Self {
        Self {
            norm,
            tolerance,
            consecutive: consecutive.max(1),
            streak: 0,
            last_residual: Real::INFINITY,
            last_k: None,
        }
    }

    pub fn last_residual(&self) -> Real {
        self.last_residual
    }

    /// Record one iteration; true once enough checks in a row have passed.
    ///
    /// When `k` is given, the change in k since the previous check must also
    /// be below tolerance. The first eigenvalue check never passes.
    pub fn check(
        &mut self,
        iteration: usize,
        new: &[Real],
        old: &[Real],
        k: Option<Real>,
    ) -> bool {
        let residual = self.norm.residual(new, old);
        self.last_residual = residual;
        let k_ok = match (k, self.last_k) {
            (None, _) => true,
            (Some(k), Some(prev)) => (k - prev).abs() < self.tolerance,
            (Some(_), None) => false,
        };
        self.last_k = k;

        if residual < self.tolerance && k_ok {
            self.streak += 1;
        } else {
            self.streak = 0;
        }
        debug!(iteration, residual, k_eff = ?k, streak = self.streak, "convergence check");
        self.streak >= self.consecutive
    }
}
