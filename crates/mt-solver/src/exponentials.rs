//! Attenuation functions of optical thickness τ.
//!
//! - `f1(τ) = 1 - e^{-τ}`
//! - `g2(τ) = (τ/2 - 1)·f1(τ) + τ·e^{-τ}`: linear-source correction to the
//!   outgoing flux
//! - `h2(τ) = τ³/12 - (1 + τ/2)·g2(τ)`: linear-source first moment
//!
//! `g2` and `h2` lose all precision to cancellation for small τ, so below
//! [`SERIES_LIMIT`] they are summed from their Taylor series.

use mt_core::Real;

pub const SERIES_LIMIT: Real = 1.0;
const SERIES_TERMS: usize = 24;

#[inline]
pub fn f1(tau: Real) -> Real {
    -(-tau).exp_m1()
}

/// `(f1, g2, h2)` at `tau`.
#[inline]
pub fn linear_terms(tau: Real) -> (Real, Real, Real) {
    let f = f1(tau);
    if tau < SERIES_LIMIT {
        let (g, h) = series(tau);
        (f, g, h)
    } else {
        let g = (0.5 * tau - 1.0) * f + tau * (-tau).exp();
        let h = tau * tau * tau / 12.0 - (1.0 + 0.5 * tau) * g;
        (f, g, h)
    }
}

/// Taylor sums of g2 and h2.
///
/// With p_m = τ^m / m!:
/// g2 = Σ_{m≥3} (-1)^{m+1} (m-2)/2 · p_m and
/// h2 = Σ_{m≥5} (-1)^{m+1} (m-1)(m-4)/4 · p_m.
fn series(tau: Real) -> (Real, Real) {
    let mut p = tau * tau * tau / 6.0;
    let mut g = 0.0;
    let mut h = 0.0;
    let mut sign = 1.0;
    for m in 3..SERIES_TERMS {
        let mf = m as Real;
        g += sign * 0.5 * (mf - 2.0) * p;
        if m >= 5 {
            h += sign * 0.25 * (mf - 1.0) * (mf - 4.0) * p;
        }
        p *= tau / (mf + 1.0);
        sign = -sign;
    }
    (g, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn closed(tau: Real) -> (Real, Real) {
        let f = f1(tau);
        let g = (0.5 * tau - 1.0) * f + tau * (-tau).exp();
        (g, tau.powi(3) / 12.0 - (1.0 + 0.5 * tau) * g)
    }

    #[test]
    fn f1_limits() {
        assert_eq!(f1(0.0), 0.0);
        assert!((f1(1e-10) - 1e-10).abs() < 1e-20);
        assert!((f1(50.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn series_matches_closed_form_near_limit() {
        for tau in [0.5, 0.8, 0.99] {
            let (g_s, h_s) = series(tau);
            let (g_c, h_c) = closed(tau);
            assert!((g_s - g_c).abs() < 1e-12, "g at {tau}: {g_s} vs {g_c}");
            assert!((h_s - h_c).abs() < 1e-12, "h at {tau}: {h_s} vs {h_c}");
        }
    }

    #[test]
    fn series_leading_terms() {
        let tau = 1e-3;
        let (_, g, h) = linear_terms(tau);
        assert!((g / tau.powi(3) - 1.0 / 12.0).abs() < 1e-3);
        assert!((h / tau.powi(5) - 1.0 / 120.0).abs() < 1e-3);
    }

    #[test]
    fn continuous_across_switch() {
        let below = linear_terms(SERIES_LIMIT - 1e-12);
        let above = linear_terms(SERIES_LIMIT);
        assert!((below.1 - above.1).abs() < 1e-10);
        assert!((below.2 - above.2).abs() < 1e-10);
    }

    #[test]
    fn thick_limit() {
        let (f, g, _) = linear_terms(100.0);
        assert!((f - 1.0).abs() < 1e-15);
        assert!((g - 49.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn terms_are_finite_and_non_negative(tau in 0.0..40.0f64, d in 0.0..1.0f64) {
            let (f, g, h) = linear_terms(tau);
            prop_assert!((0.0..=1.0).contains(&f));
            prop_assert!(g.is_finite() && g >= -1e-15);
            prop_assert!(h.is_finite() && h >= -1e-15);
            let (f_next, g_next, _) = linear_terms(tau + d);
            prop_assert!(f_next >= f);
            prop_assert!(g_next >= g - 1e-12);
        }
    }
}
