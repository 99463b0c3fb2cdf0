//! Special-function helpers shared by variational update and bound
//! computations.
//!
//! # Formulas
//!
//! ```text
//! dirichlet_expectation(a, k) = psi(a[k] + eps) - psi(sum(a))
//! ln_multigamma(x, d)         = d(d-1)/4 * ln(pi) + sum_{j=1..d} lgamma(x + (1-j)/2)
//! digamma_sum_half(nu, d)     = sum_{i=0..d-1} psi(nu/2 + (1-i)/2)
//! ```

use special::Gamma as SpecialGamma;

/// Guard against psi(0) when a concentration hits zero numerically
pub const EPS: f64 = f32::EPSILON as f64;

/// E[log pi_k] under Dirichlet(a): `psi(a[k] + eps) - psi(sum(a))`
pub fn dirichlet_expectation(alpha: &[f64], k: usize) -> f64 {
    let total: f64 = alpha.iter().sum();
    SpecialGamma::digamma(alpha[k] + EPS) - SpecialGamma::digamma(total)
}

/// Digamma of a scalar
#[inline]
pub fn digamma(x: f64) -> f64 {
    SpecialGamma::digamma(x)
}

/// Log-gamma of a scalar
#[inline]
pub fn ln_gamma(x: f64) -> f64 {
    SpecialGamma::ln_gamma(x).0
}

/// Multivariate log-gamma `ln Gamma_d(x)`
pub fn ln_multigamma(x: f64, d: usize) -> f64 {
    let d_f = d as f64;
    let mut out = d_f * (d_f - 1.0) / 4.0 * std::f64::consts::PI.ln();
    for j in 1..=d {
        out += SpecialGamma::ln_gamma(x + (1.0 - j as f64) / 2.0).0;
    }
    out
}

/// `sum_{i=0..d-1} psi(nu/2 + (1-i)/2)`, the digamma series in the
/// Wishart expected log-determinant
pub fn digamma_sum_half(nu: f64, d: usize) -> f64 {
    (0..d)
        .map(|i| SpecialGamma::digamma(nu / 2.0 + (1.0 - i as f64) / 2.0))
        .sum()
}
