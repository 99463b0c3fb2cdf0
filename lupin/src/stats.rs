//! Normal-Inverse-Wishart sufficient statistics.
//!
//! Both the responsibility update and the evidence lower bound need
//! the same four posterior expectations per component. They are
//! computed here from a single Cholesky factorization of the scale
//! matrix and reused within the sweep.
//!
//! # Formulas
//!
//! ```text
//! E[S^-1 mu]           = nu * W^-1 * m
//! E[-1/2 S^-1]         = -1/2 * nu * W^-1
//! E[-1/2 mu' S^-1 mu]  = -D/(2 beta) - 1/2 * nu * m' W^-1 m
//! E[-1/2 log|S|]       = D/2 log(2) + 1/2 sum_i psi(nu/2 + (1-i)/2)
//!                        - 1/2 log|W|
//! ```

use crate::common::*;
use mixture_util::special_fn::digamma_sum_half;

/// Inverse and log-determinant of a positive-definite scale matrix,
/// both taken from one Cholesky factorization.
pub struct ScaleFactor {
    pub inv: Mat,
    pub ln_det: f64,
}

/// Factorize `w`. When `regularize` is set and the factorization
/// fails, add a small multiple of the identity to `w` in place and
/// retry once. Returns `None` when the matrix stays indefinite.
pub fn factorize_scale(w: &mut Mat, regularize: bool) -> Option<ScaleFactor> {
    if let Some(chol) = w.clone().cholesky() {
        return Some(from_cholesky(chol));
    }

    if !regularize {
        return None;
    }

    let d = w.nrows() as f64;
    let jitter = (w.trace() / d).abs().max(1.0) * 1e-8;
    *w += Mat::identity(w.nrows(), w.ncols()) * jitter;

    w.clone().cholesky().map(from_cholesky)
}

fn from_cholesky(chol: nalgebra::Cholesky<f64, nalgebra::Dyn>) -> ScaleFactor {
    let ln_det: f64 = 2.0 * chol.l().diagonal().iter().map(|x| x.ln()).sum::<f64>();
    ScaleFactor {
        inv: chol.inverse(),
        ln_det,
    }
}

/// The four NIW expectations of one component, plus the expected
/// precision `nu W^-1` reused by the responsibility update.
pub struct ComponentStats {
    /// `nu * W^-1`
    pub expected_prec: Mat,
    /// `E[S^-1 mu]`
    pub expected_prec_mean: DVec,
    /// `E[-1/2 S^-1]`
    pub expected_neg_half_prec: Mat,
    /// `E[-1/2 mu' S^-1 mu]`
    pub expected_quad_mean: f64,
    /// `E[-1/2 log|S|]`
    pub expected_half_ln_det: f64,
    /// `log|W|`
    pub ln_det_w: f64,
}

impl ComponentStats {
    pub fn evaluate(nu: f64, beta: f64, m: &DVec, factor: &ScaleFactor) -> Self {
        let d = m.len();
        let d_f = d as f64;

        let expected_prec = &factor.inv * nu;
        let expected_prec_mean = &expected_prec * m;
        let expected_neg_half_prec = &expected_prec * (-0.5);
        let expected_quad_mean = -d_f / (2.0 * beta) - 0.5 * m.dot(&expected_prec_mean);
        let expected_half_ln_det = d_f / 2.0 * 2.0f64.ln() + 0.5 * digamma_sum_half(nu, d)
            - 0.5 * factor.ln_det;

        Self {
            expected_prec,
            expected_prec_mean,
            expected_neg_half_prec,
            expected_quad_mean,
            expected_half_ln_det,
            ln_det_w: factor.ln_det,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_factorize_pd() {
        let mut w = Mat::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let f = factorize_scale(&mut w, false).unwrap();

        // |W| = 11
        assert_relative_eq!(f.ln_det, 11.0f64.ln(), epsilon = 1e-12);

        // W * W^-1 = I
        let prod = &w * &f.inv;
        assert_relative_eq!(prod[(0, 0)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(prod[(0, 1)], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_factorize_indefinite_fails() {
        let mut w = Mat::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(factorize_scale(&mut w, false).is_none());
    }

    #[test]
    fn test_factorize_regularize_recovers_singular() {
        // rank-deficient but PSD: jitter makes it PD
        let mut w = Mat::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let f = factorize_scale(&mut w, true);
        assert!(f.is_some());
        // w itself was jittered so later determinant calls agree
        assert!(w[(0, 0)] > 1.0);
    }

    #[test]
    fn test_component_stats_identity_scale() {
        let mut w = Mat::identity(2, 2);
        let factor = factorize_scale(&mut w, false).unwrap();
        let m = DVec::from_row_slice(&[1.0, 2.0]);
        let ss = ComponentStats::evaluate(3.0, 0.5, &m, &factor);

        // nu * I * m
        assert_relative_eq!(ss.expected_prec_mean[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(ss.expected_prec_mean[1], 6.0, epsilon = 1e-12);

        // -D/(2 beta) - 1/2 nu m'm = -2 - 7.5
        assert_relative_eq!(ss.expected_quad_mean, -9.5, epsilon = 1e-12);

        // symmetric negative-definite expectation
        assert_relative_eq!(
            ss.expected_neg_half_prec[(0, 1)],
            ss.expected_neg_half_prec[(1, 0)],
            epsilon = 1e-12
        );
        assert!(ss.expected_neg_half_prec[(0, 0)] < 0.0);

        // log|I| = 0 drops the last term
        let d = 2.0f64;
        let expected =
            d / 2.0 * 2.0f64.ln() + 0.5 * digamma_sum_half(3.0, 2);
        assert_relative_eq!(ss.expected_half_ln_det, expected, epsilon = 1e-12);
    }
}
