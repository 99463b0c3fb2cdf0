//! Mutable variational parameters of the mean-field posterior.

use crate::common::*;

/// Variational parameters for a K-component mixture over N points in
/// D dimensions.
///
/// Invariants maintained across sweeps:
/// - each row of `lambda_phi` is a probability distribution
/// - every `lambda_w[k]` is symmetric positive-definite
/// - `lambda_nu[k] > D - 1`
#[derive(Debug, Clone)]
pub struct VariationalState {
    /// Dirichlet posterior concentration on mixture weights (K)
    pub lambda_pi: DVec,
    /// Posterior precision scale per component (K)
    pub lambda_beta: DVec,
    /// Posterior Wishart degrees of freedom per component (K)
    pub lambda_nu: DVec,
    /// Posterior mean per component (K x D)
    pub lambda_m: Mat,
    /// Posterior scale matrix per component (K of D x D)
    pub lambda_w: Vec<Mat>,
    /// Responsibility matrix (N x K), row-stochastic
    pub lambda_phi: Mat,
}

impl VariationalState {
    /// Fresh state from an initial responsibility matrix; all other
    /// parameters start at zero and are filled by the first sweep.
    pub fn from_responsibilities(lambda_phi: Mat, k: usize, d: usize) -> Self {
        Self {
            lambda_pi: DVec::zeros(k),
            lambda_beta: DVec::zeros(k),
            lambda_nu: DVec::zeros(k),
            lambda_m: Mat::zeros(k, d),
            lambda_w: vec![Mat::zeros(d, d); k],
            lambda_phi,
        }
    }

    pub fn num_points(&self) -> usize {
        self.lambda_phi.nrows()
    }

    pub fn num_components(&self) -> usize {
        self.lambda_pi.len()
    }

    pub fn num_dims(&self) -> usize {
        self.lambda_m.ncols()
    }

    /// Posterior mean of component `k`
    pub fn posterior_mean(&self, k: usize) -> DVec {
        self.lambda_m.row(k).transpose()
    }

    /// Point estimate of the covariance of component `k`:
    /// `lambda_w[k] / (lambda_nu[k] - D - 1)`, the mean of the
    /// inverse-Wishart posterior (defined for `lambda_nu > D + 1`)
    pub fn posterior_covariance(&self, k: usize) -> Mat {
        let d = self.num_dims() as f64;
        &self.lambda_w[k] / (self.lambda_nu[k] - d - 1.0)
    }

    /// Expected membership count per component: `Nk = sum_n phi[n,k]`
    pub fn component_counts(&self) -> DVec {
        let k = self.num_components();
        DVec::from_iterator(k, (0..k).map(|j| self.lambda_phi.column(j).sum()))
    }

    /// Per-row sums of the responsibility matrix (should all be 1)
    pub fn phi_row_sums(&self) -> DVec {
        let n = self.num_points();
        DVec::from_iterator(n, (0..n).map(|i| self.lambda_phi.row(i).sum()))
    }
}
