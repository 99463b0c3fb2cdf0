//! Fixed hyperparameters of the conjugate
//! Normal-Inverse-Wishart-Dirichlet prior.

use crate::common::*;

/// Conjugate prior for a K-component mixture of D-dimensional
/// Gaussians:
///
/// ```text
/// pi          ~ Dirichlet(alpha_o)
/// (mu_k, S_k) ~ Normal-Inverse-Wishart(m_o, beta_o, w_o, nu_o)
/// ```
///
/// Immutable for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct PriorSpecification {
    /// Dirichlet concentration on mixture weights, one per component
    pub alpha_o: DVec,
    /// Wishart degrees of freedom, shared across components; must
    /// exceed D - 1
    pub nu_o: f64,
    /// D x D positive-definite scale matrix
    pub w_o: Mat,
    /// Prior mean
    pub m_o: DVec,
    /// Prior precision scale (> 0)
    pub beta_o: f64,
    /// log|w_o|, cached at validation time
    pub(crate) ln_det_w_o: f64,
}

impl PriorSpecification {
    /// Symmetric default prior for `k` components in `d` dimensions:
    /// `alpha_o = 1`, `nu_o = d + 1`, `w_o = I`, `m_o = 0`,
    /// `beta_o = 0.7`.
    pub fn symmetric(k: usize, d: usize) -> Result<Self> {
        Self::build(
            DVec::from_element(k, 1.0),
            (d + 1) as f64,
            Mat::identity(d, d),
            DVec::zeros(d),
            0.7,
        )
    }

    /// Validate hyperparameters and cache log|w_o|.
    pub fn build(alpha_o: DVec, nu_o: f64, w_o: Mat, m_o: DVec, beta_o: f64) -> Result<Self> {
        let k = alpha_o.len();
        let d = m_o.len();

        if k < 2 {
            return Err(MixtureError::config(format!(
                "need at least 2 mixture components, got {}",
                k
            )));
        }
        if d == 0 {
            return Err(MixtureError::config("prior mean has zero dimensions"));
        }
        if alpha_o.iter().any(|&a| a <= 0.0) {
            return Err(MixtureError::config(
                "Dirichlet concentrations must be strictly positive",
            ));
        }
        if beta_o <= 0.0 {
            return Err(MixtureError::config(format!(
                "precision scale beta_o must be > 0, got {}",
                beta_o
            )));
        }
        if nu_o <= (d as f64) - 1.0 {
            return Err(MixtureError::config(format!(
                "degrees of freedom nu_o = {} must exceed D - 1 = {}",
                nu_o,
                d as f64 - 1.0
            )));
        }
        if w_o.nrows() != d || w_o.ncols() != d {
            return Err(MixtureError::config(format!(
                "scale matrix is {}x{}, expected {}x{}",
                w_o.nrows(),
                w_o.ncols(),
                d,
                d
            )));
        }

        let asym = (&w_o - w_o.transpose()).abs().max();
        if asym > 1e-8 {
            return Err(MixtureError::config(
                "scale matrix w_o must be symmetric",
            ));
        }

        let chol = w_o
            .clone()
            .cholesky()
            .ok_or(MixtureError::config("scale matrix w_o is not positive-definite"))?;
        let ln_det_w_o: f64 = 2.0 * chol.l().diagonal().iter().map(|x| x.ln()).sum::<f64>();

        Ok(Self {
            alpha_o,
            nu_o,
            w_o,
            m_o,
            beta_o,
            ln_det_w_o,
        })
    }

    /// Number of mixture components K
    pub fn num_components(&self) -> usize {
        self.alpha_o.len()
    }

    /// Dimensionality D
    pub fn num_dims(&self) -> usize {
        self.m_o.len()
    }
}
