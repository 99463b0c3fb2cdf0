//! Evidence lower bound: `E_q[log p(x, z, theta)] - E_q[log q(z, theta)]`.
//!
//! Decomposed per component over the Normal-Inverse-Wishart-Dirichlet
//! sufficient statistics shared with the responsibility update. The
//! bound is non-decreasing across sweeps (up to floating-point noise)
//! and certifies convergence toward a local optimum.

use crate::common::*;
use crate::prior::PriorSpecification;
use crate::state::VariationalState;
use crate::stats::ComponentStats;
use mixture_util::special_fn::{dirichlet_expectation, ln_gamma, ln_multigamma};

/// Evaluate the bound for the current state. Never mutates state.
///
/// * `comp` - sufficient statistics from the sweep that produced
///   `state`, one per component
pub fn evaluate(
    state: &VariationalState,
    prior: &PriorSpecification,
    xs: &[DVec],
    xx: &[Mat],
    comp: &[ComponentStats],
    iteration: usize,
) -> Result<f64> {
    let n = state.num_points();
    let k = state.num_components();
    let d = state.num_dims();
    let (n_f, k_f, d_f) = (n as f64, k as f64, d as f64);

    let ln_2pi = (2.0 * std::f64::consts::PI).ln();
    let ln_2 = 2.0f64.ln();

    let alpha_total: f64 = prior.alpha_o.sum();
    let pi_total: f64 = state.lambda_pi.sum();
    let prior_outer = &prior.m_o * prior.m_o.transpose() * prior.beta_o;

    // constants of the joint and the variational family
    let mut elbo_p = -(d_f * (n_f + 1.0) / 2.0) * k_f * ln_2pi;
    elbo_p -= k_f * prior.nu_o * d_f * ln_2 / 2.0;
    elbo_p -= k_f * ln_multigamma(prior.nu_o / 2.0, d);
    elbo_p += d_f / 2.0 * k_f * prior.beta_o.ln();
    elbo_p += prior.nu_o / 2.0 * k_f * prior.ln_det_w_o;

    let mut elbo_q = -(d_f / 2.0) * k_f * ln_2pi;

    for (j, ss) in comp.iter().enumerate() {
        let phi_j = state.lambda_phi.column(j);
        let nk: f64 = phi_j.sum();
        // membership counts as of updates 2-3 of this sweep
        let nk_pre = state.lambda_beta[j] - prior.beta_o;

        let mut aux1 = DVec::zeros(d);
        let mut aux2 = Mat::zeros(d, d);
        for i in 0..n {
            aux1 += &xs[i] * phi_j[i];
            aux2 += &xx[i] * phi_j[i];
        }

        let m_j = state.posterior_mean(j);

        // E_q[log p] pieces
        elbo_p += ln_gamma(alpha_total) - ln_gamma(prior.alpha_o[j]);
        elbo_p += (prior.alpha_o[j] - 1.0 + nk)
            * dirichlet_expectation(prior.alpha_o.as_slice(), j);
        elbo_p += (&prior.m_o * prior.beta_o + &aux1).dot(&ss.expected_prec_mean);
        elbo_p += (&prior.w_o + &prior_outer + aux2).dot(&ss.expected_neg_half_prec);
        elbo_p += (prior.beta_o + nk_pre) * ss.expected_quad_mean;
        elbo_p += (prior.nu_o + d_f + 2.0 + nk_pre) * ss.expected_half_ln_det;

        // E_q[log q] pieces
        elbo_q += ln_gamma(pi_total) - ln_gamma(state.lambda_pi[j]);
        elbo_q += (state.lambda_pi[j] - 1.0 + nk)
            * dirichlet_expectation(state.lambda_pi.as_slice(), j);
        elbo_q += (&m_j * state.lambda_beta[j]).dot(&ss.expected_prec_mean);
        elbo_q += (&state.lambda_w[j] + (&m_j * m_j.transpose()) * state.lambda_beta[j])
            .dot(&ss.expected_neg_half_prec);
        elbo_q += state.lambda_beta[j] * ss.expected_quad_mean;
        elbo_q += (state.lambda_nu[j] + d_f + 2.0) * ss.expected_half_ln_det;
        elbo_q -= state.lambda_nu[j] * d_f / 2.0 * ln_2;
        elbo_q -= ln_multigamma(state.lambda_nu[j] / 2.0, d);
        elbo_q += d_f / 2.0 * state.lambda_beta[j].ln();
        elbo_q += state.lambda_nu[j] / 2.0 * ss.ln_det_w;
        elbo_q += phi_j.iter().map(|&p| p * p.ln()).sum::<f64>();
    }

    let bound = elbo_p - elbo_q;
    if !bound.is_finite() {
        return Err(MixtureError::NotFinite { iteration });
    }
    Ok(bound)
}
