//! One coordinate-ascent sweep over the variational parameters.
//!
//! The six updates run in a fixed order because later updates consume
//! earlier results within the same sweep:
//!
//! ```text
//! 1. lambda_pi[k]   = alpha_o[k] + Nk
//! 2. lambda_beta[k] = beta_o + Nk
//! 3. lambda_nu[k]   = nu_o + Nk
//! 4. lambda_m[k]    = (beta_o m_o + sum_n phi[n,k] x_n) / lambda_beta[k]
//! 5. lambda_w[k]    = w_o + beta_o m_o m_o' + sum_n phi[n,k] x_n x_n'
//!                     - lambda_beta[k] lambda_m[k] lambda_m[k]'
//! 6. lambda_phi[n,.] = softmax of the log-space NIW score
//! ```
//!
//! with `Nk = sum_n phi[n,k]` taken before update 6.

use crate::common::*;
use crate::prior::PriorSpecification;
use crate::state::VariationalState;
use crate::stats::{factorize_scale, ComponentStats};
use mixture_util::special_fn::{dirichlet_expectation, EPS};

/// Apply one full sweep in place.
///
/// * `xs` - data points, one D-vector per point
/// * `xx` - precomputed outer products `x_n x_n'`
///
/// Returns the per-component sufficient statistics evaluated at the
/// end of the sweep, for reuse by the bound computation.
pub fn sweep(
    state: &mut VariationalState,
    xs: &[DVec],
    xx: &[Mat],
    prior: &PriorSpecification,
    regularize: bool,
    iteration: usize,
) -> Result<Vec<ComponentStats>> {
    let n = state.num_points();
    let k = state.num_components();
    let d = state.num_dims();

    let nks = state.component_counts();

    // 1-3. concentration, precision scale, degrees of freedom
    for j in 0..k {
        state.lambda_pi[j] = prior.alpha_o[j] + nks[j];
        state.lambda_beta[j] = prior.beta_o + nks[j];
        state.lambda_nu[j] = prior.nu_o + nks[j];
    }

    // 4. precision-weighted posterior means
    for j in 0..k {
        let mut acc = DVec::zeros(d);
        for i in 0..n {
            acc += &xs[i] * state.lambda_phi[(i, j)];
        }
        let m_j = (&prior.m_o * prior.beta_o + acc) / state.lambda_beta[j];
        state.lambda_m.set_row(j, &m_j.transpose());
    }

    // 5. posterior scale matrices
    let prior_outer = &prior.m_o * prior.m_o.transpose() * prior.beta_o;
    for j in 0..k {
        let mut acc = Mat::zeros(d, d);
        for i in 0..n {
            acc += &xx[i] * state.lambda_phi[(i, j)];
        }
        let m_j = state.posterior_mean(j);
        state.lambda_w[j] =
            &prior.w_o + &prior_outer + acc - (&m_j * m_j.transpose()) * state.lambda_beta[j];
    }

    // 6. responsibilities; factor each scale matrix once and reuse
    let mut comp_stats = Vec::with_capacity(k);
    for j in 0..k {
        let factor = factorize_scale(&mut state.lambda_w[j], regularize).ok_or(
            MixtureError::Degenerate {
                component: j,
                iteration,
            },
        )?;
        comp_stats.push(ComponentStats::evaluate(
            state.lambda_nu[j],
            state.lambda_beta[j],
            &state.posterior_mean(j),
            &factor,
        ));
    }

    let mut scores = vec![0.0; k];
    for i in 0..n {
        let x = &xs[i];
        for (j, ss) in comp_stats.iter().enumerate() {
            scores[j] = dirichlet_expectation(state.lambda_pi.as_slice(), j)
                + ss.expected_prec_mean.dot(x)
                - 0.5 * x.dot(&(&ss.expected_prec * x))
                + ss.expected_quad_mean
                + ss.expected_half_ln_det;
        }
        softmax_inplace(&mut scores);
        for j in 0..k {
            state.lambda_phi[(i, j)] = scores[j];
        }
    }

    Ok(comp_stats)
}

/// Numerically stable softmax: subtract the max before
/// exponentiating; epsilon keeps ratios away from 0/0.
fn softmax_inplace(scores: &mut [f64]) {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        total += *s;
    }
    for s in scores.iter_mut() {
        *s = (*s + EPS) / (total + EPS);
    }
}
