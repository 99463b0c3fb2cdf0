//! Error taxonomy for mixture-model inference.
//!
//! Configuration problems surface before any computation starts.
//! Numerical degeneracy aborts the run with the offending component
//! and iteration. Budget exhaustion is a termination reason, not an
//! error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MixtureError {
    /// Invalid options, priors, or dataset
    #[error("configuration: {0}")]
    Config(String),

    /// `lambda_w[k]` lost positive-definiteness
    #[error("degenerate scale matrix for component {component} at iteration {iteration}")]
    Degenerate { component: usize, iteration: usize },

    /// Evidence lower bound evaluated to NaN or infinity
    #[error("evidence lower bound is not finite at iteration {iteration}")]
    NotFinite { iteration: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MixtureError>;

impl MixtureError {
    pub fn config(msg: impl std::fmt::Display) -> Self {
        MixtureError::Config(msg.to_string())
    }
}
