#![allow(dead_code)]

pub use log::{info, warn};

pub type Mat = nalgebra::DMatrix<f64>;
pub type DVec = nalgebra::DVector<f64>;

pub use crate::error::{MixtureError, Result};
