pub mod cavi;
pub mod common;
pub mod elbo;
pub mod error;
pub mod init;
pub mod input;
pub mod prior;
pub mod run_fit;
pub mod run_simulate;
pub mod state;
pub mod stats;
pub mod update;
