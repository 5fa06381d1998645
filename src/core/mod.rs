//! Domain types, error taxonomy, diagnostics and configuration shared by the estimators.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::{Diagnostic, RiskError, RiskResult};
pub use types::*;
