//! Error taxonomy and non-fatal diagnostics shared by every estimator.
//!
//! Caller mistakes (bad parameters, too little data, a sample with no spread where a
//! positive denominator is structurally required) are returned as [`RiskError`].
//! Data-quality conditions that the estimators survive are attached to the successful
//! result as [`Diagnostic`] values instead, so a driver can print both the number and
//! the qualitative flag.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the estimator API.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Out-of-range tail probability, confidence level, block size or input datum.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Zero dispersion where a ratio or log needs a positive denominator.
    #[error("degenerate sample: {0}")]
    DegenerateSample(String),
    /// Sample too small for the requested operation.
    #[error("insufficient data for {what}: need at least {needed}, got {got}")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        got: usize,
    },
    /// A bounded iterative search exhausted its range.
    #[error("not converged: {0}")]
    NotConverged(String),
    /// An expected input field is absent for every row.
    #[error("missing feature: {0}")]
    MissingFeature(String),
    /// Configuration payload could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type RiskResult<T> = Result<T, RiskError>;

pub(crate) fn invalid(msg: impl Into<String>) -> RiskError {
    RiskError::InvalidParameter(msg.into())
}

/// Checks that a tail probability or confidence level lies strictly inside `(0, 1)`.
pub(crate) fn validate_probability(p: f64, name: &str) -> RiskResult<()> {
    if p.is_finite() && p > 0.0 && p < 1.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be in (0,1), got {p}")))
    }
}

pub(crate) fn validate_finite(values: &[f64], name: &str) -> RiskResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(invalid(format!("{name}[{i}] is not finite"))),
        None => Ok(()),
    }
}

/// Quality flag attached to an otherwise successful estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// Quantile integration reached its upper limit before accumulating the target mass.
    NotConverged { reached: f64, target: f64 },
    /// No observation lies strictly below the VaR threshold; ES falls back to VaR.
    EmptyTail,
    /// Named input field absent for every row.
    MissingFeature { field: String },
    /// Zero dispersion where a documented default replaced the estimate.
    DegenerateSample { what: String },
    /// Pickands order-statistic gaps were non-positive; shape set to zero.
    ShapeFallback,
    /// Closed-form GEV moments unavailable for the shape; Gumbel moments used.
    MomentFallback { shape: f64 },
    /// Impact exponent outside the empirically reasonable band.
    ImpactExponentOutOfBand { delta: f64, lower: f64, upper: f64 },
    /// EVT VaR and kernel ES differ by more than an order of magnitude.
    ModelDivergence { evt_var: f64, es: f64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConverged { reached, target } => write!(
                f,
                "quantile search exhausted the range (mass {reached:.4} < {target:.4})"
            ),
            Self::EmptyTail => write!(f, "empty tail sample, ES set to VaR"),
            Self::MissingFeature { field } => write!(f, "field `{field}` missing on every row"),
            Self::DegenerateSample { what } => write!(f, "degenerate {what}, default used"),
            Self::ShapeFallback => write!(f, "Pickands gaps non-positive, shape set to 0"),
            Self::MomentFallback { shape } => {
                write!(f, "GEV moments undefined for xi={shape:.3}, Gumbel moments used")
            }
            Self::ImpactExponentOutOfBand {
                delta,
                lower,
                upper,
            } => write!(
                f,
                "delta={delta:.3} outside [{lower}, {upper}], data quality issue"
            ),
            Self::ModelDivergence { evt_var, es } => write!(
                f,
                "EVT VaR {evt_var:.4} and kernel ES {es:.4} diverge by more than 10x"
            ),
        }
    }
}
