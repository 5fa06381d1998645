//! Kernel-density Value-at-Risk and Expected Shortfall on signed returns.
//!
//! The VaR is the α-quantile of a biweight kernel density estimate, located by left
//! Riemann integration of the density over `[min - p*h, max + p*h]` on a fixed grid
//! (`p` = `padding_bandwidths`). The first grid position at which the accumulated mass
//! reaches α is returned. The search is capped at the grid's step count, and running out
//! of grid is reported as [`Diagnostic::NotConverged`] next to the best-effort upper limit.
//!
//! Conventions: returns are signed, so a left-tail VaR is typically negative and the
//! Expected Shortfall (mean of returns strictly below VaR) is at most the VaR.
//!
//! References:
//! - Silverman, *Density Estimation for Statistics and Data Analysis* (1986), §3.4.
//! - Acerbi and Tasche (2002), on the coherence of Expected Shortfall.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{RiskError, RiskResult, validate_finite, validate_probability};
use crate::core::{Diagnostic, KernelVarConfig};
use crate::math::kernel::{BiweightDensity, silverman_bandwidth};
use crate::math::stats::min_max;
use crate::math::timeseries::log_returns;

/// ES/VaR ratio above which the left tail is heavier than a Gaussian one (about 1.25 at 5%).
pub const GAUSSIAN_ES_VAR_RATIO: f64 = 1.25;

/// Result of the kernel quantile search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelVarEstimate {
    pub alpha: f64,
    /// Signed return threshold.
    pub var: f64,
    pub bandwidth: f64,
    /// Probability mass accumulated when the search stopped.
    pub mass: f64,
    pub steps_taken: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl KernelVarEstimate {
    pub fn converged(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::NotConverged { .. }))
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Kernel VaR with the default bandwidth constant and grid.
///
/// # Examples
/// ```rust
/// use tailferric::risk::var::kernel_var;
///
/// let returns: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64 / 1000.0 - 0.05).collect();
/// let est = kernel_var(&returns, 0.05).unwrap();
/// assert!(est.converged());
/// assert!(est.var < 0.0);
/// ```
pub fn kernel_var(returns: &[f64], alpha: f64) -> RiskResult<KernelVarEstimate> {
    kernel_var_with(returns, alpha, &KernelVarConfig::default())
}

pub fn kernel_var_with(
    returns: &[f64],
    alpha: f64,
    config: &KernelVarConfig,
) -> RiskResult<KernelVarEstimate> {
    validate_probability(alpha, "alpha")?;
    config.validate()?;
    validate_finite(returns, "returns")?;

    let h = silverman_bandwidth(returns, config.bandwidth_constant)?;
    let kde = BiweightDensity::new(returns, h)?;
    let (lo, hi) = min_max(returns).ok_or(RiskError::InsufficientData {
        what: "kernel VaR",
        needed: 2,
        got: 0,
    })?;
    let pad = config.padding_bandwidths * h;
    let lower = lo - pad;
    let upper = hi + pad;
    let dx = (upper - lower) / config.steps as f64;
    debug!(
        n = returns.len(),
        bandwidth = h,
        lower,
        upper,
        steps = config.steps,
        "kernel VaR grid"
    );

    let mut mass = 0.0;
    let mut k = 0usize;
    while mass < alpha && k < config.steps {
        mass += kde.density(lower + k as f64 * dx) * dx;
        k += 1;
    }
    let var = lower + k as f64 * dx;

    let mut diagnostics = Vec::new();
    if mass < alpha {
        warn!(alpha, mass, upper, "kernel VaR search exhausted the integration range");
        diagnostics.push(Diagnostic::NotConverged {
            reached: mass,
            target: alpha,
        });
    }

    Ok(KernelVarEstimate {
        alpha,
        var,
        bandwidth: h,
        mass,
        steps_taken: k,
        diagnostics,
    })
}

/// Kernel VaR of the log returns of a price series.
pub fn kernel_var_from_prices(prices: &[f64], alpha: f64) -> RiskResult<KernelVarEstimate> {
    kernel_var(&log_returns(prices)?, alpha)
}

/// Expected Shortfall paired with the VaR it conditions on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedShortfallEstimate {
    pub var: KernelVarEstimate,
    /// Mean of returns strictly below `var.var`, or `var.var` when none are.
    pub es: f64,
    pub tail_size: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExpectedShortfallEstimate {
    /// `ES / VaR`; `None` when VaR is exactly zero.
    pub fn ratio(&self) -> Option<f64> {
        (self.var.var != 0.0).then(|| self.es / self.var.var)
    }

    /// Ratio materially above the Gaussian benchmark.
    pub fn is_fat_tailed(&self) -> bool {
        self.ratio().is_some_and(|r| r > GAUSSIAN_ES_VAR_RATIO)
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty() && self.var.is_clean()
    }
}

/// Mean of observations strictly below `threshold` and their count.
pub fn tail_mean(returns: &[f64], threshold: f64) -> Option<(f64, usize)> {
    let (sum, count) = returns
        .iter()
        .filter(|&&r| r < threshold)
        .fold((0.0, 0usize), |(s, c), &r| (s + r, c + 1));
    (count > 0).then(|| (sum / count as f64, count))
}

/// Kernel Expected Shortfall with the default configuration.
///
/// # Examples
/// ```rust
/// use tailferric::risk::var::expected_shortfall;
///
/// let returns: Vec<f64> = (0..300).map(|i| ((i * 53) % 97) as f64 / 1000.0 - 0.048).collect();
/// let es = expected_shortfall(&returns, 0.05).unwrap();
/// assert!(es.es <= es.var.var);
/// ```
pub fn expected_shortfall(returns: &[f64], alpha: f64) -> RiskResult<ExpectedShortfallEstimate> {
    expected_shortfall_with(returns, alpha, &KernelVarConfig::default())
}

pub fn expected_shortfall_with(
    returns: &[f64],
    alpha: f64,
    config: &KernelVarConfig,
) -> RiskResult<ExpectedShortfallEstimate> {
    let var = kernel_var_with(returns, alpha, config)?;
    Ok(expected_shortfall_given_var(returns, var))
}

/// Expected Shortfall conditional on an already computed VaR on the same sample.
pub fn expected_shortfall_given_var(
    returns: &[f64],
    var: KernelVarEstimate,
) -> ExpectedShortfallEstimate {
    match tail_mean(returns, var.var) {
        Some((es, tail_size)) => ExpectedShortfallEstimate {
            var,
            es,
            tail_size,
            diagnostics: Vec::new(),
        },
        None => {
            warn!(var = var.var, "empty tail sample, ES falls back to VaR");
            ExpectedShortfallEstimate {
                es: var.var,
                var,
                tail_size: 0,
                diagnostics: vec![Diagnostic::EmptyTail],
            }
        }
    }
}

/// Kernel Expected Shortfall of the log returns of a price series.
pub fn expected_shortfall_from_prices(
    prices: &[f64],
    alpha: f64,
) -> RiskResult<ExpectedShortfallEstimate> {
    expected_shortfall(&log_returns(prices)?, alpha)
}
