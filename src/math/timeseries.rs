//! Return construction and serial-dependence helpers.
//!
//! Implemented analytics include:
//! - simple and log returns from price series,
//! - the autocorrelation function up to a maximum lag,
//! - non-overlapping block aggregation (sums, maxima, minima) used by the multiscale and
//!   block-maxima estimators.
//!
//! Numerical notes: an autocorrelation of a series with zero dispersion is reported as
//! zero at every positive lag rather than `NaN`.

use crate::core::error::{RiskError, RiskResult, invalid};
use crate::math::stats::mean;

const MIN_DISPERSION: f64 = 1.0e-300;

/// Computes simple returns from a price series.
///
/// `r_t = P_t / P_{t-1} - 1`
pub fn simple_returns(prices: &[f64]) -> RiskResult<Vec<f64>> {
    validate_prices(prices)?;
    Ok(prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect())
}

/// Computes log returns from a price series.
///
/// `r_t = ln(P_t / P_{t-1})`
pub fn log_returns(prices: &[f64]) -> RiskResult<Vec<f64>> {
    validate_prices(prices)?;
    Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}

/// Autocorrelation function up to `max_lag`.
///
/// Returns a vector of length `max_lag + 1`, with lag-0 equal to 1.
pub fn autocorrelation(series: &[f64], max_lag: usize) -> RiskResult<Vec<f64>> {
    if series.len() < 2 {
        return Err(RiskError::InsufficientData {
            what: "autocorrelation",
            needed: 2,
            got: series.len(),
        });
    }
    if max_lag >= series.len() {
        return Err(invalid(format!(
            "max_lag {max_lag} must be < series length {}",
            series.len()
        )));
    }

    let n = series.len();
    let m = mean(series);
    let denom: f64 = series.iter().map(|x| (x - m) * (x - m)).sum();

    let mut acf = vec![0.0; max_lag + 1];
    acf[0] = 1.0;
    if denom <= MIN_DISPERSION {
        return Ok(acf);
    }
    for (lag, slot) in acf.iter_mut().enumerate().skip(1) {
        let num: f64 = (lag..n)
            .map(|t| (series[t] - m) * (series[t - lag] - m))
            .sum();
        *slot = num / denom;
    }
    Ok(acf)
}

/// Sums of consecutive non-overlapping windows; a trailing partial window is dropped.
pub fn block_sums(series: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }
    series
        .chunks_exact(window)
        .map(|c| c.iter().sum())
        .collect()
}

/// Maximum of each full block.
pub fn block_maxima(series: &[f64], block: usize) -> Vec<f64> {
    if block == 0 {
        return Vec::new();
    }
    series
        .chunks_exact(block)
        .map(|c| c.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        .collect()
}

/// Minimum of each full block.
pub fn block_minima(series: &[f64], block: usize) -> Vec<f64> {
    if block == 0 {
        return Vec::new();
    }
    series
        .chunks_exact(block)
        .map(|c| c.iter().copied().fold(f64::INFINITY, f64::min))
        .collect()
}

fn validate_prices(prices: &[f64]) -> RiskResult<()> {
    if prices.len() < 2 {
        return Err(RiskError::InsufficientData {
            what: "returns",
            needed: 2,
            got: prices.len(),
        });
    }
    match prices.iter().position(|p| !(p.is_finite() && *p > 0.0)) {
        Some(i) => Err(invalid(format!(
            "prices[{i}] must be finite and > 0, got {}",
            prices[i]
        ))),
        None => Ok(()),
    }
}
