//! Out-of-sample exposure of a VaR threshold.
//!
//! A violation is a held-out return strictly below the signed threshold. The report
//! carries the raw count and rate; whether a rate "validates" the model is left to the
//! caller, with the Kupiec proportion-of-failures statistic available as a standard
//! yardstick.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::core::error::{RiskError, RiskResult, validate_finite, validate_probability};

/// `count(r < threshold)`.
pub fn count_violations(returns: &[f64], threshold: f64) -> usize {
    returns.iter().filter(|&&r| r < threshold).count()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub threshold: f64,
    pub violations: usize,
    pub observations: usize,
    pub violation_rate: f64,
    /// Nominal tail probability α.
    pub expected_rate: f64,
    /// Kupiec likelihood-ratio statistic, chi-square(1) under the null.
    pub kupiec_lr: f64,
    pub kupiec_p_value: f64,
}

impl BacktestReport {
    pub fn expected_violations(&self) -> f64 {
        self.expected_rate * self.observations as f64
    }

    /// Positive when the threshold is breached more often than α.
    pub fn excess_rate(&self) -> f64 {
        self.violation_rate - self.expected_rate
    }
}

/// Backtests a signed VaR threshold against held-out returns at tail probability `alpha`.
pub fn backtest_threshold(
    threshold: f64,
    held_out: &[f64],
    alpha: f64,
) -> RiskResult<BacktestReport> {
    validate_probability(alpha, "alpha")?;
    validate_finite(held_out, "held_out")?;
    if held_out.is_empty() {
        return Err(RiskError::InsufficientData {
            what: "backtest",
            needed: 1,
            got: 0,
        });
    }

    let n = held_out.len();
    let x = count_violations(held_out, threshold);
    let (kupiec_lr, kupiec_p_value) = kupiec_pof(x, n, alpha);

    Ok(BacktestReport {
        threshold,
        violations: x,
        observations: n,
        violation_rate: x as f64 / n as f64,
        expected_rate: alpha,
        kupiec_lr,
        kupiec_p_value,
    })
}

fn kupiec_pof(x: usize, n: usize, alpha: f64) -> (f64, f64) {
    let p = alpha.clamp(1.0e-12, 1.0 - 1.0e-12);
    let pi = (x as f64 / n as f64).clamp(1.0e-12, 1.0 - 1.0e-12);

    let ln_l0 = (n - x) as f64 * (1.0 - p).ln() + x as f64 * p.ln();
    let ln_l1 = (n - x) as f64 * (1.0 - pi).ln() + x as f64 * pi.ln();
    let lr = (2.0 * (ln_l1 - ln_l0)).max(0.0);

    let p_value = match ChiSquared::new(1.0) {
        Ok(chi) => 1.0 - chi.cdf(lr),
        Err(_) => f64::NAN,
    };
    (lr, p_value)
}
