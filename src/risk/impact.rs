//! Bouchaud-style price impact from a tick-level transaction stream.
//!
//! Impact of transaction `i` is the absolute price change into it, `|P_i - P_{i-1}|`
//! (optionally divided by the spread at `i`), paired with the volume reported at `i`.
//! The power law `impact = λ · V^δ` is fitted by least squares in log-log space:
//!
//! `δ = Cov(ln V, ln I) / Var(ln V)`, `λ = exp(mean(ln I) - δ · mean(ln V))`.
//!
//! Rows without a reported volume, with a non-positive volume, or with zero or
//! non-finite impact are excluded and counted separately. When nothing usable remains, or all usable volumes
//! coincide, the documented defaults (λ = 0.01, δ = 0.5) are returned with a
//! diagnostic; sparse volume reporting is a data-quality finding, not a failure.
//!
//! Impact relaxation is read off the autocorrelation of simple transaction returns:
//! `τ = -Δt / ln ρ₁` when `0 < ρ₁ < 1`, otherwise `τ = Δt`, with `Δt` the mean
//! inter-transaction time. When ρ₁ and ρ₂ are both positive a decay exponent
//! `γ = log2(ρ₁ / ρ₂)` is also reported.
//!
//! References:
//! - Bouchaud, Gefen, Potters, Wyart (2004), "Fluctuations and response in financial markets".
//! - Kyle (1985); the square-root law δ ≈ 0.5.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{RiskError, RiskResult, invalid};
use crate::core::{Diagnostic, ImpactConfig, ImpactNormalization, Transaction};
use crate::math::stats::{
    mean, min_max, population_covariance, population_variance, sample_std_dev,
};
use crate::math::timeseries::autocorrelation;

/// Paired `(ln V, ln I)` observations plus exclusion bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactSample {
    pub log_volume: Vec<f64>,
    pub log_impact: Vec<f64>,
    pub missing_volume: usize,
    pub non_positive_volume: usize,
    pub zero_impact: usize,
    /// Impact that overflowed, e.g. a zero spread under spread normalization.
    pub non_finite_impact: usize,
}

impl ImpactSample {
    pub fn len(&self) -> usize {
        self.log_volume.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_volume.is_empty()
    }
}

/// Builds the regression sample from consecutive transactions.
pub fn impact_sample(
    transactions: &[Transaction],
    normalization: ImpactNormalization,
) -> ImpactSample {
    let mut sample = ImpactSample::default();
    for w in transactions.windows(2) {
        let (prev, cur) = (&w[0], &w[1]);
        let volume = match cur.volume {
            None => {
                sample.missing_volume += 1;
                continue;
            }
            Some(v) if v <= 0.0 => {
                sample.non_positive_volume += 1;
                continue;
            }
            Some(v) => v,
        };
        let change = (cur.price - prev.price).abs();
        let impact = match normalization {
            ImpactNormalization::Raw => change,
            ImpactNormalization::SpreadNormalized => change / cur.spread,
        };
        if !impact.is_finite() {
            sample.non_finite_impact += 1;
            continue;
        }
        if impact <= 0.0 {
            sample.zero_impact += 1;
            continue;
        }
        sample.log_volume.push(volume.ln());
        sample.log_impact.push(impact.ln());
    }
    sample
}

/// `(λ, δ)` from a log-log sample, or `None` when the sample is empty, holds non-finite
/// points or ln V has no spread.
pub fn fit_power_law(sample: &ImpactSample) -> Option<(f64, f64)> {
    let finite = |v: &[f64]| v.iter().all(|x| x.is_finite());
    if sample.log_volume.len() != sample.log_impact.len()
        || !finite(&sample.log_volume)
        || !finite(&sample.log_impact)
    {
        return None;
    }
    let (lo, hi) = min_max(&sample.log_volume)?;
    let var_x = population_variance(&sample.log_volume);
    if lo == hi || var_x <= 0.0 {
        return None;
    }
    let delta = population_covariance(&sample.log_volume, &sample.log_impact) / var_x;
    let lambda = (mean(&sample.log_impact) - delta * mean(&sample.log_volume)).exp();
    Some((lambda, delta))
}

/// Serial-dependence summary of transaction returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Relaxation {
    pub rho1: f64,
    pub rho2: Option<f64>,
    pub mean_dt: f64,
    pub tau: f64,
    /// `log2(ρ₁/ρ₂)` when both are positive.
    pub decay_exponent: Option<f64>,
}

pub fn relaxation(transactions: &[Transaction], returns: &[f64]) -> RiskResult<Relaxation> {
    let max_lag = if returns.len() > 2 { 2 } else { 1 };
    let acf = autocorrelation(returns, max_lag)?;
    let rho1 = acf[1];
    let rho2 = acf.get(2).copied();

    let n = transactions.len();
    let mean_dt = match (transactions.first(), transactions.last()) {
        (Some(a), Some(b)) if n > 1 => (b.time - a.time) / (n - 1) as f64,
        _ => 0.0,
    };
    let tau = if rho1 > 0.0 && rho1 < 1.0 {
        -mean_dt / rho1.ln()
    } else {
        mean_dt
    };
    let decay_exponent = rho2
        .filter(|&r2| rho1 > 0.0 && r2 > 0.0)
        .map(|r2| (rho1 / r2).log2());

    Ok(Relaxation {
        rho1,
        rho2,
        mean_dt,
        tau,
        decay_exponent,
    })
}

/// Strength of the volume effect relative to the square-root law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeEffect {
    /// δ > 0.5.
    Strong,
    Weak,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BouchaudEstimate {
    pub lambda: f64,
    pub delta: f64,
    /// Relaxation time in the transactions' time unit.
    pub tau: f64,
    /// Sample standard deviation of simple transaction returns.
    pub sigma: f64,
    pub rho1: f64,
    pub rho2: Option<f64>,
    pub decay_exponent: Option<f64>,
    pub mean_dt: f64,
    pub normalization: ImpactNormalization,
    pub sample_size: usize,
    pub missing_volume: usize,
    pub non_positive_volume: usize,
    pub zero_impact: usize,
    pub non_finite_impact: usize,
    /// `δ` and `λ` are the configured defaults rather than a fit.
    pub defaulted: bool,
    pub delta_band: (f64, f64),
    pub diagnostics: Vec<Diagnostic>,
}

impl BouchaudEstimate {
    /// No fit was possible, δ lies outside the configured band, or the relaxation time is
    /// non-positive.
    pub fn needs_adjustment(&self) -> bool {
        let (lo, hi) = self.delta_band;
        self.defaulted || !(self.delta > lo && self.delta < hi) || self.tau <= 0.0
    }

    pub fn volume_effect(&self) -> VolumeEffect {
        if self.delta > 0.5 {
            VolumeEffect::Strong
        } else {
            VolumeEffect::Weak
        }
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Estimates `(λ, δ, τ, σ, ρ₁[, ρ₂, γ])` from an ordered transaction stream.
///
/// # Examples
/// ```rust
/// use tailferric::core::{ImpactConfig, TradeSign, Transaction};
/// use tailferric::risk::impact::estimate_bouchaud;
///
/// let tx: Vec<Transaction> = (0..6)
///     .map(|i| Transaction {
///         time: i as f64 * 0.001,
///         spread: 0.02,
///         volume: None,
///         sign: TradeSign::Buy,
///         price: 20.0 + 0.01 * (i % 3) as f64,
///     })
///     .collect();
/// let est = estimate_bouchaud(&tx, &ImpactConfig::default()).unwrap();
/// assert!(est.defaulted);
/// assert_eq!(est.delta, 0.5);
/// ```
pub fn estimate_bouchaud(
    transactions: &[Transaction],
    config: &ImpactConfig,
) -> RiskResult<BouchaudEstimate> {
    config.validate()?;
    validate_transactions(transactions)?;

    let sample = impact_sample(transactions, config.normalization);
    let mut diagnostics = Vec::new();
    debug!(
        usable = sample.len(),
        missing = sample.missing_volume,
        non_positive = sample.non_positive_volume,
        zero_impact = sample.zero_impact,
        non_finite = sample.non_finite_impact,
        "impact sample"
    );

    let (lambda, delta, defaulted) = match fit_power_law(&sample) {
        Some((lambda, delta)) => (lambda, delta, false),
        None => {
            let all_missing = transactions[1..].iter().all(|t| t.volume.is_none());
            let diagnostic = if all_missing {
                Diagnostic::MissingFeature {
                    field: "volume".to_string(),
                }
            } else if sample.is_empty() {
                Diagnostic::DegenerateSample {
                    what: "impact sample (no positive volume and impact pairs)".to_string(),
                }
            } else {
                Diagnostic::DegenerateSample {
                    what: "log-volume variance".to_string(),
                }
            };
            warn!(%diagnostic, "impact regression unavailable, using default lambda and delta");
            diagnostics.push(diagnostic);
            (config.default_lambda, config.default_delta, true)
        }
    };

    let (lo, hi) = config.delta_band;
    if !defaulted && !(delta > lo && delta < hi) {
        warn!(delta, lo, hi, "impact exponent outside typical band");
        diagnostics.push(Diagnostic::ImpactExponentOutOfBand {
            delta,
            lower: lo,
            upper: hi,
        });
    }

    let returns: Vec<f64> = transactions
        .windows(2)
        .map(|w| (w[1].price - w[0].price) / w[0].price)
        .collect();
    let relax = relaxation(transactions, &returns)?;
    let sigma = sample_std_dev(&returns);

    Ok(BouchaudEstimate {
        lambda,
        delta,
        tau: relax.tau,
        sigma,
        rho1: relax.rho1,
        rho2: relax.rho2,
        decay_exponent: relax.decay_exponent,
        mean_dt: relax.mean_dt,
        normalization: config.normalization,
        sample_size: sample.len(),
        missing_volume: sample.missing_volume,
        non_positive_volume: sample.non_positive_volume,
        zero_impact: sample.zero_impact,
        non_finite_impact: sample.non_finite_impact,
        defaulted,
        delta_band: config.delta_band,
        diagnostics,
    })
}

fn validate_transactions(transactions: &[Transaction]) -> RiskResult<()> {
    if transactions.len() < 3 {
        return Err(RiskError::InsufficientData {
            what: "Bouchaud estimation",
            needed: 3,
            got: transactions.len(),
        });
    }
    for (i, t) in transactions.iter().enumerate() {
        if !(t.price.is_finite() && t.price > 0.0) {
            return Err(invalid(format!("transactions[{i}].price must be > 0")));
        }
        if !(t.spread.is_finite() && t.spread > 0.0) {
            return Err(invalid(format!("transactions[{i}].spread must be > 0")));
        }
        if !t.time.is_finite() {
            return Err(invalid(format!("transactions[{i}].time is not finite")));
        }
        if t.volume.is_some_and(|v| !v.is_finite()) {
            return Err(invalid(format!("transactions[{i}].volume is not finite")));
        }
    }
    if let Some(i) = transactions.windows(2).position(|w| w[1].time < w[0].time) {
        return Err(invalid(format!(
            "transactions must be time-ordered, row {} precedes row {i}",
            i + 1
        )));
    }
    Ok(())
}
