//! Scale-dependent cross-correlation (Epps effect) and Hurst scaling of volatility.
//!
//! Correlation at scale 0 is the Pearson correlation of the raw, index-aligned return
//! series. At scale `s > 0` each series is either block-summed over non-overlapping
//! windows of `2^s` returns or replaced by its level-`s` Haar detail coefficients; one
//! method is applied to every pair and scale of a sweep so values stay comparable. A
//! scale vector with zero variance correlates to 0.
//!
//! The Hurst exponent is estimated on the full sample by rescaled range,
//! `H = ln(R/S) / ln(n)`, or by second-moment scaling, `H = 0.5 · log2(M2'/M2)`, and
//! clamped to `[0, 1]`. Native volatility is annualized as `σ · T^H`, which reduces to
//! the classical `σ · √T` at `H = 0.5`.
//!
//! References:
//! - Epps (1979), "Comovements in stock prices in the very short run".
//! - Hurst (1951); Mandelbrot and Wallis (1969) for R/S analysis.

use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{RiskError, RiskResult, invalid, validate_finite};
use crate::core::{Diagnostic, HurstMethod, MultiscaleConfig, MultiscaleMethod};
use crate::math::stats::{
    correlation, is_constant, mean, min_max, population_std_dev, sample_std_dev,
};
use crate::math::timeseries::block_sums;
use crate::math::wavelet::haar_decompose;

const RANDOM_WALK_TOLERANCE: f64 = 1.0e-9;

/// Representation of a return series at `scale`.
pub fn scale_series(returns: &[f64], scale: u32, method: MultiscaleMethod) -> Vec<f64> {
    if scale == 0 {
        return returns.to_vec();
    }
    match method {
        MultiscaleMethod::Aggregation => match 1usize.checked_shl(scale) {
            Some(window) => block_sums(returns, window),
            None => Vec::new(),
        },
        MultiscaleMethod::HaarDetail => haar_decompose(returns)
            .detail(scale as usize)
            .map(<[f64]>::to_vec)
            .unwrap_or_default(),
    }
}

/// Correlation of two index-aligned series at `scale`; both are cut to the shorter length.
pub fn correlation_at_scale(a: &[f64], b: &[f64], scale: u32, method: MultiscaleMethod) -> f64 {
    let n = a.len().min(b.len());
    let xa = scale_series(&a[..n], scale, method);
    let xb = scale_series(&b[..n], scale, method);
    correlation(&xa, &xb)
}

/// Correlation by scale for one pair of series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EppsProfile {
    pub left: String,
    pub right: String,
    pub method: MultiscaleMethod,
    /// `(scale, correlation)` in the configured scale order.
    pub points: Vec<(u32, f64)>,
}

impl EppsProfile {
    pub fn correlation(&self, scale: u32) -> Option<f64> {
        self.points
            .iter()
            .find(|(s, _)| *s == scale)
            .map(|&(_, c)| c)
    }

    /// Coarsest-scale correlation exceeds the finest-scale one.
    pub fn rises_with_scale(&self) -> bool {
        let finest = self.points.iter().min_by_key(|(s, _)| *s);
        let coarsest = self.points.iter().max_by_key(|(s, _)| *s);
        match (finest, coarsest) {
            (Some(&(s0, c0)), Some(&(s1, c1))) => s1 > s0 && c1 > c0,
            _ => false,
        }
    }
}

pub fn epps_profile(
    left: (&str, &[f64]),
    right: (&str, &[f64]),
    config: &MultiscaleConfig,
) -> EppsProfile {
    let points = config
        .scales
        .iter()
        .map(|&s| (s, correlation_at_scale(left.1, right.1, s, config.method)))
        .collect();
    EppsProfile {
        left: left.0.to_string(),
        right: right.0.to_string(),
        method: config.method,
        points,
    }
}

/// Profiles for every unordered pair of named return series, in input order.
pub fn multiscale_correlations(
    series: &[(String, Vec<f64>)],
    config: &MultiscaleConfig,
) -> RiskResult<Vec<EppsProfile>> {
    config.validate()?;
    for (name, r) in series {
        validate_finite(r, name)?;
    }
    let pairs: Vec<(usize, usize)> = (0..series.len())
        .flat_map(|i| (i + 1..series.len()).map(move |j| (i, j)))
        .collect();
    let profile = |&(i, j): &(usize, usize)| {
        let (a, b) = (&series[i], &series[j]);
        epps_profile(
            (a.0.as_str(), a.1.as_slice()),
            (b.0.as_str(), b.1.as_slice()),
            config,
        )
    };

    #[cfg(feature = "parallel")]
    let out = pairs.par_iter().map(profile).collect();
    #[cfg(not(feature = "parallel"))]
    let out = pairs.iter().map(profile).collect();
    Ok(out)
}

/// Reading of a Hurst exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Persistence {
    /// H > 0.5, trending.
    Persistent,
    RandomWalk,
    /// H < 0.5, mean-reverting.
    AntiPersistent,
}

impl Persistence {
    pub fn from_hurst(h: f64) -> Self {
        if (h - 0.5).abs() <= RANDOM_WALK_TOLERANCE {
            Self::RandomWalk
        } else if h > 0.5 {
            Self::Persistent
        } else {
            Self::AntiPersistent
        }
    }
}

impl fmt::Display for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Persistent => "persistent/trending",
            Self::RandomWalk => "random walk",
            Self::AntiPersistent => "anti-persistent/mean-reverting",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HurstEstimate {
    pub hurst: f64,
    pub method: HurstMethod,
    pub observations: usize,
    pub persistence: Persistence,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rescaled range over the full sample; `None` when the returns have no dispersion.
fn rescaled_range(returns: &[f64]) -> Option<f64> {
    let n = returns.len();
    let m = mean(returns);
    let path: Vec<f64> = returns
        .iter()
        .scan(0.0, |acc, r| {
            *acc += r - m;
            Some(*acc)
        })
        .collect();
    let (lo, hi) = min_max(&path)?;
    let s = population_std_dev(returns);
    if is_constant(returns) || s <= 0.0 {
        return None;
    }
    let rs = (hi - lo) / s;
    if rs > 0.0 && n > 1 {
        Some(rs.ln() / (n as f64).ln())
    } else {
        Some(0.5)
    }
}

/// Second-moment scaling between native and pair-summed returns.
fn absolute_moment(returns: &[f64]) -> Option<f64> {
    let m2 = returns.iter().map(|r| r * r).sum::<f64>() / returns.len() as f64;
    let pairs: Vec<f64> = returns
        .chunks_exact(2)
        .map(|p| (p[0] + p[1]) * (p[0] + p[1]))
        .collect();
    if m2 <= 0.0 || pairs.is_empty() {
        return None;
    }
    let m2_pair = mean(&pairs);
    if m2_pair <= 0.0 {
        return Some(0.0);
    }
    Some(0.5 * (m2_pair / m2).log2())
}

/// Hurst exponent of a return series, clamped to `[0, 1]`.
///
/// A series without dispersion yields `H = 0.5` with a `DegenerateSample` diagnostic.
pub fn hurst_exponent(returns: &[f64], method: HurstMethod) -> RiskResult<HurstEstimate> {
    if returns.len() < 2 {
        return Err(RiskError::InsufficientData {
            what: "Hurst exponent",
            needed: 2,
            got: returns.len(),
        });
    }
    validate_finite(returns, "returns")?;

    let raw = match method {
        HurstMethod::RescaledRange => rescaled_range(returns),
        HurstMethod::AbsoluteMoment => absolute_moment(returns),
    };
    let mut diagnostics = Vec::new();
    let hurst = match raw {
        Some(h) => h.clamp(0.0, 1.0),
        None => {
            warn!(?method, "returns have no dispersion, Hurst set to 0.5");
            diagnostics.push(Diagnostic::DegenerateSample {
                what: "return dispersion".to_string(),
            });
            0.5
        }
    };
    debug!(?method, n = returns.len(), hurst, "Hurst exponent");

    Ok(HurstEstimate {
        hurst,
        method,
        observations: returns.len(),
        persistence: Persistence::from_hurst(hurst),
        diagnostics,
    })
}

/// Native volatility and its annualizations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityScaling {
    /// Sample standard deviation of native-period returns.
    pub native: f64,
    pub hurst: f64,
    pub periods_per_year: f64,
    /// `native * T^H`.
    pub annualized: f64,
    /// `native * sqrt(T)`, for comparison only.
    pub classical: f64,
}

impl VolatilityScaling {
    /// `annualized / classical`, the distortion from assuming `H = 0.5`.
    pub fn distortion(&self) -> f64 {
        if self.classical > 0.0 {
            self.annualized / self.classical
        } else {
            1.0
        }
    }
}

pub fn hurst_scaled_volatility(
    returns: &[f64],
    hurst: f64,
    periods_per_year: f64,
) -> RiskResult<VolatilityScaling> {
    if returns.len() < 2 {
        return Err(RiskError::InsufficientData {
            what: "volatility",
            needed: 2,
            got: returns.len(),
        });
    }
    if !(periods_per_year.is_finite() && periods_per_year > 0.0) {
        return Err(invalid("periods_per_year must be finite and > 0"));
    }
    if !(0.0..=1.0).contains(&hurst) {
        return Err(invalid(format!("hurst must be in [0,1], got {hurst}")));
    }
    let native = sample_std_dev(returns);
    Ok(VolatilityScaling {
        native,
        hurst,
        periods_per_year,
        annualized: native * periods_per_year.powf(hurst),
        classical: native * periods_per_year.sqrt(),
    })
}

/// Hurst estimate and Hurst-scaled volatility for one named series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingAnalysis {
    pub name: String,
    pub hurst: HurstEstimate,
    pub volatility: VolatilityScaling,
}

pub fn analyze_scaling(
    name: &str,
    returns: &[f64],
    config: &MultiscaleConfig,
) -> RiskResult<ScalingAnalysis> {
    config.validate()?;
    let hurst = hurst_exponent(returns, config.hurst)?;
    let volatility = hurst_scaled_volatility(returns, hurst.hurst, config.periods_per_year)?;
    Ok(ScalingAnalysis {
        name: name.to_string(),
        hurst,
        volatility,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn aggregation_sums_dyadic_windows() {
        let r = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(scale_series(&r, 0, MultiscaleMethod::Aggregation), r.to_vec());
        assert_eq!(
            scale_series(&r, 1, MultiscaleMethod::Aggregation),
            vec![3.0, 7.0, 11.0]
        );
        assert_eq!(scale_series(&r, 2, MultiscaleMethod::Aggregation), vec![10.0]);
        assert!(scale_series(&r, 3, MultiscaleMethod::Aggregation).is_empty());
    }

    #[test]
    fn haar_scale_uses_detail_level() {
        let r = [1.0, 3.0, 2.0, 2.0];
        assert_eq!(scale_series(&r, 1, MultiscaleMethod::HaarDetail), vec![-1.0, 0.0]);
        assert_eq!(scale_series(&r, 2, MultiscaleMethod::HaarDetail), vec![0.0]);
        assert!(scale_series(&r, 3, MultiscaleMethod::HaarDetail).is_empty());
    }

    #[test]
    fn zero_variance_scale_correlates_to_zero() {
        let a = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let b = [0.5, 0.2, -0.1, 0.3, 0.0, 0.4, -0.2, 0.1];
        assert_eq!(correlation_at_scale(&a, &b, 1, MultiscaleMethod::Aggregation), 0.0);
        assert_eq!(correlation_at_scale(&a, &b, 5, MultiscaleMethod::HaarDetail), 0.0);
        assert_relative_eq!(
            correlation_at_scale(&a, &a, 0, MultiscaleMethod::Aggregation),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn pair_sweep_covers_each_unordered_pair_once() {
        let series = vec![
            ("GBP".to_string(), vec![0.1, -0.2, 0.3, 0.0, 0.1, -0.1, 0.2, 0.05]),
            ("SEK".to_string(), vec![0.2, -0.1, 0.1, 0.1, 0.0, -0.2, 0.3, 0.0]),
            ("CAD".to_string(), vec![-0.1, 0.0, 0.2, -0.3, 0.1, 0.1, 0.0, 0.2]),
        ];
        let profiles = multiscale_correlations(&series, &MultiscaleConfig::default()).unwrap();
        let names: Vec<(&str, &str)> = profiles
            .iter()
            .map(|p| (p.left.as_str(), p.right.as_str()))
            .collect();
        assert_eq!(names, vec![("GBP", "SEK"), ("GBP", "CAD"), ("SEK", "CAD")]);
        assert!(profiles.iter().all(|p| p.points.len() == 4));
        assert!(profiles[0].correlation(0).is_some());
        assert!(profiles[0].correlation(9).is_none());
    }

    #[test]
    fn repeated_sweeps_and_hurst_are_bit_identical() {
        let wave = |phase: f64| -> Vec<f64> {
            (0..512)
                .map(|i| 0.01 * ((i as f64) * 0.37 + phase).sin() + 0.002 * ((i * 7) % 5) as f64)
                .collect()
        };
        let series = vec![
            ("EURUSD".to_string(), wave(0.0)),
            ("GBPUSD".to_string(), wave(1.1)),
            ("USDJPY".to_string(), wave(2.3)),
        ];
        let cfg = MultiscaleConfig::default();
        let a = multiscale_correlations(&series, &cfg).unwrap();
        let b = multiscale_correlations(&series, &cfg).unwrap();
        for (pa, pb) in a.iter().zip(&b) {
            for (&(_, x), &(_, y)) in pa.points.iter().zip(&pb.points) {
                assert_eq!(x.to_bits(), y.to_bits());
            }
        }
        for method in [HurstMethod::RescaledRange, HurstMethod::AbsoluteMoment] {
            let h1 = hurst_exponent(&series[0].1, method).unwrap();
            let h2 = hurst_exponent(&series[0].1, method).unwrap();
            assert_eq!(h1.hurst.to_bits(), h2.hurst.to_bits());
        }
    }

    #[test]
    fn rescaled_range_on_linear_trend_is_clamped() {
        let r: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let est = hurst_exponent(&r, HurstMethod::RescaledRange).unwrap();
        assert!(est.hurst > 0.5 && est.hurst <= 1.0);
        assert_eq!(est.persistence, Persistence::Persistent);
    }

    #[test]
    fn absolute_moment_of_alternating_returns_is_anti_persistent() {
        let r: Vec<f64> = (0..64).map(|i| if i % 2 == 0 { 0.01 } else { -0.01 }).collect();
        let est = hurst_exponent(&r, HurstMethod::AbsoluteMoment).unwrap();
        assert_eq!(est.hurst, 0.0);
        assert_eq!(est.persistence, Persistence::AntiPersistent);
    }

    #[test]
    fn absolute_moment_of_constant_returns_is_persistent() {
        let est = hurst_exponent(&[0.01; 32], HurstMethod::AbsoluteMoment).unwrap();
        assert_relative_eq!(est.hurst, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn flat_returns_default_to_random_walk() {
        let est = hurst_exponent(&[0.0; 50], HurstMethod::RescaledRange).unwrap();
        assert_eq!(est.hurst, 0.5);
        assert_eq!(est.persistence, Persistence::RandomWalk);
        assert_eq!(est.diagnostics.len(), 1);
    }

    #[test]
    fn half_hurst_recovers_square_root_scaling() {
        let r = [0.01, -0.02, 0.015, -0.005, 0.0, 0.012];
        let v = hurst_scaled_volatility(&r, 0.5, 252.0).unwrap();
        assert_relative_eq!(v.annualized, v.classical, epsilon = 1e-15);
        assert_relative_eq!(v.distortion(), 1.0, epsilon = 1e-12);

        let persistent = hurst_scaled_volatility(&r, 0.6, 252.0).unwrap();
        assert_relative_eq!(persistent.distortion(), 252.0_f64.powf(0.1), epsilon = 1e-12);
        assert!(hurst_scaled_volatility(&r, 1.2, 252.0).is_err());
    }
}
