//! Named estimator variants and tuning constants.
//!
//! Every field has a default, so a partial JSON document only overrides what it names.
//!
//! ```rust
//! use tailferric::core::{HurstMethod, RiskConfig};
//!
//! let cfg = RiskConfig::from_json(r#"{ "multiscale": { "hurst": "AbsoluteMoment" } }"#).unwrap();
//! assert_eq!(cfg.multiscale.hurst, HurstMethod::AbsoluteMoment);
//! assert_eq!(cfg.kernel.steps, 1000);
//! ```

use serde::{Deserialize, Serialize};

use crate::core::error::{RiskResult, invalid, validate_probability};

/// Kernel-density quantile search settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelVarConfig {
    /// Silverman constant `c` in `h = c * sd * n^(-1/5)`.
    pub bandwidth_constant: f64,
    /// Number of integration steps across the padded data range.
    pub steps: usize,
    /// Padding below the minimum and above the maximum, in bandwidths.
    pub padding_bandwidths: f64,
}

impl Default for KernelVarConfig {
    fn default() -> Self {
        Self {
            bandwidth_constant: 1.06,
            steps: 1000,
            padding_bandwidths: 3.0,
        }
    }
}

/// Block-maxima / GEV settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvtConfig {
    pub block_size: usize,
    pub confidence_levels: Vec<f64>,
    /// `|xi|` at or below this is treated as Gumbel.
    pub gumbel_tolerance: f64,
}

impl Default for EvtConfig {
    fn default() -> Self {
        Self {
            block_size: 20,
            confidence_levels: vec![0.90, 0.95, 0.99, 0.995],
            gumbel_tolerance: 0.01,
        }
    }
}

/// How price impact enters the log-log regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImpactNormalization {
    /// `|P_i - P_{i-1}|`.
    #[default]
    Raw,
    /// `|P_i - P_{i-1}| / spread_i`.
    SpreadNormalized,
}

/// Bouchaud regression settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    pub normalization: ImpactNormalization,
    /// Returned when the usable sample is empty or log-volume has no spread.
    pub default_lambda: f64,
    pub default_delta: f64,
    /// Band around Kyle's 0.5 outside which the fit is flagged.
    pub delta_band: (f64, f64),
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            normalization: ImpactNormalization::Raw,
            default_lambda: 0.01,
            default_delta: 0.5,
            delta_band: (0.3, 0.7),
        }
    }
}

/// Scale construction for the multiscale correlation sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MultiscaleMethod {
    /// Sum returns in non-overlapping windows of `2^scale`.
    #[default]
    Aggregation,
    /// Correlate Haar detail coefficients at level `scale`.
    HaarDetail,
}

/// Hurst exponent estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HurstMethod {
    /// `ln(R/S) / ln(n)` on the full sample.
    #[default]
    RescaledRange,
    /// `0.5 * log2(M2' / M2)` from native and pair-summed second moments.
    AbsoluteMoment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiscaleConfig {
    pub method: MultiscaleMethod,
    pub scales: Vec<u32>,
    pub hurst: HurstMethod,
    /// Native periods per year used for annualization.
    pub periods_per_year: f64,
}

impl Default for MultiscaleConfig {
    fn default() -> Self {
        Self {
            method: MultiscaleMethod::Aggregation,
            scales: vec![0, 1, 2, 3],
            hurst: HurstMethod::RescaledRange,
            periods_per_year: 252.0,
        }
    }
}

/// Complete estimator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub kernel: KernelVarConfig,
    pub evt: EvtConfig,
    pub impact: ImpactConfig,
    pub multiscale: MultiscaleConfig,
}

impl RiskConfig {
    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> RiskResult<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json_pretty(&self) -> RiskResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> RiskResult<()> {
        self.kernel.validate()?;
        self.evt.validate()?;
        self.impact.validate()?;
        self.multiscale.validate()
    }
}

impl KernelVarConfig {
    pub fn validate(&self) -> RiskResult<()> {
        if !(self.bandwidth_constant.is_finite() && self.bandwidth_constant > 0.0) {
            return Err(invalid("bandwidth_constant must be finite and > 0"));
        }
        if self.steps == 0 {
            return Err(invalid("steps must be > 0"));
        }
        if !(self.padding_bandwidths.is_finite() && self.padding_bandwidths >= 0.0) {
            return Err(invalid("padding_bandwidths must be finite and >= 0"));
        }
        Ok(())
    }
}

impl EvtConfig {
    pub fn validate(&self) -> RiskResult<()> {
        if self.block_size == 0 {
            return Err(invalid("block_size must be > 0"));
        }
        for &p in &self.confidence_levels {
            validate_probability(p, "confidence level")?;
        }
        if !(self.gumbel_tolerance.is_finite() && self.gumbel_tolerance >= 0.0) {
            return Err(invalid("gumbel_tolerance must be finite and >= 0"));
        }
        Ok(())
    }
}

impl ImpactConfig {
    pub fn validate(&self) -> RiskResult<()> {
        let (lo, hi) = self.delta_band;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(invalid("delta_band must be an increasing finite pair"));
        }
        if !(self.default_lambda.is_finite() && self.default_lambda > 0.0) {
            return Err(invalid("default_lambda must be finite and > 0"));
        }
        if !self.default_delta.is_finite() {
            return Err(invalid("default_delta must be finite"));
        }
        Ok(())
    }
}

impl MultiscaleConfig {
    pub fn validate(&self) -> RiskResult<()> {
        if !(self.periods_per_year.is_finite() && self.periods_per_year > 0.0) {
            return Err(invalid("periods_per_year must be finite and > 0"));
        }
        if let Some(s) = self.scales.iter().find(|&&s| s > 30) {
            return Err(invalid(format!("scale {s} exceeds 30")));
        }
        Ok(())
    }
}
