//! Biweight kernel density estimation.
//!
//! `K(u) = 15/16 (1 - u^2)^2` on `[-1, 1]`, zero elsewhere, with Silverman's
//! rule-of-thumb bandwidth `h = c * sd * n^(-1/5)`.

use crate::core::error::{RiskError, RiskResult, invalid};
use crate::math::stats::{is_constant, sample_std_dev};

const BIWEIGHT_NORM: f64 = 15.0 / 16.0;

/// Quartic (biweight) kernel.
#[inline]
pub fn biweight(u: f64) -> f64 {
    if u.abs() <= 1.0 {
        let a = 1.0 - u * u;
        BIWEIGHT_NORM * a * a
    } else {
        0.0
    }
}

/// Silverman rule-of-thumb bandwidth.
///
/// Fails with `DegenerateSample` when the sample standard deviation is zero.
pub fn silverman_bandwidth(data: &[f64], constant: f64) -> RiskResult<f64> {
    if data.len() < 2 {
        return Err(RiskError::InsufficientData {
            what: "bandwidth",
            needed: 2,
            got: data.len(),
        });
    }
    if !(constant.is_finite() && constant > 0.0) {
        return Err(invalid("bandwidth constant must be finite and > 0"));
    }
    let sd = sample_std_dev(data);
    if is_constant(data) || !(sd.is_finite() && sd > 0.0) {
        return Err(RiskError::DegenerateSample(
            "sample standard deviation is zero, bandwidth undefined".to_string(),
        ));
    }
    Ok(constant * sd * (data.len() as f64).powf(-0.2))
}

/// Kernel density estimate built over a fixed sample and bandwidth.
#[derive(Debug, Clone, Copy)]
pub struct BiweightDensity<'a> {
    data: &'a [f64],
    bandwidth: f64,
}

impl<'a> BiweightDensity<'a> {
    pub fn new(data: &'a [f64], bandwidth: f64) -> RiskResult<Self> {
        if data.is_empty() {
            return Err(RiskError::InsufficientData {
                what: "kernel density",
                needed: 1,
                got: 0,
            });
        }
        if !(bandwidth.is_finite() && bandwidth > 0.0) {
            return Err(invalid(format!("bandwidth must be > 0, got {bandwidth}")));
        }
        Ok(Self { data, bandwidth })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// `f(x) = 1/(n h) * sum K((x - X_i)/h)`
    pub fn density(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let total: f64 = self.data.iter().map(|&xi| biweight((x - xi) / h)).sum();
        total / (self.data.len() as f64 * h)
    }
}
