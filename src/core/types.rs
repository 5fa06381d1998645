use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::error::{RiskResult, invalid};
use crate::math::timeseries::{log_returns, simple_returns};

/// Dated closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Chronologically ordered, strictly positive price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Validates ordering and positivity.
    pub fn new(points: Vec<PricePoint>) -> RiskResult<Self> {
        if let Some(p) = points.iter().find(|p| !(p.price.is_finite() && p.price > 0.0)) {
            return Err(invalid(format!(
                "price on {} must be finite and > 0, got {}",
                p.date, p.price
            )));
        }
        if let Some(w) = points.windows(2).find(|w| w[1].date < w[0].date) {
            return Err(invalid(format!(
                "prices must be chronological: {} follows {}",
                w[1].date, w[0].date
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `r_t = ln(P_t / P_{t-1})`, one shorter than the series.
    pub fn log_returns(&self) -> RiskResult<Vec<f64>> {
        log_returns(&self.prices())
    }

    pub fn simple_returns(&self) -> RiskResult<Vec<f64>> {
        simple_returns(&self.prices())
    }
}

/// Aggressor side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSign {
    Buy,
    Sell,
}

impl TradeSign {
    /// Returns +1.0 for buys and -1.0 for sells.
    pub fn sign(self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }

    /// Maps the `{-1, +1}` wire convention.
    pub fn from_i8(value: i8) -> RiskResult<Self> {
        match value {
            1 => Ok(Self::Buy),
            -1 => Ok(Self::Sell),
            other => Err(invalid(format!("trade sign must be -1 or +1, got {other}"))),
        }
    }
}

/// Tick-level transaction.
///
/// `volume` is `None` when the feed did not report it; a reported zero is `Some(0.0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Time in fractional days.
    pub time: f64,
    /// Bid-ask spread at the transaction.
    pub spread: f64,
    pub volume: Option<f64>,
    pub sign: TradeSign,
    pub price: f64,
}

/// One high/low quote row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FxQuote {
    pub high: f64,
    pub low: f64,
}

impl FxQuote {
    pub fn mid(&self) -> f64 {
        0.5 * (self.high + self.low)
    }
}

/// Named quote history for one currency pair, aligned by row index with its siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxQuoteSeries {
    pub name: String,
    pub quotes: Vec<FxQuote>,
}

impl FxQuoteSeries {
    pub fn new(name: impl Into<String>, quotes: Vec<FxQuote>) -> Self {
        Self {
            name: name.into(),
            quotes,
        }
    }

    pub fn mid_prices(&self) -> Vec<f64> {
        self.quotes.iter().map(FxQuote::mid).collect()
    }

    /// Log returns of the mid price.
    pub fn log_returns(&self) -> RiskResult<Vec<f64>> {
        log_returns(&self.mid_prices())
    }
}
