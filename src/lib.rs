//! TailFerric is a tail-risk and market-microstructure estimation library for return
//! series and trade tapes.
//!
//! The crate implements five independent estimators over plain in-memory data:
//! non-parametric (biweight kernel) VaR and Expected Shortfall, extreme value fits of
//! block extremes (Pickands shape, moment-matched GEV), the Bouchaud power-law impact
//! model with its relaxation time, scale-dependent correlation (the Epps effect) and
//! Hurst-exponent volatility scaling.
//!
//! References used across modules include:
//! - Silverman (1986) for kernel density bandwidth selection.
//! - Pickands (1975) and Embrechts, Kluppelberg and Mikosch (1997) for extreme values.
//! - Bouchaud, Farmer and Lillo (2009) for price impact and its decay.
//! - Epps (1979) and Hurst (1951) for the multiscale analysis.
//!
//! Numerical considerations:
//! - Quantile search runs on a fixed grid; exhausting it is reported, not silently clamped.
//! - Graceful degradations (empty tails, missing volume, undefined GEV moments) come back as
//!   [`core::Diagnostic`] entries on the result; only unusable inputs are errors.
//! - Every estimator is a pure function of its inputs and configuration.
//!
//! # Feature Flags
//! - `parallel`: fits both GEV tails and all Epps pairs on the Rayon pool.
//!
//! # Quick Start
//! Kernel VaR and Expected Shortfall from prices:
//! ```rust
//! use tailferric::risk::var::expected_shortfall_from_prices;
//!
//! let prices: Vec<f64> = (0..250)
//!     .map(|i| 100.0 * (1.0 + 0.01 * ((i as f64) * 0.9).sin()))
//!     .collect();
//! let es = expected_shortfall_from_prices(&prices, 0.05).unwrap();
//! assert!(es.var.var < 0.0);
//! assert!(es.es <= es.var.var);
//! ```
//!
//! Fit the loss tail with a GEV:
//! ```rust
//! use tailferric::core::EvtConfig;
//! use tailferric::risk::evt::{TailSide, fit_gev_tail};
//!
//! let returns: Vec<f64> = (0..400)
//!     .map(|i| 0.01 * ((i as f64 * 0.37).sin() + 0.5 * (i as f64 * 1.9).cos()))
//!     .collect();
//! let fit = fit_gev_tail(&returns, TailSide::Left, &EvtConfig::default()).unwrap();
//! assert_eq!(fit.n_blocks, 20);
//! assert_eq!(fit.var_table.len(), 4);
//! ```
//!
//! Hurst exponent and scaled volatility:
//! ```rust
//! use tailferric::core::MultiscaleConfig;
//! use tailferric::risk::multiscale::analyze_scaling;
//!
//! let returns: Vec<f64> = (0..512).map(|i| if i % 2 == 0 { 0.01 } else { -0.012 }).collect();
//! let a = analyze_scaling("alternating", &returns, &MultiscaleConfig::default()).unwrap();
//! assert!(a.hurst.hurst < 0.5);
//! ```

pub mod core;
pub mod math;
pub mod report;
pub mod risk;

/// Common imports for ergonomic usage.
pub mod prelude {
    pub use crate::core::*;
    pub use crate::risk::*;
}
