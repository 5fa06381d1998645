//! Top-level risk namespace for tail, impact and scaling estimators.
//!
//! This module wires and re-exports:
//! - `var`: biweight-kernel VaR and Expected Shortfall,
//! - `backtest`: violation counting and Kupiec coverage test for a fitted threshold,
//! - `evt`: block extremes, Pickands shape and moment-matched GEV tails,
//! - `impact`: Bouchaud power-law impact and relaxation from a trade tape,
//! - `multiscale`: scale-dependent correlation (Epps profile) and Hurst-scaled volatility.
//!
//! Domain logic lives in submodules; this file only defines the public import surface
//! (`tailferric::risk::*`).

pub mod backtest;
pub mod evt;
pub mod impact;
pub mod multiscale;
pub mod var;

pub use backtest::{BacktestReport, backtest_threshold, count_violations};
pub use evt::{
    DIVERGENCE_FACTOR, GevParameters, GevTailFit, MIN_BLOCKS, PickandsEstimate, TailClass,
    TailSide, block_extremes, divergence_from_es, fit_both_tails, fit_gev_tail, gev_moment_fit,
    gev_var, pickands_shape,
};
pub use impact::{
    BouchaudEstimate, ImpactSample, Relaxation, VolumeEffect, estimate_bouchaud, fit_power_law,
    impact_sample, relaxation,
};
pub use multiscale::{
    EppsProfile, HurstEstimate, Persistence, ScalingAnalysis, VolatilityScaling,
    analyze_scaling, correlation_at_scale, epps_profile, hurst_exponent, hurst_scaled_volatility,
    multiscale_correlations, scale_series,
};
pub use var::{
    ExpectedShortfallEstimate, GAUSSIAN_ES_VAR_RATIO, KernelVarEstimate, expected_shortfall,
    expected_shortfall_from_prices, expected_shortfall_given_var, expected_shortfall_with,
    kernel_var, kernel_var_from_prices, kernel_var_with, tail_mean,
};
