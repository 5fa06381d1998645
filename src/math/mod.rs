//! Numerical kernels: sample statistics, return construction, biweight density,
//! the gamma function and the Haar transform.

pub mod gamma;
pub mod kernel;
pub mod stats;
pub mod timeseries;
pub mod wavelet;

pub use gamma::{gamma, gev_moment_factors};
pub use kernel::{BiweightDensity, biweight, silverman_bandwidth};
pub use stats::{
    correlation, is_constant, mean, min_max, population_covariance, population_std_dev, population_variance,
    sample_std_dev, sample_variance,
};
pub use timeseries::{
    autocorrelation, block_maxima, block_minima, block_sums, log_returns, simple_returns,
};
pub use wavelet::{HaarDecomposition, haar_decompose, haar_reconstruct};
