//! Sample moments and co-moments.
//!
//! Two variance conventions are used across the estimators and both are exposed:
//! `sample_*` divides by `n - 1`, `population_*` divides by `n`. Empty input yields
//! `0.0` rather than `NaN`; callers that need a positive dispersion check for it.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sum_squared_deviations(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|x| (x - m) * (x - m)).sum()
}

/// Unbiased variance (`n - 1` denominator). Zero for fewer than two points.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    sum_squared_deviations(values) / (values.len() as f64 - 1.0)
}

pub fn sample_std_dev(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    sum_squared_deviations(values) / values.len() as f64
}

pub fn population_std_dev(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

/// Population covariance over the common prefix of `x` and `y`.
pub fn population_covariance(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (mx, my) = (mean(x), mean(y));
    x.iter()
        .zip(y)
        .map(|(a, b)| (a - mx) * (b - my))
        .sum::<f64>()
        / n as f64
}

/// Pearson correlation over the common prefix of `x` and `y`.
///
/// Defined as `0.0` when either side is empty or has zero variance.
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return 0.0;
    }
    sxy / (sxx * syy).sqrt()
}

pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &x| (lo.min(x), hi.max(x))),
    )
}

/// All values identical (or no values at all).
pub fn is_constant(values: &[f64]) -> bool {
    min_max(values).is_none_or(|(lo, hi)| lo == hi)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn variance_conventions_differ_by_bessel_factor() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(population_variance(&x), 1.25, epsilon = 1e-15);
        assert_relative_eq!(sample_variance(&x), 1.25 * 4.0 / 3.0, epsilon = 1e-15);
        assert_eq!(sample_variance(&[7.0]), 0.0);
    }

    #[test]
    fn correlation_of_affine_transform_is_one() {
        let x = [0.1, -0.3, 0.2, 0.5, -0.1];
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 1.0).collect();
        let z: Vec<f64> = x.iter().map(|v| -2.0 * v).collect();
        assert_relative_eq!(correlation(&x, &y), 1.0, epsilon = 1e-12);
        assert_relative_eq!(correlation(&x, &z), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn correlation_with_constant_series_is_zero() {
        assert_eq!(correlation(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]), 0.0);
        assert_eq!(correlation(&[], &[]), 0.0);
    }

    #[test]
    fn covariance_of_series_with_itself_is_variance() {
        let x = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(population_covariance(&x, &x), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn min_max_handles_empty_input() {
        assert_eq!(min_max(&[]), None);
        assert_eq!(min_max(&[3.0, -1.0, 2.0]), Some((-1.0, 3.0)));
        assert!(is_constant(&[0.01; 5]));
        assert!(!is_constant(&[0.01, 0.02]));
    }
}
