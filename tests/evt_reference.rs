//! EVT Reference Tests
//!
//! Pickands on nb block extremes with k = nb/4 reads X_(nb-k), X_(nb-2k) and X_(nb-4k), the
//! last clamped to the smallest extreme. The lower gap then spans the whole bulk of the
//! extremes, which pulls xi negative for most continuous samples, so the classification
//! cases below are built from extremes whose spacing fixes the sign of xi:
//! - geometrically growing losses: the upper gap dominates, Frechet,
//! - Uniform(-a, a) draws: bounded, Weibull,
//! - any sample, once the Gumbel band is widened past |xi|: Gumbel.
//!
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal, StudentT, Uniform};
use tailferric::core::{Diagnostic, EvtConfig, RiskConfig, RiskError};
use tailferric::risk::{
    TailClass, TailSide, expected_shortfall, fit_both_tails, fit_gev_tail, gev_var,
};

fn sample<D: Distribution<f64>>(dist: D, n: usize, scale: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| scale * dist.sample(&mut rng)).collect()
}

// ============================================================================
// Classification
// ============================================================================

/// 16 blocks of 20 flat returns, block i holding one loss of 0.001 * 1.5^i.
fn geometric_losses() -> Vec<f64> {
    let mut r = vec![0.0; 16 * 20];
    for i in 0..16 {
        r[i * 20 + 7] = -0.001 * 1.5_f64.powi(i as i32);
    }
    r
}

#[test]
fn geometrically_spaced_losses_are_frechet() {
    let fit = fit_gev_tail(&geometric_losses(), TailSide::Left, &EvtConfig::default()).unwrap();
    assert_eq!(fit.n_blocks, 16);
    assert_eq!(fit.pickands.k, 4);
    let q = |j: i32| 0.001 * 1.5_f64.powi(j);
    let expected = ((q(11) - q(7)) / (q(7) - q(0))).log2();
    assert_abs_diff_eq!(fit.params.shape, expected, epsilon = 1e-12);
    assert!(fit.params.shape > 2.0);
    assert_eq!(fit.class, TailClass::Frechet);
    assert!(
        fit.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::MomentFallback { .. }))
    );
    for &(_, v) in &fit.var_table {
        assert!(v < 0.0);
    }
}

#[test]
fn uniform_losses_are_weibull() {
    let r = sample(Uniform::new(-0.03, 0.03).unwrap(), 40_000, 1.0, 2);
    let fit = fit_gev_tail(&r, TailSide::Left, &EvtConfig::default()).unwrap();
    assert!(fit.params.shape < -0.5, "xi = {}", fit.params.shape);
    assert_eq!(fit.class, TailClass::Weibull);
    assert!(fit.is_clean(), "{:?}", fit.diagnostics);
    assert_eq!(fit.class.description(), "bounded support");
}

#[test]
fn widened_gumbel_band_absorbs_small_shapes() {
    let r = sample(Normal::new(0.0, 1.0).unwrap(), 40_000, 0.01, 3);
    let fit = fit_gev_tail(&r, TailSide::Left, &EvtConfig::default()).unwrap();
    let [x1, x2, x3] = fit.pickands.order_statistics;
    let xi = ((x1 - x2) / (x2 - x3)).log2();
    assert_abs_diff_eq!(fit.params.shape, xi, epsilon = 1e-12);
    assert!(xi < 0.0, "xi = {xi}");
    assert_eq!(fit.class, TailClass::Weibull);

    let cfg = EvtConfig {
        gumbel_tolerance: xi.abs() + 0.1,
        ..EvtConfig::default()
    };
    let widened = fit_gev_tail(&r, TailSide::Left, &cfg).unwrap();
    assert_eq!(widened.params.shape, xi);
    assert_eq!(widened.class, TailClass::Gumbel);
    assert!(
        !widened
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::MomentFallback { .. }))
    );
}

// ============================================================================
// VaR table
// ============================================================================

#[test]
fn both_tails_mirror_on_symmetric_data() {
    let r = sample(Normal::new(0.0, 1.0).unwrap(), 20_000, 0.01, 4);
    let (left, right) = fit_both_tails(&r, &EvtConfig::default()).unwrap();
    assert_eq!(left.side, TailSide::Left);
    assert_eq!(right.side, TailSide::Right);
    for (&(p, lv), &(q, rv)) in left.var_table.iter().zip(&right.var_table) {
        assert_eq!(p, q);
        assert!(lv < 0.0 && rv > 0.0, "p={p}: left {lv}, right {rv}");
        assert_abs_diff_eq!(lv, -rv, epsilon = 0.006);
    }
}

#[test]
fn table_entries_match_threshold_formula() {
    let r = sample(StudentT::new(4.0).unwrap(), 10_000, 0.01, 5);
    let fit = fit_gev_tail(&r, TailSide::Left, &EvtConfig::default()).unwrap();
    let mut mirrored = fit.params;
    mirrored.location = -mirrored.location;
    for &(p, v) in &fit.var_table {
        assert_eq!(v, gev_var(&mirrored, p, fit.gumbel_tolerance));
        assert_eq!(v, fit.threshold(p).unwrap());
    }
    let levels: Vec<f64> = fit.var_table.iter().map(|&(p, _)| p).collect();
    assert_eq!(levels, vec![0.90, 0.95, 0.99, 0.995]);
    for w in fit.var_table.windows(2) {
        assert!(w[1].1 <= w[0].1);
    }
}

#[test]
fn configured_levels_flow_from_json() {
    let cfg = RiskConfig::from_json(
        r#"{ "evt": { "block_size": 10, "confidence_levels": [0.975, 0.999] } }"#,
    )
    .unwrap();
    let r = sample(Normal::new(0.0, 1.0).unwrap(), 1_000, 0.01, 6);
    let fit = fit_gev_tail(&r, TailSide::Right, &cfg.evt).unwrap();
    assert_eq!(fit.n_blocks, 100);
    assert_eq!(fit.var_table.len(), 2);
    assert!(fit.var_table[1].1 >= fit.var_table[0].1);
}

// ============================================================================
// Cross-checks and failures
// ============================================================================

#[test]
fn gaussian_evt_and_kernel_es_agree_within_an_order_of_magnitude() {
    let r = sample(Normal::new(0.0, 1.0).unwrap(), 5_000, 0.01, 7);
    let es = expected_shortfall(&r, 0.05).unwrap();
    let mut fit = fit_gev_tail(&r, TailSide::Left, &EvtConfig::default()).unwrap();
    let flagged = fit.cross_check_es(0.95, es.es).unwrap();
    assert!(flagged.is_none());
    assert!(
        !fit.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::ModelDivergence { .. }))
    );
}

#[test]
fn implausible_es_is_flagged_on_the_fit() {
    let r = sample(Normal::new(0.0, 1.0).unwrap(), 5_000, 0.01, 8);
    let mut fit = fit_gev_tail(&r, TailSide::Left, &EvtConfig::default()).unwrap();
    let flagged = fit.cross_check_es(0.95, -1.0e-6).unwrap();
    assert!(matches!(flagged, Some(Diagnostic::ModelDivergence { .. })));
    let divergences = fit
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::ModelDivergence { .. }))
        .count();
    assert_eq!(divergences, 1);
}

#[test]
fn short_history_is_insufficient() {
    let r = sample(Normal::new(0.0, 1.0).unwrap(), 150, 0.01, 9);
    let err = fit_gev_tail(&r, TailSide::Left, &EvtConfig::default()).unwrap_err();
    assert!(
        matches!(err, RiskError::InsufficientData { needed: 8, got: 7, .. }),
        "{err}"
    );
}
