//! Plain-text rendering of estimator results.
//!
//! Every estimator returns a structured value; the `Display` impls here only format it.
//! Each rendering lists the headline numbers followed by one `  ! ...` line per
//! diagnostic, so a clean result prints no `!` lines at all.

use std::fmt;

use crate::core::Diagnostic;
use crate::risk::backtest::BacktestReport;
use crate::risk::evt::{GevTailFit, TailSide};
use crate::risk::impact::{BouchaudEstimate, VolumeEffect};
use crate::risk::multiscale::{EppsProfile, HurstEstimate, ScalingAnalysis};
use crate::risk::var::{ExpectedShortfallEstimate, KernelVarEstimate};

fn write_diagnostics(f: &mut fmt::Formatter<'_>, diagnostics: &[Diagnostic]) -> fmt::Result {
    for d in diagnostics {
        writeln!(f, "  ! {d}")?;
    }
    Ok(())
}

fn pct(x: f64) -> String {
    format!("{:.4}%", 100.0 * x)
}

impl fmt::Display for KernelVarEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Kernel VaR({}) = {} (bandwidth {:.6}, mass {:.5}, {} steps)",
            pct(self.alpha),
            pct(self.var),
            self.bandwidth,
            self.mass,
            self.steps_taken
        )?;
        write_diagnostics(f, &self.diagnostics)
    }
}

impl fmt::Display for ExpectedShortfallEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.var)?;
        write!(
            f,
            "Kernel ES({}) = {} over {} tail observations",
            pct(self.var.alpha),
            pct(self.es),
            self.tail_size
        )?;
        match self.ratio() {
            Some(r) if self.is_fat_tailed() => writeln!(f, ", ES/VaR {r:.3} (fat left tail)")?,
            Some(r) => writeln!(f, ", ES/VaR {r:.3}")?,
            None => writeln!(f)?,
        }
        write_diagnostics(f, &self.diagnostics)
    }
}

impl fmt::Display for GevTailFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            TailSide::Left => "left (losses)",
            TailSide::Right => "right (gains)",
        };
        writeln!(
            f,
            "GEV {side}: {} blocks of {}, xi={:.4} mu={:.6} sigma={:.6}",
            self.n_blocks,
            self.block_size,
            self.params.shape,
            self.params.location,
            self.params.scale
        )?;
        writeln!(f, "  class: {}", self.class)?;
        for &(p, var) in &self.var_table {
            writeln!(f, "  VaR({}) = {}", pct(p), pct(var))?;
        }
        write_diagnostics(f, &self.diagnostics)
    }
}

impl fmt::Display for BouchaudEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = if self.defaulted { "default" } else { "fitted" };
        writeln!(
            f,
            "Bouchaud impact ({source}, n={}): lambda={:.6} delta={:.4} tau={:.6} sigma={:.6}",
            self.sample_size, self.lambda, self.delta, self.tau, self.sigma
        )?;
        write!(f, "  rho1={:.4}", self.rho1)?;
        if let Some(rho2) = self.rho2 {
            write!(f, " rho2={rho2:.4}")?;
        }
        if let Some(gamma) = self.decay_exponent {
            write!(f, " gamma={gamma:.4}")?;
        }
        writeln!(f, " mean dt={:.6}", self.mean_dt)?;
        writeln!(
            f,
            "  excluded: {} missing volume, {} non-positive volume, {} zero impact, {} non-finite impact",
            self.missing_volume,
            self.non_positive_volume,
            self.zero_impact,
            self.non_finite_impact
        )?;
        let effect = match self.volume_effect() {
            VolumeEffect::Strong => "strong volume effect",
            VolumeEffect::Weak => "weak volume effect",
        };
        let status = if self.needs_adjustment() {
            "needs adjustment"
        } else {
            "within band"
        };
        writeln!(f, "  {effect}, {status}")?;
        write_diagnostics(f, &self.diagnostics)
    }
}

impl fmt::Display for EppsProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} / {} ({:?})", self.left, self.right, self.method)?;
        for &(scale, corr) in &self.points {
            writeln!(f, "  scale {scale}: {corr:+.4}")?;
        }
        Ok(())
    }
}

impl fmt::Display for HurstEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "H = {:.4} ({:?}, n={}): {}",
            self.hurst, self.method, self.observations, self.persistence
        )?;
        write_diagnostics(f, &self.diagnostics)
    }
}

impl fmt::Display for ScalingAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        write!(f, "  {}", self.hurst)?;
        let v = &self.volatility;
        writeln!(
            f,
            "  sigma native {:.6}, annualized {:.6} (sqrt-T {:.6}, distortion {:.3})",
            v.native,
            v.annualized,
            v.classical,
            v.distortion()
        )
    }
}

impl fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Backtest at {}: {}/{} violations ({} vs expected {}, {:.1} expected)",
            pct(self.threshold),
            self.violations,
            self.observations,
            pct(self.violation_rate),
            pct(self.expected_rate),
            self.expected_violations()
        )?;
        writeln!(
            f,
            "  Kupiec LR {:.4}, p-value {:.4}",
            self.kupiec_lr, self.kupiec_p_value
        )
    }
}
