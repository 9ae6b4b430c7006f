//! C4: turns market-state signals into the risk-adjusted knobs the weight
//! solver and regime classifier consume.

use crate::metals::{Metal, ALL_METALS};
use crate::regime::Regime;
use crate::volatility::CorrMatrix;

const LAMBDA: f64 = 0.08;
const DRAWDOWN_THRESHOLD: f64 = 0.05;
const CORRELATION_STABILITY_THRESHOLD: f64 = 0.7;
const LIQUIDITY_STRESS_THRESHOLD: f64 = 0.8;
const DISPERSION_THRESHOLD: f64 = 0.15;
const DRAWDOWN_WINDOW: usize = 288 * 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceBias {
    Diversify,
    Neutral,
    /// Reserved for forward compatibility; never produced by [`assess`].
    Concentrate,
}

#[derive(Debug, Clone, Copy)]
pub struct RiskAdjustedParams {
    pub drift_cap: f64,
    pub weight_speed: f64,
    pub rebalance_bias: RebalanceBias,
    pub allow_regime_change: bool,
}

/// Largest observed peak-to-current drop over the most recent window, `0`
/// if there are fewer than two points to compare.
pub fn drawdown(index_series: &std::collections::VecDeque<f64>) -> f64 {
    let len = index_series.len();
    if len < 2 {
        return 0.0;
    }
    let window_start = len.saturating_sub(DRAWDOWN_WINDOW);
    let mut running_max = f64::MIN;
    let mut worst = 0.0_f64;
    for &value in index_series.iter().skip(window_start) {
        running_max = running_max.max(value);
        let dd = (running_max - value) / running_max;
        worst = worst.max(dd);
    }
    worst
}

/// `1 - 2 * mean(|diff|)` over the upper triangle of off-diagonal entries,
/// clamped to `[0, 1]`. `None` for the prior matrix means "no prior", which
/// reports maximal stability.
pub fn correlation_stability(current: &CorrMatrix, prior: Option<&CorrMatrix>) -> f64 {
    let prior = match prior {
        None => return 1.0,
        Some(p) => p,
    };
    let mut total = 0.0;
    let mut count = 0;
    for i in 0..4 {
        for j in (i + 1)..4 {
            total += (current[i][j] - prior[i][j]).abs();
            count += 1;
        }
    }
    let mean_diff = total / count as f64;
    (1.0 - 2.0 * mean_diff).max(0.0)
}

/// Normalized Shannon entropy of the weight vector, `wᵢ ln wᵢ = 0` at `wᵢ=0`.
pub fn weight_dispersion(weights: &[(Metal, f64)]) -> f64 {
    let n = weights.len() as f64;
    let entropy: f64 = -weights
        .iter()
        .map(|(_, w)| if *w <= 0.0 { 0.0 } else { w * w.ln() })
        .sum::<f64>();
    entropy / n.ln()
}

/// Produce this tick's risk-adjusted parameters and advance no state itself;
/// the caller is responsible for persisting `current_correlations` as the
/// next tick's prior.
pub fn assess(
    regime: Regime,
    regime_duration: u32,
    index_series: &std::collections::VecDeque<f64>,
    current_correlations: &CorrMatrix,
    prior_correlations: Option<&CorrMatrix>,
    weights: &[(Metal, f64)],
    liquidity_stress: f64,
) -> RiskAdjustedParams {
    let dd = drawdown(index_series);
    let stability = correlation_stability(current_correlations, prior_correlations);
    let dispersion = weight_dispersion(weights);

    let drawdown_mode = dd > DRAWDOWN_THRESHOLD;
    let fragmented = stability < CORRELATION_STABILITY_THRESHOLD;
    let stressed_liquidity = liquidity_stress > LIQUIDITY_STRESS_THRESHOLD;
    let overconcentration = dispersion < DISPERSION_THRESHOLD;
    let regime_locked = regime_duration < crate::regime::MIN_REGIME_DURATION;

    let params = regime.params();
    let drift_cap = (params.daily_cap
        * if drawdown_mode { 0.5 } else { 1.0 }
        * if stressed_liquidity { 0.7 } else { 1.0 })
        .max(0.005);
    let weight_speed = (LAMBDA
        * if drawdown_mode { 0.5 } else { 1.0 }
        * if fragmented { 0.3 } else { 1.0 })
        .max(0.01);
    let rebalance_bias = if overconcentration { RebalanceBias::Diversify } else { RebalanceBias::Neutral };

    RiskAdjustedParams {
        drift_cap,
        weight_speed,
        rebalance_bias,
        allow_regime_change: !regime_locked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn identity_corr() -> CorrMatrix {
        let mut m = [[0.0; 4]; 4];
        for i in 0..4 {
            m[i][i] = 1.0;
        }
        m
    }

    fn equal_weights() -> Vec<(Metal, f64)> {
        ALL_METALS.iter().map(|m| (*m, 0.25)).collect()
    }

    #[test]
    fn drawdown_is_zero_with_fewer_than_two_points() {
        let mut series = VecDeque::new();
        assert_eq!(drawdown(&series), 0.0);
        series.push_back(100.0);
        assert_eq!(drawdown(&series), 0.0);
    }

    #[test]
    fn drawdown_reports_largest_peak_to_trough_drop() {
        let series: VecDeque<f64> = [100.0, 110.0, 90.0, 95.0].into_iter().collect();
        let dd = drawdown(&series);
        assert!((dd - (110.0 - 90.0) / 110.0).abs() < 1e-9);
    }

    #[test]
    fn correlation_stability_is_one_with_no_prior() {
        assert_eq!(correlation_stability(&identity_corr(), None), 1.0);
    }

    #[test]
    fn correlation_stability_drops_with_large_shifts() {
        let current = identity_corr();
        let mut prior = identity_corr();
        prior[0][1] = 0.9;
        prior[1][0] = 0.9;
        let s = correlation_stability(&current, Some(&prior));
        assert!(s < 1.0);
    }

    #[test]
    fn weight_dispersion_is_one_when_uniform() {
        let d = weight_dispersion(&equal_weights());
        assert!((d - 1.0).abs() < 1e-9);
    }

    #[test]
    fn weight_dispersion_falls_with_concentration() {
        let concentrated = vec![(Metal::Xau, 0.94), (Metal::Xag, 0.02), (Metal::Xpt, 0.02), (Metal::Xpd, 0.02)];
        let d = weight_dispersion(&concentrated);
        assert!(d < DISPERSION_THRESHOLD);
    }

    #[test]
    fn drawdown_mode_halves_drift_cap_and_weight_speed() {
        let deep_drawdown: VecDeque<f64> = [100.0, 80.0].into_iter().collect();
        let params = assess(
            Regime::Low,
            10,
            &deep_drawdown,
            &identity_corr(),
            None,
            &equal_weights(),
            0.0,
        );
        assert!((params.drift_cap - 0.015).abs() < 1e-9);
        assert!((params.weight_speed - 0.04).abs() < 1e-9);
    }

    #[test]
    fn regime_lock_blocks_regime_change() {
        let flat: VecDeque<f64> = [100.0, 100.0].into_iter().collect();
        let params = assess(Regime::Low, 2, &flat, &identity_corr(), None, &equal_weights(), 0.0);
        assert!(!params.allow_regime_change);

        let params = assess(Regime::Low, 10, &flat, &identity_corr(), None, &equal_weights(), 0.0);
        assert!(params.allow_regime_change);
    }

    #[test]
    fn overconcentration_triggers_diversify_bias() {
        let flat: VecDeque<f64> = [100.0, 100.0].into_iter().collect();
        let concentrated = vec![(Metal::Xau, 0.97), (Metal::Xag, 0.01), (Metal::Xpt, 0.01), (Metal::Xpd, 0.01)];
        let params = assess(Regime::Low, 10, &flat, &identity_corr(), None, &concentrated, 0.0);
        assert_eq!(params.rebalance_bias, RebalanceBias::Diversify);
    }
}
