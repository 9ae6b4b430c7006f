//! C5: inverse-volatility target weights, diversification bias, exponential
//! smoothing, and the composite index value.

use crate::metals::{Metal, ALL_METALS, OUNCE_TO_GRAM};
use crate::risk::RebalanceBias;
use crate::volatility::VolatilityMap;

const MAX_PROJECTION_PASSES: usize = 8;
const PROJECTION_TOLERANCE: f64 = 1e-9;

/// Four-slot weight vector indexed in [`ALL_METALS`] order.
#[derive(Debug, Clone, Copy)]
pub struct WeightVector {
    values: [f64; 4],
}

impl WeightVector {
    pub fn initial() -> Self {
        let mut values = [0.0; 4];
        for (i, m) in ALL_METALS.iter().enumerate() {
            values[i] = m.initial_weight();
        }
        Self { values }
    }

    pub fn get(&self, metal: Metal) -> f64 {
        self.values[metal.index()]
    }

    pub fn set(&mut self, metal: Metal, value: f64) {
        self.values[metal.index()] = value;
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn as_pairs(&self) -> Vec<(Metal, f64)> {
        ALL_METALS.iter().map(|m| (*m, self.get(*m))).collect()
    }
}

/// Iterative clamp-then-renormalize projection onto the simplex-with-bounds.
/// A single clamp+renormalize pass can push a renormalized entry back
/// outside its own band; repeating the pass converges to a fixpoint
/// satisfying both the sum and band invariants to float tolerance.
fn project_to_bounds(mut v: WeightVector) -> WeightVector {
    for _ in 0..MAX_PROJECTION_PASSES {
        for m in ALL_METALS {
            let (lo, hi) = m.weight_bounds();
            v.set(m, v.get(m).clamp(lo, hi));
        }
        let total = v.sum();
        if total <= 0.0 {
            break;
        }
        for m in ALL_METALS {
            v.set(m, v.get(m) / total);
        }
        let within_bounds = ALL_METALS.iter().all(|m| {
            let (lo, hi) = m.weight_bounds();
            v.get(*m) >= lo - PROJECTION_TOLERANCE && v.get(*m) <= hi + PROJECTION_TOLERANCE
        });
        if within_bounds && (v.sum() - 1.0).abs() < PROJECTION_TOLERANCE {
            break;
        }
    }
    v
}

/// Raw inverse-volatility shares, clamped per-band, renormalized to sum 1.
pub fn target_weights(vols: &VolatilityMap) -> WeightVector {
    let inv: Vec<(Metal, f64)> = ALL_METALS.iter().map(|m| (*m, 1.0 / vols.get(*m))).collect();
    let total_inv: f64 = inv.iter().map(|(_, v)| v).sum();

    let mut raw = WeightVector::initial();
    for (m, v) in &inv {
        raw.set(*m, v / total_inv);
    }
    project_to_bounds(raw)
}

/// Pull targets 70/30 toward their band centers, then renormalize.
pub fn apply_diversification_bias(mut target: WeightVector) -> WeightVector {
    for m in ALL_METALS {
        let (lo, hi) = m.weight_bounds();
        let center = (lo + hi) / 2.0;
        target.set(m, 0.7 * target.get(m) + 0.3 * center);
    }
    let total = target.sum();
    for m in ALL_METALS {
        target.set(m, target.get(m) / total);
    }
    target
}

/// One exponential-smoothing step toward `target` at rate `weight_speed`,
/// followed by the clamp+renormalize projection.
pub fn smooth_toward(current: WeightVector, target: WeightVector, weight_speed: f64) -> WeightVector {
    let mut next = current;
    for m in ALL_METALS {
        let w = (1.0 - weight_speed) * current.get(m) + weight_speed * target.get(m);
        next.set(m, w);
    }
    project_to_bounds(next)
}

/// Full C5 step: target → (optional diversification bias) → smoothed weights.
pub fn solve_weights(
    current: WeightVector,
    vols: &VolatilityMap,
    weight_speed: f64,
    rebalance_bias: RebalanceBias,
) -> WeightVector {
    let mut target = target_weights(vols);
    if rebalance_bias == RebalanceBias::Diversify {
        target = apply_diversification_bias(target);
    }
    smooth_toward(current, target, weight_speed)
}

pub fn price_per_gram(price_per_ounce: f64) -> f64 {
    price_per_ounce / OUNCE_TO_GRAM
}

/// `Σ w[m] · price_per_gram[m]`.
pub fn composite_index(weights: &WeightVector, prices_per_gram: &[(Metal, f64)]) -> f64 {
    prices_per_gram.iter().map(|(m, p)| weights.get(*m) * p).sum()
}
