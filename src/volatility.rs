//! C2: log-return volatility and pairwise correlation.
//!
//! Rolling-statistics style ported from the source `indicators.rs`
//! (`RollingStd`'s recompute-from-window approach), generalized to operate
//! over the bounded per-metal price rings instead of a fixed-size window.

use crate::history::{HistoryStore, PricePoint};
use crate::metals::{Metal, ALL_METALS};

const MIN_POINTS_FOR_VOLATILITY: usize = 12;
const MIN_RETURNS_FOR_ESTIMATE: usize = 5;
const PERIODS_PER_YEAR: f64 = 105_120.0; // 5-minute cadence
const MIN_POINTS_FOR_CORRELATION: usize = 20;
const MAX_CORRELATION_WINDOW: usize = 100;

/// `ln(p_i / p_{i-1})`, skipping any pair where either side is non-positive.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0)
        .map(|w| (w[1] / w[0]).ln())
        .collect()
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn population_variance(xs: &[f64], mu: f64) -> f64 {
    xs.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / xs.len() as f64
}

/// Annualized volatility for one metal from its history, falling back to a
/// domain default when history is too sparse.
pub fn annualized_volatility(metal: Metal, history: &HistoryStore) -> f64 {
    let points = history.history(metal);
    if points.len() < MIN_POINTS_FOR_VOLATILITY {
        return metal.default_volatility();
    }
    let prices: Vec<f64> = points.iter().map(|p| p.price).collect();
    let returns = log_returns(&prices);
    if returns.len() < MIN_RETURNS_FOR_ESTIMATE {
        return 0.15;
    }
    let mu = mean(&returns);
    let s = population_variance(&returns, mu).sqrt();
    (s * PERIODS_PER_YEAR.sqrt()).clamp(0.05, 0.80)
}

pub fn all_volatilities(history: &HistoryStore) -> VolatilityMap {
    let mut map = VolatilityMap::default();
    for m in ALL_METALS {
        map.set(m, annualized_volatility(m, history));
    }
    map
}

/// Convenience fixed-size map over the four metals; avoids HashMap overhead
/// for a value copied and read many times per tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatilityMap {
    values: [f64; 4],
}

impl VolatilityMap {
    pub fn get(&self, metal: Metal) -> f64 {
        self.values[metal.index()]
    }

    pub fn set(&mut self, metal: Metal, value: f64) {
        self.values[metal.index()] = value;
    }
}

fn default_correlation(m1: Metal, m2: Metal) -> f64 {
    use Metal::*;
    match (m1.min(m2), m1.max(m2)) {
        (Xau, Xag) => 0.7,
        (Xau, Xpt) => 0.6,
        (Xau, Xpd) => 0.5,
        (Xag, Xpt) => 0.5,
        (Xag, Xpd) => 0.4,
        (Xpt, Xpd) => 0.6,
        _ => 1.0,
    }
}

fn recent_prices(points: &std::collections::VecDeque<PricePoint>, n: usize) -> Vec<f64> {
    let len = points.len();
    points.iter().skip(len.saturating_sub(n)).map(|p| p.price).collect()
}

/// Pearson correlation between the two metals' most recent common-length
/// return series, or a domain default if either history is too sparse.
pub fn pairwise_correlation(m1: Metal, m2: Metal, history: &HistoryStore) -> f64 {
    if m1 == m2 {
        return 1.0;
    }
    let h1 = history.history(m1);
    let h2 = history.history(m2);
    if h1.len() < MIN_POINTS_FOR_CORRELATION || h2.len() < MIN_POINTS_FOR_CORRELATION {
        return default_correlation(m1, m2);
    }

    let window = h1.len().min(h2.len()).min(MAX_CORRELATION_WINDOW);
    let p1 = recent_prices(h1, window);
    let p2 = recent_prices(h2, window);
    let r1 = log_returns(&p1);
    let r2 = log_returns(&p2);
    let n = r1.len().min(r2.len());
    if n == 0 {
        return 0.0;
    }
    let r1 = &r1[r1.len() - n..];
    let r2 = &r2[r2.len() - n..];

    let mu1 = mean(r1);
    let mu2 = mean(r2);
    let cov = r1.iter().zip(r2).map(|(a, b)| (a - mu1) * (b - mu2)).sum::<f64>() / n as f64;
    let sd1 = population_variance(r1, mu1).sqrt();
    let sd2 = population_variance(r2, mu2).sqrt();
    let denom = sd1 * sd2;
    if denom == 0.0 {
        0.0
    } else {
        cov / denom
    }
}

/// Symmetric 4x4 correlation matrix, diagonal 1, indexed by `Metal` order.
pub type CorrMatrix = [[f64; 4]; 4];

pub fn correlation_matrix(history: &HistoryStore) -> CorrMatrix {
    let mut m = [[0.0; 4]; 4];
    for (i, mi) in ALL_METALS.iter().enumerate() {
        for (j, mj) in ALL_METALS.iter().enumerate() {
            m[i][j] = if i == j { 1.0 } else { pairwise_correlation(*mi, *mj, history) };
        }
    }
    m
}

/// Aggregate liquidity stress signal in `[0, 1]`: metals whose realized
/// volatility runs well above their domain default contribute.
pub fn liquidity_stress(vols: &VolatilityMap) -> f64 {
    let mut sum = 0.0;
    for m in ALL_METALS {
        let ratio = vols.get(m) / m.default_volatility();
        if ratio > 1.5 {
            sum += 0.5 * (ratio - 1.5);
        }
    }
    (sum / 2.0).clamp(0.0, 1.0)
}
