//! C3: aggregate-volatility regime classification with dwell-time hysteresis.

use crate::metals::ALL_METALS;
use crate::volatility::VolatilityMap;

pub const MIN_REGIME_DURATION: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Low,
    Medium,
    High,
    Extreme,
}

/// Drift caps and dampening applicable to a regime; daily/weekly caps are
/// fractional units.
#[derive(Debug, Clone, Copy)]
pub struct RegimeParams {
    pub daily_cap: f64,
    pub weekly_cap: f64,
    pub max_price_change: f64,
    pub freq_multiplier: f64,
}

impl Regime {
    pub fn params(&self) -> RegimeParams {
        match self {
            Regime::Low => RegimeParams { daily_cap: 0.03, weekly_cap: 0.08, max_price_change: 0.05, freq_multiplier: 1.0 },
            Regime::Medium => RegimeParams { daily_cap: 0.02, weekly_cap: 0.05, max_price_change: 0.03, freq_multiplier: 1.0 },
            Regime::High => RegimeParams { daily_cap: 0.015, weekly_cap: 0.04, max_price_change: 0.02, freq_multiplier: 0.5 },
            Regime::Extreme => RegimeParams { daily_cap: 0.01, weekly_cap: 0.025, max_price_change: 0.01, freq_multiplier: 0.25 },
        }
    }
}

/// Aggregate daily-scale volatility consumed by the classifier.
pub fn aggregate_daily_volatility(vols: &VolatilityMap) -> f64 {
    let weighted: f64 = ALL_METALS.iter().map(|m| m.regime_weight() * vols.get(*m)).sum();
    weighted / 252.0_f64.sqrt()
}

fn candidate_regime(sigma_daily: f64) -> Regime {
    if sigma_daily < 0.01 {
        Regime::Low
    } else if sigma_daily < 0.03 {
        Regime::Medium
    } else if sigma_daily < 0.06 {
        Regime::High
    } else {
        Regime::Extreme
    }
}

/// Companion state the classifier owns across ticks.
#[derive(Debug, Clone, Copy)]
pub struct RegimeState {
    pub current: Regime,
    pub duration: u32,
}

impl RegimeState {
    pub fn new() -> Self {
        Self { current: Regime::Low, duration: 0 }
    }

    pub fn is_locked(&self) -> bool {
        self.duration < MIN_REGIME_DURATION
    }

    /// Run the dwell-time-gated transition for one tick.
    pub fn advance(&mut self, vols: &VolatilityMap) -> Regime {
        let candidate = candidate_regime(aggregate_daily_volatility(vols));
        if self.is_locked() {
            self.duration += 1;
            return self.current;
        }
        if candidate != self.current {
            self.current = candidate;
            self.duration = 0;
        } else {
            self.duration += 1;
        }
        self.current
    }
}

impl Default for RegimeState {
    fn default() -> Self {
        Self::new()
    }
}
