//! C1: append-only bounded history rings per metal, plus the index series.

use std::collections::{HashMap, VecDeque};

use crate::metals::{Metal, ALL_METALS};

pub const MAX_HISTORY_POINTS: usize = 288;
pub const MAX_INDEX_HISTORY: usize = 288 * 14;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp_ms: i64,
    pub price: f64,
}

#[derive(Clone)]
pub struct HistoryStore {
    price_history: HashMap<Metal, VecDeque<PricePoint>>,
    index_history: VecDeque<f64>,
}

impl HistoryStore {
    pub fn new() -> Self {
        let mut price_history = HashMap::new();
        for m in ALL_METALS {
            price_history.insert(m, VecDeque::with_capacity(MAX_HISTORY_POINTS));
        }
        Self { price_history, index_history: VecDeque::with_capacity(MAX_INDEX_HISTORY) }
    }

    /// Append a price sample for `metal`. Non-positive prices are rejected
    /// (no state change). Returns whether the append happened.
    pub fn record_price(&mut self, metal: Metal, timestamp_ms: i64, price_per_gram: f64) -> bool {
        if !price_per_gram.is_finite() || price_per_gram <= 0.0 {
            return false;
        }
        let series = self.price_history.entry(metal).or_default();
        series.push_back(PricePoint { timestamp_ms, price: price_per_gram });
        while series.len() > MAX_HISTORY_POINTS {
            series.pop_front();
        }
        true
    }

    pub fn record_index(&mut self, value: f64) {
        self.index_history.push_back(value);
        while self.index_history.len() > MAX_INDEX_HISTORY {
            self.index_history.pop_front();
        }
    }

    pub fn history(&self, metal: Metal) -> &VecDeque<PricePoint> {
        self.price_history.get(&metal).expect("all four metals are seeded in HistoryStore::new")
    }

    pub fn index_series(&self) -> &VecDeque<f64> {
        &self.index_history
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
