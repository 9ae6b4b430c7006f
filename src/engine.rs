//! Owns all per-process state and drives one pipeline step per tick.
//!
//! `Engine::tick` is deliberately infallible: every I/O failure is caught,
//! logged, and folded into the returned [`TickReport`] rather than
//! propagated, following this codebase's convention of a uniform outcome
//! type at the engine boundary (compare the source `engine/mod.rs` loop,
//! which never lets a single bad fetch kill the process).

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;

use crate::config::Config;
use crate::history::HistoryStore;
use crate::logging::{self, obj, v_num, v_str, Domain, Level};
use crate::metals::{Metal, ALL_METALS};
use crate::oracle::OracleSink;
use crate::publish::{to_micro_units, PublicationGate};
use crate::quote_source::QuoteSource;
use crate::regime::{Regime, RegimeState};
use crate::risk::{self, RiskAdjustedParams};
use crate::volatility::{self, CorrMatrix};
use crate::weights::{self, WeightVector};

/// Cooperative pause between sequential per-metal fetches, to respect the
/// quote source's rate limits. Overridable for tests via [`Engine::with_fetch_delay`].
const DEFAULT_FETCH_DELAY_MS: u64 = 1_500;

#[derive(Debug, Clone)]
pub struct TickReport {
    pub fetched: bool,
    pub abandon_reason: Option<String>,
    pub regime: Regime,
    pub index_value: Option<f64>,
    pub published: bool,
    pub publish_tx_id: Option<String>,
    /// Oracle's post-publish value, read back via `OracleSink::read_current`
    /// after a successful publish. `None` if nothing was published or the
    /// read-back itself failed (logged at `Warn`, non-fatal).
    pub read_back_index_e6: Option<u64>,
}

pub struct Engine {
    history: HistoryStore,
    weights: WeightVector,
    regime_state: RegimeState,
    prior_correlations: Option<CorrMatrix>,
    gate: PublicationGate,
    publish_hours: HashSet<u8>,
    discovery_phase: bool,
    fetch_delay: Duration,
}

impl Engine {
    pub fn new(config: &Config) -> Self {
        Self {
            history: HistoryStore::new(),
            weights: WeightVector::initial(),
            regime_state: RegimeState::new(),
            prior_correlations: None,
            gate: PublicationGate::new(),
            publish_hours: config.publish_hours_utc.clone(),
            discovery_phase: config.discovery_phase,
            fetch_delay: Duration::from_millis(DEFAULT_FETCH_DELAY_MS),
        }
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn regime(&self) -> Regime {
        self.regime_state.current
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    pub fn index_history_len(&self) -> usize {
        self.history.index_series().len()
    }

    pub async fn tick(
        &mut self,
        quote_source: &dyn QuoteSource,
        oracle: &dyn OracleSink,
        now: DateTime<Utc>,
    ) -> TickReport {
        let fetched = match self.fetch_all_quotes(quote_source).await {
            Ok(quotes) => quotes,
            Err(reason) => {
                logging::log(Level::Warn, Domain::Quote, "tick_abandoned", obj(&[("reason", v_str(&reason))]));
                return TickReport {
                    fetched: false,
                    abandon_reason: Some(reason),
                    regime: self.regime_state.current,
                    index_value: None,
                    published: false,
                    publish_tx_id: None,
                    read_back_index_e6: None,
                };
            }
        };

        let mut prices_per_gram = [0.0_f64; 4];
        for m in ALL_METALS {
            prices_per_gram[m.index()] = weights::price_per_gram(fetched[m.index()]);
            self.history.record_price(m, now.timestamp_millis(), prices_per_gram[m.index()]);
        }

        let vols = volatility::all_volatilities(&self.history);
        let corr = volatility::correlation_matrix(&self.history);
        let liquidity = volatility::liquidity_stress(&vols);

        let regime = self.regime_state.advance(&vols);
        logging::log(
            Level::Debug,
            Domain::Regime,
            "regime_advanced",
            obj(&[("regime", v_str(&format!("{regime:?}"))), ("duration", v_num(self.regime_state.duration as f64))]),
        );

        let risk_params: RiskAdjustedParams = risk::assess(
            regime,
            self.regime_state.duration,
            self.history.index_series(),
            &corr,
            self.prior_correlations.as_ref(),
            &self.weights.as_pairs(),
            liquidity,
        );

        self.weights = weights::solve_weights(self.weights, &vols, risk_params.weight_speed, risk_params.rebalance_bias);

        let prices_per_gram_pairs: Vec<(Metal, f64)> =
            ALL_METALS.iter().map(|m| (*m, prices_per_gram[m.index()])).collect();
        let index_value = weights::composite_index(&self.weights, &prices_per_gram_pairs);
        self.history.record_index(index_value);
        self.prior_correlations = Some(corr);

        logging::log(
            Level::Info,
            Domain::Weight,
            "tick_computed",
            obj(&[("index", v_num(index_value)), ("drift_cap", v_num(risk_params.drift_cap))]),
        );

        let should_publish = self.gate.decide(now, &self.publish_hours, self.discovery_phase);
        let mut published = false;
        let mut publish_tx_id = None;
        let mut read_back_index_e6 = None;
        if should_publish {
            let index_e6 = to_micro_units(index_value);
            let by = |m: Metal| to_micro_units(prices_per_gram[m.index()]);
            match oracle.publish(index_e6, by(Metal::Xau), by(Metal::Xag), by(Metal::Xpt), by(Metal::Xpd)).await {
                Ok(Some(tx_id)) => {
                    published = true;
                    publish_tx_id = Some(tx_id);
                    logging::log(Level::Info, Domain::Publish, "published", obj(&[("tx_id", v_str(&publish_tx_id.clone().unwrap()))]));

                    match oracle.read_current().await {
                        Ok(value) => {
                            read_back_index_e6 = Some(value);
                            logging::log(Level::Debug, Domain::Publish, "read_back", obj(&[("index_e6", v_num(value as f64))]));
                        }
                        Err(e) => {
                            logging::log(Level::Warn, Domain::Publish, "read_back_failed", obj(&[("error", v_str(&e.to_string()))]));
                        }
                    }
                }
                Ok(None) => {
                    logging::log(Level::Warn, Domain::Publish, "publish_rejected", obj(&[]));
                }
                Err(e) => {
                    logging::log(Level::Warn, Domain::Publish, "publish_failed", obj(&[("error", v_str(&e.to_string()))]));
                }
            }
        }

        TickReport {
            fetched: true,
            abandon_reason: None,
            regime,
            index_value: Some(index_value),
            published,
            publish_tx_id,
            read_back_index_e6,
        }
    }

    /// Fetch all four metals in fixed order, pausing between requests.
    /// Buffers results locally; on any failure nothing is appended to
    /// history for this tick at all.
    async fn fetch_all_quotes(&self, quote_source: &dyn QuoteSource) -> Result<[f64; 4], String> {
        let mut quotes = [0.0_f64; 4];
        for (i, m) in ALL_METALS.iter().enumerate() {
            if i > 0 {
                sleep(self.fetch_delay).await;
            }
            match quote_source.fetch_quote(*m).await {
                Ok(price) => quotes[i] = price,
                Err(e) => return Err(format!("fetch failed for {m}: {e}")),
            }
        }
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleSink;
    use crate::quote_source::QuoteSource;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct StaticQuotes {
        prices: [f64; 4],
    }

    #[async_trait]
    impl QuoteSource for StaticQuotes {
        async fn fetch_quote(&self, metal: Metal) -> Result<f64> {
            Ok(self.prices[metal.index()])
        }
    }

    struct FailingQuotes;

    #[async_trait]
    impl QuoteSource for FailingQuotes {
        async fn fetch_quote(&self, _metal: Metal) -> Result<f64> {
            Err(anyhow::anyhow!("network unreachable"))
        }
    }

    struct NullOracle {
        published_count: Mutex<u32>,
    }

    impl NullOracle {
        fn new() -> Self {
            Self { published_count: Mutex::new(0) }
        }
    }

    #[async_trait]
    impl OracleSink for NullOracle {
        async fn publish(&self, _i: u64, _a: u64, _g: u64, _p: u64, _d: u64) -> Result<Option<String>> {
            *self.published_count.lock().unwrap() += 1;
            Ok(Some("tx-fake".to_string()))
        }
        async fn read_current(&self) -> Result<u64> {
            Ok(0)
        }
        fn last_update_at(&self) -> i64 {
            0
        }
        fn min_update_interval(&self) -> u64 {
            300
        }
    }

    fn test_config() -> Config {
        Config {
            oracle_address: "0xabc".to_string(),
            rpc_url: "https://rpc.example".to_string(),
            private_key: "key".to_string(),
            quote_api_key: "key".to_string(),
            update_interval_ms: 300_000,
            publish_hours_utc: [0u8, 12u8].into_iter().collect(),
            discovery_phase: true,
            quote_timeout_ms: 5000,
            publish_timeout_ms: 10000,
        }
    }

    #[tokio::test]
    async fn cold_start_tick_produces_an_index_and_low_regime() {
        let config = test_config();
        let mut engine = Engine::new(&config).with_fetch_delay(Duration::from_millis(0));
        let quotes = StaticQuotes { prices: [2000.0, 25.0, 1000.0, 1200.0] };
        let oracle = NullOracle::new();

        let now = Utc.with_ymd_and_hms(2026, 1, 1, 3, 0, 0).unwrap();
        let report = engine.tick(&quotes, &oracle, now).await;

        assert!(report.fetched);
        assert_eq!(report.regime, Regime::Low);
        assert!(report.index_value.unwrap() > 0.0);
        assert!(!report.published, "03:00 is not a publish hour");
    }

    #[tokio::test]
    async fn failed_fetch_abandons_tick_without_mutating_history() {
        let config = test_config();
        let mut engine = Engine::new(&config).with_fetch_delay(Duration::from_millis(0));
        let quotes = FailingQuotes;
        let oracle = NullOracle::new();

        let now = Utc.with_ymd_and_hms(2026, 1, 1, 3, 0, 0).unwrap();
        let report = engine.tick(&quotes, &oracle, now).await;

        assert!(!report.fetched);
        assert!(report.abandon_reason.is_some());
        assert_eq!(engine.index_history_len(), 0);
    }

    #[tokio::test]
    async fn publish_hour_window_triggers_oracle_publish() {
        let config = test_config();
        let mut engine = Engine::new(&config).with_fetch_delay(Duration::from_millis(0));
        let quotes = StaticQuotes { prices: [2000.0, 25.0, 1000.0, 1200.0] };
        let oracle = NullOracle::new();

        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 5, 0).unwrap();
        let report = engine.tick(&quotes, &oracle, now).await;
        assert!(report.published);
        assert_eq!(report.publish_tx_id, Some("tx-fake".to_string()));
        assert_eq!(report.read_back_index_e6, Some(0));
    }
}
