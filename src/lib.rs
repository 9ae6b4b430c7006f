//! Precious-metals composite index engine: ingests per-metal spot quotes,
//! computes a volatility-weighted index, and publishes it to an oracle sink
//! under risk-moderated rate limits.

pub mod config;
pub mod engine;
pub mod history;
pub mod logging;
pub mod metals;
pub mod oracle;
pub mod publish;
pub mod quote_source;
pub mod regime;
pub mod retry;
pub mod risk;
pub mod volatility;
pub mod weights;
