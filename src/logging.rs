//! Structured JSON-line logging, filtered by level and domain.
//!
//! Trimmed relative to the source logging stack: one stdout sink, no
//! run-directory file writers, no AI-agent or audit-trail helpers — those
//! were specific to the trading-bot domain this codebase was adapted from.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde_json::{json, Map, Value};

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

/// Component groupings this daemon logs under, used to filter via
/// `LOG_DOMAINS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Quote,
    Volatility,
    Regime,
    Risk,
    Weight,
    Publish,
    System,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Quote => "quote",
            Domain::Volatility => "volatility",
            Domain::Regime => "regime",
            Domain::Risk => "risk",
            Domain::Weight => "weight",
            Domain::Publish => "publish",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Emit one structured JSON line if `level`/`domain` pass the configured
/// filters. `fields` becomes the nested `data` object.
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let seq = LOG_SEQ.fetch_add(1, Ordering::SeqCst);
    let entry = json!({
        "ts": ts_now(),
        "seq": seq,
        "lvl": level.as_str().to_uppercase(),
        "component": domain.as_str(),
        "event": event,
        "data": Value::Object(fields),
    });
    println!("{entry}");
}

/// Convenience builder for the `fields` map passed to [`log`].
pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}
