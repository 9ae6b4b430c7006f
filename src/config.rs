//! Typed configuration loaded from the environment.

use std::collections::HashSet;

use anyhow::{Context, Result};

#[derive(Clone)]
pub struct Config {
    pub oracle_address: String,
    pub rpc_url: String,
    pub private_key: String,
    pub quote_api_key: String,
    pub update_interval_ms: u64,
    pub publish_hours_utc: HashSet<u8>,
    pub discovery_phase: bool,
    pub quote_timeout_ms: u64,
    pub publish_timeout_ms: u64,
}

impl Config {
    /// Build configuration from the environment, failing fast if a required
    /// key is missing. Mirrors the source's `env::var(...).unwrap_or(default)`
    /// convention for optional keys.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            oracle_address: required_env("ORACLE_ADDRESS")?,
            rpc_url: required_env("RPC_URL")?,
            private_key: required_env("PRIVATE_KEY")?,
            quote_api_key: required_env("QUOTE_API_KEY")?,
            update_interval_ms: std::env::var("UPDATE_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300_000),
            publish_hours_utc: parse_publish_hours(std::env::var("PUBLISH_HOURS_UTC").ok()),
            discovery_phase: std::env::var("DISCOVERY_PHASE")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(true),
            quote_timeout_ms: std::env::var("QUOTE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5_000),
            publish_timeout_ms: std::env::var("PUBLISH_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required config key {key}"))
}

fn parse_publish_hours(raw: Option<String>) -> HashSet<u8> {
    match raw {
        None => default_publish_hours(),
        Some(s) => {
            let hours: Option<HashSet<u8>> = s
                .split(',')
                .map(|part| part.trim().parse::<u8>().ok())
                .collect();
            match hours {
                Some(h) if !h.is_empty() => h,
                _ => default_publish_hours(),
            }
        }
    }
}

fn default_publish_hours() -> HashSet<u8> {
    [0u8, 12u8].into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        for (k, v) in vars {
            std::env::set_var(k, v);
        }
        f();
        for (k, _) in vars {
            std::env::remove_var(k);
        }
    }

    /// Both directions of `from_env` in one test: the env var mutations are
    /// process-global, so exercising missing-then-present here avoids races
    /// with other tests in this module running in parallel threads.
    #[test]
    fn from_env_required_keys_then_defaults() {
        std::env::remove_var("ORACLE_ADDRESS");
        std::env::remove_var("RPC_URL");
        std::env::remove_var("PRIVATE_KEY");
        std::env::remove_var("QUOTE_API_KEY");
        assert!(Config::from_env().is_err());

        with_env(
            &[
                ("ORACLE_ADDRESS", "0xabc"),
                ("RPC_URL", "https://rpc.example"),
                ("PRIVATE_KEY", "deadbeef"),
                ("QUOTE_API_KEY", "key123"),
            ],
            || {
                std::env::remove_var("PUBLISH_HOURS_UTC");
                std::env::remove_var("UPDATE_INTERVAL_MS");
                let cfg = Config::from_env().unwrap();
                assert_eq!(cfg.update_interval_ms, 300_000);
                assert_eq!(cfg.publish_hours_utc, default_publish_hours());
                assert!(cfg.discovery_phase);
            },
        );
    }

    #[test]
    fn publish_hours_parses_custom_list() {
        assert_eq!(
            parse_publish_hours(Some("3, 9,21".to_string())),
            [3u8, 9u8, 21u8].into_iter().collect()
        );
    }

    #[test]
    fn publish_hours_falls_back_on_garbage() {
        assert_eq!(parse_publish_hours(Some("not,a,list".to_string())), default_publish_hours());
    }
}
