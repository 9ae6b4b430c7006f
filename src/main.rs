use std::process::ExitCode;

use chrono::Utc;
use metal_index_oracle::config;
use metal_index_oracle::engine;
use metal_index_oracle::logging::{log, obj, v_num, v_str, Domain, Level};
use metal_index_oracle::oracle::RpcOracleSink;
use metal_index_oracle::quote_source::GoldApiQuoteSource;
use tokio::time::{interval, Duration};

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = match config::Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            log(Level::Fatal, Domain::System, "config_load_failed", obj(&[("error", v_str(&e.to_string()))]));
            return ExitCode::FAILURE;
        }
    };

    let quote_source = match GoldApiQuoteSource::new(cfg.quote_api_key.clone(), cfg.quote_timeout_ms) {
        Ok(s) => s,
        Err(e) => {
            log(Level::Fatal, Domain::System, "quote_source_init_failed", obj(&[("error", v_str(&e.to_string()))]));
            return ExitCode::FAILURE;
        }
    };
    let oracle_sink = match RpcOracleSink::new(
        cfg.rpc_url.clone(),
        cfg.oracle_address.clone(),
        cfg.private_key.clone(),
        cfg.publish_timeout_ms,
    ) {
        Ok(s) => s,
        Err(e) => {
            log(Level::Fatal, Domain::System, "oracle_sink_init_failed", obj(&[("error", v_str(&e.to_string()))]));
            return ExitCode::FAILURE;
        }
    };

    let mut engine = engine::Engine::new(&cfg);
    let mut ticker = interval(Duration::from_millis(cfg.update_interval_ms));

    log(
        Level::Info,
        Domain::System,
        "engine_started",
        obj(&[("update_interval_ms", v_num(cfg.update_interval_ms as f64))]),
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Utc::now();
                let report = engine.tick(&quote_source, &oracle_sink, now).await;
                log(
                    Level::Info,
                    Domain::System,
                    "tick_complete",
                    obj(&[
                        ("fetched", v_str(&report.fetched.to_string())),
                        ("regime", v_str(&format!("{:?}", report.regime))),
                        ("published", v_str(&report.published.to_string())),
                    ]),
                );
            }
            _ = tokio::signal::ctrl_c() => {
                log(Level::Info, Domain::System, "shutdown_requested", obj(&[]));
                break;
            }
        }
    }

    ExitCode::SUCCESS
}
