//! Application bootstrap wiring: config → telemetry → stores → scheduler → API.
//!
//! Concrete torrent-client, rule-store, quality-store and release-parser
//! implementations are external collaborators this workspace only defines
//! the interfaces for; bootstrap wires up everything it owns and starts
//! the HTTP surface with no instance registered. A deployer that has
//! those collaborators calls
//! [`seedkeeper_scheduler::SchedulerRegistry::start`] once it has them.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use seedkeeper_api::{ApiServer, ApiState};
use seedkeeper_config::CoreConfig;
use seedkeeper_scheduler::SchedulerRegistry;
use seedkeeper_store::{ActivityRunStore, RetentionPolicy};
use seedkeeper_telemetry::{LogFormat, LoggingConfig, Metrics};
use tracing::info;

use crate::error::{AppError, AppResult};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 7878;

/// Dependencies required to boot the application, separated from
/// [`run_app`] so tests can construct them without touching the environment.
pub(crate) struct BootstrapDependencies {
    logging: LoggingConfig<'static>,
    config: CoreConfig,
    bind_addr: IpAddr,
    port: u16,
}

impl BootstrapDependencies {
    /// Read configuration from the environment. Every field falls back to
    /// [`CoreConfig::default`] or [`DEFAULT_BIND_ADDR`]/[`DEFAULT_PORT`] if
    /// its variable is unset.
    pub(crate) fn from_env() -> AppResult<Self> {
        let level = std::env::var("SEEDKEEPER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = if env_flag("SEEDKEEPER_LOG_JSON") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };
        let logging = LoggingConfig {
            level: Box::leak(level.into_boxed_str()),
            format,
            build_id: seedkeeper_telemetry::build_id(),
        };

        let mut config = CoreConfig::default();
        if let Some(value) = env_u64("SEEDKEEPER_SCAN_INTERVAL_SECS")? {
            config.scan_interval_secs = value;
        }
        if let Some(value) = env_u64("SEEDKEEPER_DEBOUNCE_WINDOW_SECS")? {
            config.debounce_window_secs = value;
        }
        if let Some(value) = env_u64("SEEDKEEPER_HARDLINK_INDEX_TTL_SECS")? {
            config.hardlink_index_ttl_secs = value;
        }
        seedkeeper_config::validate(&config)?;

        let bind_addr = match std::env::var("SEEDKEEPER_BIND_ADDR") {
            Ok(value) => IpAddr::from_str(&value).map_err(|_| AppError::InvalidEnv {
                name: "SEEDKEEPER_BIND_ADDR",
                value,
            })?,
            Err(_) => IpAddr::from_str(DEFAULT_BIND_ADDR).expect("default bind address is valid"),
        };
        let port = match std::env::var("SEEDKEEPER_PORT") {
            Ok(value) => value.parse().map_err(|_| AppError::InvalidEnv {
                name: "SEEDKEEPER_PORT",
                value,
            })?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            logging,
            config,
            bind_addr,
            port,
        })
    }
}

/// Entry point for the boot sequence.
///
/// # Errors
///
/// Returns an error if configuration is invalid, telemetry cannot be
/// initialized, or the API listener fails to bind or serve.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    seedkeeper_telemetry::init_logging(&dependencies.logging)?;
    info!("seedkeeper bootstrap starting");

    let metrics = Metrics::new()?;
    let activity_store = Arc::new(ActivityRunStore::new(RetentionPolicy {
        retention: chrono::Duration::hours(dependencies.config.activity_retention_hours),
        max_runs: dependencies.config.activity_retention_max_runs,
    }));
    let scheduler = Arc::new(SchedulerRegistry::new());

    let state = Arc::new(ApiState::new(Arc::clone(&scheduler), activity_store, metrics));
    let server = ApiServer::new(state);

    let addr = SocketAddr::new(dependencies.bind_addr, dependencies.port);
    info!(%addr, "launching seedkeeper-api listener");
    server.serve(addr).await.map_err(AppError::Serve)?;

    info!("seedkeeper-api shutdown complete");
    Ok(())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_u64(name: &str) -> AppResult<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::InvalidEnv { name: name_leak(name), value }),
        Err(_) => Ok(None),
    }
}

fn name_leak(name: &str) -> &'static str {
    match name {
        "SEEDKEEPER_SCAN_INTERVAL_SECS" => "SEEDKEEPER_SCAN_INTERVAL_SECS",
        "SEEDKEEPER_DEBOUNCE_WINDOW_SECS" => "SEEDKEEPER_DEBOUNCE_WINDOW_SECS",
        "SEEDKEEPER_HARDLINK_INDEX_TTL_SECS" => "SEEDKEEPER_HARDLINK_INDEX_TTL_SECS",
        _ => "SEEDKEEPER_ENV",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_handles_truthy_and_falsey() {
        // SAFETY-equivalent: single-threaded test, no concurrent env access.
        unsafe {
            std::env::set_var("SEEDKEEPER_TEST_FLAG", "TrUe");
        }
        assert!(env_flag("SEEDKEEPER_TEST_FLAG"));
        unsafe {
            std::env::set_var("SEEDKEEPER_TEST_FLAG", "no");
        }
        assert!(!env_flag("SEEDKEEPER_TEST_FLAG"));
        unsafe {
            std::env::remove_var("SEEDKEEPER_TEST_FLAG");
        }
        assert!(!env_flag("SEEDKEEPER_TEST_FLAG"));
    }

    #[test]
    fn env_u64_rejects_unparseable_values() {
        unsafe {
            std::env::set_var("SEEDKEEPER_TEST_NUMBER", "not-a-number");
        }
        assert!(env_u64("SEEDKEEPER_TEST_NUMBER").is_err());
        unsafe {
            std::env::remove_var("SEEDKEEPER_TEST_NUMBER");
        }
    }
}
