//! Application-level error type.

use thiserror::Error;

/// Result alias for bootstrap operations.
pub type AppResult<T> = Result<T, AppError>;

/// Errors that can abort the boot sequence.
#[derive(Debug, Error)]
pub enum AppError {
    /// The configured core settings failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] seedkeeper_config::ConfigError),
    /// The global tracing subscriber could not be installed.
    #[error("telemetry initialization failed: {0}")]
    Telemetry(#[from] seedkeeper_telemetry::TelemetryError),
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for environment variable '{name}': {value}")]
    InvalidEnv {
        /// Name of the offending environment variable.
        name: &'static str,
        /// The value that failed to parse.
        value: String,
    },
    /// The API server failed to bind or serve.
    #[error("api server failed: {0}")]
    Serve(#[from] anyhow::Error),
}
