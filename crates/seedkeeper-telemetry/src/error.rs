//! Crate error type.

use std::fmt::{self, Display, Formatter};

/// Errors surfaced while initializing telemetry or exporting metrics.
#[derive(Debug)]
pub enum TelemetryError {
    /// A Prometheus collector could not be constructed or registered.
    Collector(prometheus::Error),
    /// The global tracing subscriber was already installed.
    SubscriberAlreadySet,
    /// The metrics text-encoding pass failed.
    Encode(String),
}

impl Display for TelemetryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collector(source) => write!(f, "prometheus collector error: {source}"),
            Self::SubscriberAlreadySet => {
                f.write_str("global tracing subscriber already installed")
            }
            Self::Encode(detail) => write!(f, "metrics encode failed: {detail}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Collector(source) => Some(source),
            Self::SubscriberAlreadySet | Self::Encode(_) => None,
        }
    }
}

impl From<prometheus::Error> for TelemetryError {
    fn from(source: prometheus::Error) -> Self {
        Self::Collector(source)
    }
}

/// Convenience alias for fallible telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;
