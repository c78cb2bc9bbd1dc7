//! Validation helpers for [`crate::CoreConfig`].

use thiserror::Error;

use crate::defaults::MIN_SCAN_INTERVAL_SECS;
use crate::model::CoreConfig;

/// Structured errors emitted while validating a [`CoreConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field held a value outside its allowed range.
    #[error("invalid value for '{field}': {message}")]
    InvalidField {
        /// Name of the offending field.
        field: String,
        /// Human-readable description of the constraint that was violated.
        message: String,
    },
}

/// Validate every bound placed on configuration fields.
///
/// # Errors
///
/// Returns the first [`ConfigError`] encountered.
pub fn validate(config: &CoreConfig) -> Result<(), ConfigError> {
    if config.scan_interval_secs < MIN_SCAN_INTERVAL_SECS {
        return Err(ConfigError::InvalidField {
            field: "scan_interval_secs".to_string(),
            message: format!("must be at least {MIN_SCAN_INTERVAL_SECS} seconds"),
        });
    }

    if config.debounce_window_secs == 0 {
        return Err(ConfigError::InvalidField {
            field: "debounce_window_secs".to_string(),
            message: "must be positive".to_string(),
        });
    }

    if config.hardlink_index_ttl_secs == 0 {
        return Err(ConfigError::InvalidField {
            field: "hardlink_index_ttl_secs".to_string(),
            message: "must be positive".to_string(),
        });
    }

    if config.batch_size == 0 {
        return Err(ConfigError::InvalidField {
            field: "batch_size".to_string(),
            message: "must be positive".to_string(),
        });
    }

    if config.activity_retention_hours <= 0 {
        return Err(ConfigError::InvalidField {
            field: "activity_retention_hours".to_string(),
            message: "must be positive".to_string(),
        });
    }

    if config.activity_retention_max_runs == 0 {
        return Err(ConfigError::InvalidField {
            field: "activity_retention_max_runs".to_string(),
            message: "must be positive".to_string(),
        });
    }

    if config.condition_depth_limit == 0 {
        return Err(ConfigError::InvalidField {
            field: "condition_depth_limit".to_string(),
            message: "must be positive".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&CoreConfig::default()).is_ok());
    }

    #[test]
    fn rejects_scan_interval_below_minimum() {
        let config = CoreConfig {
            scan_interval_secs: 5,
            ..CoreConfig::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { field, .. } if field == "scan_interval_secs"));
    }

    #[test]
    fn rejects_zero_batch_size() {
        let config = CoreConfig {
            batch_size: 0,
            ..CoreConfig::default()
        };
        assert!(validate(&config).is_err());
    }
}
