//! Tracing Subscriber Initialization
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! JSON or a human-readable fmt layer.

use std::fmt;
use std::str::FromStr;

use larder_core::{ConfigError, LarderResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "larder_service=debug,larder_storage=info,info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Pretty => f.write_str("pretty"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(ConfigError::InvalidValue {
                field: "log_format".to_string(),
                value: other.to_string(),
                reason: "expected one of: json, pretty".to_string(),
            }),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Service version
    pub service_version: String,
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "larder-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl TelemetryConfig {
    /// Read `LARDER_SERVICE_NAME` and `LARDER_LOG_FORMAT` (json or pretty).
    pub fn from_env() -> LarderResult<Self> {
        let defaults = Self::default();
        let service_name = std::env::var("LARDER_SERVICE_NAME")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.service_name);
        let log_format = match std::env::var("LARDER_LOG_FORMAT") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.log_format,
        };

        Ok(Self {
            service_name,
            service_version: defaults.service_version,
            log_format,
        })
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup. A second call fails with `ConfigError::InitFailed`
/// instead of replacing the installed subscriber.
pub fn init_tracing(config: &TelemetryConfig) -> LarderResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };
    installed.map_err(|e| ConfigError::InitFailed {
        component: "tracing".to_string(),
        reason: e.to_string(),
    })?;

    tracing::info!(
        service_name = %config.service_name,
        service_version = %config.service_version,
        log_format = %config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::LarderError;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_telemetry_config_from_env() {
        let _name = EnvVarGuard::set("LARDER_SERVICE_NAME", None);
        let _format = EnvVarGuard::set("LARDER_LOG_FORMAT", None);
        let config = TelemetryConfig::from_env().expect("config should load");
        assert_eq!(config.service_name, "larder-service");
        assert_eq!(config.log_format, LogFormat::Json);

        let _name = EnvVarGuard::set("LARDER_SERVICE_NAME", Some("items-api"));
        let _format = EnvVarGuard::set("LARDER_LOG_FORMAT", Some("Pretty"));
        let config = TelemetryConfig::from_env().expect("config should load");
        assert_eq!(config.service_name, "items-api");
        assert_eq!(config.log_format, LogFormat::Pretty);

        let _format = EnvVarGuard::set("LARDER_LOG_FORMAT", Some("xml"));
        assert!(matches!(
            TelemetryConfig::from_env(),
            Err(LarderError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_second_init_fails() {
        let config = TelemetryConfig::default();
        // Another test may already have installed a subscriber.
        let _ = init_tracing(&config);

        let err = init_tracing(&config).unwrap_err();
        assert!(matches!(
            err,
            LarderError::Config(ConfigError::InitFailed { ref component, .. }) if component == "tracing"
        ));
    }
}
