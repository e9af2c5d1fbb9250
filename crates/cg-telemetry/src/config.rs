//! Telemetry configuration from environment variables.

use serde::Deserialize;
use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Whether to write logs to stdout at all
    pub console_output: bool,

    /// Whether to emit JSON instead of human-readable lines
    pub json_logs: bool,

    /// Deployment environment (dev, staging, prod)
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "consent-grid".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            environment: "dev".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CG_SERVICE_NAME`: Service name (default: consent-grid)
    /// - `CG_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `CG_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `CG_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `CG_ENVIRONMENT`: Environment name (default: dev)
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of an existing configuration.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("CG_SERVICE_NAME").unwrap_or(self.service_name),

            log_level: env::var("CG_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(self.log_level),

            console_output: env::var("CG_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v))
                .unwrap_or(self.console_output),

            json_logs: env::var("CG_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(self.json_logs || is_container),

            environment: env::var("CG_ENVIRONMENT").unwrap_or(self.environment),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "consent-grid");
        assert_eq!(config.log_level, "info");
        assert!(config.console_output);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: TelemetryConfig = serde_json::from_str(r#"{"json_logs": true}"#).unwrap();
        assert!(config.json_logs);
        assert_eq!(config.environment, "dev");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
    }
}
