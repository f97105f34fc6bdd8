//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive such as `cl_06_chain=debug,info`
    pub log_level: String,

    /// Whether to emit JSON instead of human-readable lines
    pub json_logs: bool,

    /// Whether to include ANSI colours in human-readable output
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "casper-ledger".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CL_SERVICE_NAME`: Service name (default: casper-ledger)
    /// - `CL_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `CL_JSON_LOGS`: Enable JSON logs (default: true inside containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();
        let json_logs = env::var("CL_JSON_LOGS")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(is_container);

        Self {
            service_name: env::var("CL_SERVICE_NAME")
                .unwrap_or_else(|_| "casper-ledger".to_string()),

            log_level: env::var("CL_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs,
            ansi: !json_logs,
        }
    }

    /// Quiet configuration used by test harnesses.
    pub fn for_tests() -> Self {
        Self {
            log_level: "warn".to_string(),
            ansi: false,
            ..Self::default()
        }
    }
}
