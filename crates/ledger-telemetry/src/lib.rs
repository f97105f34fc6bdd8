//! # Ledger Telemetry
//!
//! Structured logging for the ledger core. Every subsystem logs through
//! `tracing` macros with structured fields; this crate installs the
//! subscriber that renders them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_telemetry::{init_tracing, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_tracing(&config).expect("install subscriber");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CL_SERVICE_NAME` | `casper-ledger` | Service name in logs |
//! | `CL_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `CL_JSON_LOGS` | `false` | JSON output |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{init_tracing, try_init_for_tests};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
