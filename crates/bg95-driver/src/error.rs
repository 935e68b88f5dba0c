//! Error types for the driver crate.

use bg95_at::AtError;
use bg95_commands::network::cpin::CpinStatus;
use thiserror::Error;

/// Errors raised by the driver, its configuration and the workflow.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A command round-trip failed.
    #[error("AT error: {0}")]
    At(#[from] AtError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The SIM needs a PIN or PUK before the modem can register.
    #[error("SIM not ready: {0}")]
    SimNotReady(CpinStatus),

    /// The modem accepted the command but reported a failure result.
    #[error("AT+{command} rejected: {reason}")]
    Rejected {
        command: &'static str,
        reason: String,
    },

    #[error("Interrupted")]
    Interrupted,
}

impl DriverError {
    pub fn config(msg: impl Into<String>) -> Self {
        DriverError::Config(msg.into())
    }

    pub fn rejected(command: &'static str, reason: impl Into<String>) -> Self {
        DriverError::Rejected {
            command,
            reason: reason.into(),
        }
    }

    /// Check whether the failure is worth retrying after a back-off.
    ///
    /// Configuration problems and a locked SIM will not fix themselves.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            DriverError::Config(_) | DriverError::SimNotReady(_) | DriverError::Yaml(_)
        )
    }
}

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
