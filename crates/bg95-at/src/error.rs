//! Error types for the AT protocol engine.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::commands::CommandKind;

/// Errors that can occur when framing, dispatching or exchanging AT commands.
#[derive(Debug, Error)]
pub enum AtError {
    // ------------------------------------------------------------------
    // Argument errors
    // ------------------------------------------------------------------
    /// An input was empty or outside the range a command accepts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // ------------------------------------------------------------------
    // Protocol-shape errors
    // ------------------------------------------------------------------
    /// The response did not match the grammar expected for the command.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    // ------------------------------------------------------------------
    // Capacity errors
    // ------------------------------------------------------------------
    /// Formatted command or accumulated response would exceed its buffer.
    #[error("buffer overflow: capacity {capacity} bytes, needed {needed}")]
    InvalidSize {
        /// Capacity of the bounded buffer.
        capacity: usize,
        /// Number of bytes the operation needed.
        needed: usize,
    },

    // ------------------------------------------------------------------
    // Descriptor errors
    // ------------------------------------------------------------------
    /// The command descriptor is internally inconsistent.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The command has no parser/formatter for the requested operation.
    #[error("AT+{command} does not support the {kind} operation")]
    NotSupported {
        /// Command mnemonic.
        command: &'static str,
        /// Requested operation kind.
        kind: CommandKind,
    },

    // ------------------------------------------------------------------
    // Outcome errors
    // ------------------------------------------------------------------
    /// The modem answered with `ERROR` or `+CME ERROR`.
    #[error("command failed: {0}")]
    CommandFailed(ModemError),

    // ------------------------------------------------------------------
    // Liveness errors
    // ------------------------------------------------------------------
    /// The response did not terminate before the operation deadline.
    #[error("timeout after {waited:?} ({received} bytes received)")]
    Timeout {
        /// How long the accumulation loop waited.
        waited: Duration,
        /// Bytes accumulated before the deadline.
        received: usize,
    },

    // ------------------------------------------------------------------
    // Collaborator errors
    // ------------------------------------------------------------------
    /// The transport failed to read or write.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

/// Result type for AT engine operations.
pub type AtResult<T> = Result<T, AtError>;

/// Coarse error classification used by callers deciding on retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input; retrying the same call cannot succeed.
    Argument,
    /// Response did not match the expected grammar.
    ProtocolShape,
    /// A bounded buffer was too small.
    Capacity,
    /// Command table misconfiguration.
    Descriptor,
    /// The modem reported failure.
    Outcome,
    /// No complete response within the deadline.
    Liveness,
    /// The transport itself failed.
    Transport,
}

impl AtError {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AtError::InvalidArgument(_) => ErrorCategory::Argument,
            AtError::InvalidResponse(_) => ErrorCategory::ProtocolShape,
            AtError::InvalidSize { .. } => ErrorCategory::Capacity,
            AtError::InvalidState(_) | AtError::NotSupported { .. } => ErrorCategory::Descriptor,
            AtError::CommandFailed(_) => ErrorCategory::Outcome,
            AtError::Timeout { .. } => ErrorCategory::Liveness,
            AtError::Transport(_) => ErrorCategory::Transport,
        }
    }

    /// Shorthand for an [`AtError::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        AtError::InvalidArgument(msg.into())
    }

    /// Shorthand for an [`AtError::InvalidResponse`].
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        AtError::InvalidResponse(msg.into())
    }

    /// Get the modem failure, if this is a [`AtError::CommandFailed`].
    pub fn modem_error(&self) -> Option<&ModemError> {
        match self {
            AtError::CommandFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// Failure reported by the modem as the final result code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModemError {
    /// Bare `ERROR`.
    Error,
    /// `+CME ERROR: <code>` (numeric reporting, `AT+CMEE=1`).
    Cme(u16),
    /// `+CME ERROR: <text>` (verbose reporting, `AT+CMEE=2`).
    CmeVerbose(String),
}

impl fmt::Display for ModemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModemError::Error => write!(f, "ERROR"),
            ModemError::Cme(code) => write!(f, "+CME ERROR: {}", code),
            ModemError::CmeVerbose(text) => write!(f, "+CME ERROR: {}", text),
        }
    }
}

impl ModemError {
    /// Get the numeric CME code, if one was reported.
    pub fn cme_code(&self) -> Option<u16> {
        match self {
            ModemError::Cme(code) => Some(*code),
            _ => None,
        }
    }
}
