//! Error types for the WinRM client.

use thiserror::Error;

use super::soap::WinRmOperation;

/// Result type for WinRM operations.
pub type WinRmResult<T> = Result<T, WinRmError>;

/// Errors raised by the WinRM remote shell client.
#[derive(Error, Debug)]
pub enum WinRmError {
    /// A protocol step failed: transport fault, unparsable response, missing
    /// element or undecodable stream data.
    #[error("WinRM {operation} failed: {message}")]
    Protocol {
        /// The step that failed
        operation: WinRmOperation,
        /// What went wrong
        message: String,
    },

    /// An operation was invoked before the session reached the state it needs.
    #[error("WinRM {operation} requires {requirement}")]
    Precondition {
        /// The operation that was invoked
        operation: WinRmOperation,
        /// The missing prerequisite
        requirement: &'static str,
    },

    /// Raised by HTTP connectors; sessions report it as a protocol error.
    #[error("WinRM transport error: {0}")]
    Transport(String),

    /// Invalid endpoint address or client settings.
    #[error("Invalid WinRM configuration: {0}")]
    InvalidConfig(String),

    /// Writing received output to a sink failed.
    #[error("Failed to write command output: {0}")]
    Output(#[from] std::io::Error),
}

impl WinRmError {
    /// Shorthand for a protocol error.
    pub fn protocol(operation: WinRmOperation, message: impl Into<String>) -> Self {
        Self::Protocol {
            operation,
            message: message.into(),
        }
    }

    /// The protocol step this error relates to, if any.
    pub fn operation(&self) -> Option<WinRmOperation> {
        match self {
            Self::Protocol { operation, .. } | Self::Precondition { operation, .. } => {
                Some(*operation)
            }
            _ => None,
        }
    }
}
