//! Error types for the code runner pipeline

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by [`crate::CodeRunner::run`].
///
/// Every stage of the pipeline fails with its own variant so callers can tell
/// a failing snippet ([`CodeRunnerError::ExecutionError`]) apart from a
/// failing infrastructure (session, allocation, transport).
#[derive(Error, Debug)]
pub enum CodeRunnerError {
    #[error("Session error: {reason}")]
    SessionError { reason: String },

    #[error("Failed to list sandboxes for function '{function_id}': {source}")]
    ListError {
        function_id: String,
        #[source]
        source: ControlPlaneError,
    },

    #[error("Failed to create sandbox for function '{function_id}': {source}")]
    CreateError {
        function_id: String,
        #[source]
        source: ControlPlaneError,
    },

    #[error("No ready sandbox for function '{function_id}' after {waited:?}")]
    Timeout {
        function_id: String,
        waited: Duration,
    },

    #[error("Run cancelled by caller")]
    Cancelled,

    #[error("Transport error: {source}")]
    TransportError {
        #[source]
        source: ControlPlaneError,
    },

    #[error("Remote execution returned no result")]
    MissingResult,

    #[error("Code execution failed: {stderr}")]
    ExecutionError { stderr: String },

    #[error("Failed to decode {stage}: {reason}")]
    DecodeError { stage: DecodeStage, reason: String },

    #[error("Harness error: {reason}")]
    HarnessError { reason: String },
}

impl CodeRunnerError {
    /// True when the snippet itself failed, as opposed to the machinery around it.
    pub fn is_user_error(&self) -> bool {
        matches!(self, CodeRunnerError::ExecutionError { .. })
    }

    /// True for failures of the session, sandbox allocation, or transport.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            CodeRunnerError::SessionError { .. }
                | CodeRunnerError::ListError { .. }
                | CodeRunnerError::CreateError { .. }
                | CodeRunnerError::Timeout { .. }
                | CodeRunnerError::TransportError { .. }
        )
    }
}

/// Which layer of the result envelope failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// The outer envelope returned by the control plane
    Envelope,
    /// The snippet's standard output
    Stdout,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeStage::Envelope => write!(f, "result envelope"),
            DecodeStage::Stdout => write!(f, "run stdout"),
        }
    }
}

/// Failures talking to the remote sandbox control plane
#[derive(Error, Debug)]
pub enum ControlPlaneError {
    #[error("HTTP error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    #[error("{action} returned HTTP {status}: {body}")]
    Status {
        action: String,
        status: u16,
        body: String,
    },

    #[error("{action} failed with {code}: {message}")]
    Api {
        action: String,
        code: String,
        message: String,
    },

    #[error("Malformed {action} response: {reason}")]
    MalformedResponse { action: String, reason: String },

    #[error("JSON serialization error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("Request signing failed: {reason}")]
    Signing { reason: String },
}
