//! Core types for running snippets in remote sandboxes

pub mod error;

pub use error::{CodeRunnerError, ControlPlaneError, DecodeStage};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Language of a submitted snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
}

impl Language {
    /// Lowercase wire name expected by the control plane
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snippet to run plus the parameters handed to its `main(args)` entrypoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub code: String,
    pub language: Language,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl RunRequest {
    pub fn python(code: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            code: code.into(),
            language: Language::Python,
            params,
        }
    }
}

/// Mapping returned by the snippet's `main(args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    pub result: Map<String, Value>,
}

/// Readiness of a remote sandbox as reported by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SandboxStatus {
    Provisioning,
    Ready,
    Unknown,
}

impl SandboxStatus {
    /// Map a remote status string. Absent or unrecognised values are `Unknown`.
    pub fn from_remote(status: Option<&str>) -> Self {
        match status {
            Some("Ready") => SandboxStatus::Ready,
            Some("Pending" | "Creating" | "Starting" | "Provisioning") => {
                SandboxStatus::Provisioning
            }
            _ => SandboxStatus::Unknown,
        }
    }
}

/// A remote execution unit bound to one function identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sandbox {
    pub id: String,
    pub status: SandboxStatus,
    pub function_id: String,
}

impl Sandbox {
    pub fn is_ready(&self) -> bool {
        self.status == SandboxStatus::Ready
    }
}
