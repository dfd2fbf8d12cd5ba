//! Submission of rendered harness scripts

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::SandboxControlPlane;
use crate::types::{CodeRunnerError, Language};

/// Body of a run request as the sandbox executor expects it
#[derive(Debug, Serialize)]
struct RunCodeData<'a> {
    code: &'a str,
    language: &'a str,
}

/// Sends scripts to an acquired sandbox
pub struct ExecutionSubmitter {
    control_plane: Arc<dyn SandboxControlPlane>,
    function_id: String,
}

impl ExecutionSubmitter {
    pub fn new(control_plane: Arc<dyn SandboxControlPlane>, function_id: impl Into<String>) -> Self {
        Self {
            control_plane,
            function_id: function_id.into(),
        }
    }

    /// Submit `script` to `sandbox_id` and return the raw result payload.
    pub async fn submit(
        &self,
        sandbox_id: &str,
        script: &str,
        language: Language,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, CodeRunnerError> {
        let data = serde_json::to_string(&RunCodeData {
            code: script,
            language: language.as_str(),
        })
        .map_err(|e| CodeRunnerError::TransportError { source: e.into() })?;

        tracing::debug!(
            sandbox_id,
            function_id = %self.function_id,
            language = %language,
            payload_bytes = data.len(),
            "Submitting code to sandbox"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CodeRunnerError::Cancelled),
            out = self.control_plane.run_code(sandbox_id, &self.function_id, &data) => {
                out.map_err(|source| CodeRunnerError::TransportError { source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::mock::MockControlPlane;
    use serde_json::Value;

    #[tokio::test]
    async fn test_body_carries_script_and_lowercase_language() {
        let mock = Arc::new(
            MockControlPlane::with_sandboxes(vec![]).with_run_result(Some("{}".to_string())),
        );
        let submitter = ExecutionSubmitter::new(mock.clone(), "fn-1");

        let out = submitter
            .submit("sb-1", "print('hi')\n", Language::Python, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.as_deref(), Some("{}"));

        let submitted = mock.submitted();
        assert_eq!(submitted.len(), 1);
        let (sandbox_id, function_id, data) = &submitted[0];
        assert_eq!(sandbox_id, "sb-1");
        assert_eq!(function_id, "fn-1");

        let body: Value = serde_json::from_str(data).unwrap();
        assert_eq!(body["code"], "print('hi')\n");
        assert_eq!(body["language"], "python");
    }

    #[tokio::test]
    async fn test_remote_failure_is_a_transport_error() {
        let mock = Arc::new(MockControlPlane::with_sandboxes(vec![]).failing_run("sandbox not ready"));
        let submitter = ExecutionSubmitter::new(mock, "fn-1");

        let err = submitter
            .submit("sb-1", "", Language::Python, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CodeRunnerError::TransportError { .. }));
        assert!(err.to_string().contains("sandbox not ready"));
    }
}
