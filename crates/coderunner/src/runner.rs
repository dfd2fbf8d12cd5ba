//! The code runner pipeline
//!
//! A run is strictly sequential: acquire a ready sandbox, wrap the snippet in
//! the harness, submit it, decode the envelope. Any stage failing ends the
//! run with that stage's error. Nothing is retried.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::RunnerConfig;
use crate::envelope::ResultDecoder;
use crate::harness::HarnessBuilder;
use crate::sandbox::{ExecutionSubmitter, SandboxAllocator, SandboxControlPlane, VefaasControlPlane};
use crate::types::{CodeRunnerError, RunRequest, RunResponse};

/// Runs snippets and returns the mapping their `main(args)` produced
#[async_trait]
pub trait CodeRunner: Send + Sync {
    /// Run `request` to completion or until `cancel` fires.
    async fn run(
        &self,
        request: RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunResponse, CodeRunnerError>;
}

/// [`CodeRunner`] backed by remote function-service sandboxes
///
/// Holds no per-run state; one instance can serve concurrent runs.
pub struct SandboxCodeRunner {
    allocator: SandboxAllocator,
    harness: HarnessBuilder,
    submitter: ExecutionSubmitter,
    decoder: ResultDecoder,
}

impl SandboxCodeRunner {
    /// Build a runner over an existing control plane.
    pub fn new(control_plane: Arc<dyn SandboxControlPlane>, config: &RunnerConfig) -> Self {
        Self {
            allocator: SandboxAllocator::from_config(control_plane.clone(), config),
            harness: HarnessBuilder::new(),
            submitter: ExecutionSubmitter::new(control_plane, config.function_id.clone()),
            decoder: ResultDecoder::new(),
        }
    }

    /// Build a runner talking to the signed HTTP control plane.
    pub fn from_config(config: RunnerConfig) -> Result<Self, CodeRunnerError> {
        config
            .validate()
            .map_err(|e| CodeRunnerError::SessionError {
                reason: e.to_string(),
            })?;
        let control_plane = Arc::new(VefaasControlPlane::new(&config)?);
        Ok(Self::new(control_plane, &config))
    }

    pub fn function_id(&self) -> &str {
        self.allocator.function_id()
    }
}

#[async_trait]
impl CodeRunner for SandboxCodeRunner {
    async fn run(
        &self,
        request: RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunResponse, CodeRunnerError> {
        let started = Instant::now();
        let function_id = self.allocator.function_id();

        let sandbox_id = self.allocator.acquire(cancel).await?;
        let script = self
            .harness
            .build(request.language, &request.code, &request.params)?;
        let raw = self
            .submitter
            .submit(&sandbox_id, &script, request.language, cancel)
            .await?;

        match self.decoder.decode(raw.as_deref()) {
            Ok(result) => {
                tracing::info!(
                    function_id,
                    sandbox_id = %sandbox_id,
                    keys = result.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Code run completed"
                );
                Ok(RunResponse { result })
            }
            Err(e) => {
                if e.is_user_error() {
                    tracing::info!(function_id, sandbox_id = %sandbox_id, error = %e, "Snippet raised");
                } else {
                    tracing::warn!(function_id, sandbox_id = %sandbox_id, error = %e, "Failed to decode run result");
                }
                Err(e)
            }
        }
    }
}
