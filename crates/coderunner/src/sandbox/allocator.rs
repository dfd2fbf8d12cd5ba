//! Sandbox acquisition
//!
//! Finds a ready sandbox for the function identity, provisioning one when the
//! function has none, and waits for readiness within a fixed deadline. The
//! wait is a single loop on the calling task; it holds nothing past return.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SandboxControlPlane;
use crate::config::RunnerConfig;
use crate::types::{CodeRunnerError, Sandbox};

/// Acquires one ready sandbox per call
pub struct SandboxAllocator {
    control_plane: Arc<dyn SandboxControlPlane>,
    function_id: String,
    poll_interval: Duration,
    ready_timeout: Duration,
}

impl SandboxAllocator {
    pub fn new(
        control_plane: Arc<dyn SandboxControlPlane>,
        function_id: impl Into<String>,
        poll_interval: Duration,
        ready_timeout: Duration,
    ) -> Self {
        Self {
            control_plane,
            function_id: function_id.into(),
            poll_interval,
            ready_timeout,
        }
    }

    pub fn from_config(control_plane: Arc<dyn SandboxControlPlane>, config: &RunnerConfig) -> Self {
        Self::new(
            control_plane,
            config.function_id.clone(),
            config.poll_interval,
            config.ready_timeout,
        )
    }

    pub fn function_id(&self) -> &str {
        &self.function_id
    }

    /// Return the id of a ready sandbox.
    ///
    /// The first ready sandbox in listing order wins. When the function has no
    /// sandbox at all, exactly one creation request is issued before polling.
    /// Concurrent callers may each observe an empty listing and each create a
    /// sandbox; creation is not deduplicated.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<String, CodeRunnerError> {
        let deadline = Instant::now() + self.ready_timeout;

        let sandboxes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CodeRunnerError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => return Err(self.deadline_exceeded()),
            listed = self.control_plane.list_sandboxes(&self.function_id) => {
                listed.map_err(|source| CodeRunnerError::ListError {
                    function_id: self.function_id.clone(),
                    source,
                })?
            }
        };

        if let Some(id) = first_ready(&sandboxes) {
            info!(function_id = %self.function_id, sandbox_id = %id, "Using ready sandbox");
            return Ok(id);
        }

        if sandboxes.is_empty() {
            let created = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CodeRunnerError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => return Err(self.deadline_exceeded()),
                created = self.control_plane.create_sandbox(&self.function_id) => {
                    created.map_err(|source| CodeRunnerError::CreateError {
                        function_id: self.function_id.clone(),
                        source,
                    })?
                }
            };
            info!(function_id = %self.function_id, sandbox_id = %created, "Requested new sandbox");
        } else {
            debug!(
                function_id = %self.function_id,
                count = sandboxes.len(),
                "No ready sandbox yet, waiting for an existing one"
            );
        }

        self.wait_until_ready(deadline, cancel).await
    }

    async fn wait_until_ready(
        &self,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<String, CodeRunnerError> {
        let poll = async {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            let mut attempt: u32 = 0;
            loop {
                ticker.tick().await;
                attempt += 1;

                match self.control_plane.list_sandboxes(&self.function_id).await {
                    Ok(sandboxes) => {
                        if let Some(id) = first_ready(&sandboxes) {
                            info!(
                                function_id = %self.function_id,
                                sandbox_id = %id,
                                attempt,
                                "Sandbox became ready"
                            );
                            return id;
                        }
                        debug!(function_id = %self.function_id, attempt, "Sandbox not ready yet");
                    }
                    Err(e) => {
                        warn!(
                            function_id = %self.function_id,
                            attempt,
                            error = %e,
                            "Listing sandboxes failed while waiting for readiness"
                        );
                    }
                }
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CodeRunnerError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => Err(self.deadline_exceeded()),
            id = poll => Ok(id),
        }
    }

    fn deadline_exceeded(&self) -> CodeRunnerError {
        warn!(function_id = %self.function_id, waited = ?self.ready_timeout, "No ready sandbox before deadline");
        CodeRunnerError::Timeout {
            function_id: self.function_id.clone(),
            waited: self.ready_timeout,
        }
    }
}

fn first_ready(sandboxes: &[Sandbox]) -> Option<String> {
    sandboxes.iter().find(|s| s.is_ready()).map(|s| s.id.clone())
}
