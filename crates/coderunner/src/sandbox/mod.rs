//! Remote sandbox access
//!
//! The runner reaches the remote control plane only through
//! [`SandboxControlPlane`]. [`VefaasControlPlane`] is the signed HTTP
//! implementation; [`MockControlPlane`] is an in-memory one for tests and
//! local development.

pub mod allocator;
pub mod mock;
pub mod signer;
pub mod submitter;
pub mod vefaas;

use async_trait::async_trait;

use crate::types::{ControlPlaneError, Sandbox};

pub use allocator::SandboxAllocator;
pub use mock::MockControlPlane;
pub use signer::RequestSigner;
pub use submitter::ExecutionSubmitter;
pub use vefaas::VefaasControlPlane;

/// Operations the runner needs from the remote sandbox control plane
#[async_trait]
pub trait SandboxControlPlane: Send + Sync {
    /// List every sandbox bound to `function_id`, in the control plane's order.
    async fn list_sandboxes(&self, function_id: &str) -> Result<Vec<Sandbox>, ControlPlaneError>;

    /// Ask the control plane to provision a sandbox. Returns the new sandbox id.
    async fn create_sandbox(&self, function_id: &str) -> Result<String, ControlPlaneError>;

    /// Run `data` (a serialized `{code, language}` body) in the given sandbox.
    ///
    /// Returns the raw result payload, or `None` when the control plane
    /// answered without one.
    async fn run_code(
        &self,
        sandbox_id: &str,
        function_id: &str,
        data: &str,
    ) -> Result<Option<String>, ControlPlaneError>;
}
