//! In-memory control plane

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::SandboxControlPlane;
use crate::types::{ControlPlaneError, Sandbox, SandboxStatus};

/// Scripted control plane for testing
///
/// Listings are served from a queue; once the queue is drained the last
/// listing repeats. Every call is counted so tests can assert on exactly
/// which remote operations a run performed.
pub struct MockControlPlane {
    listings: Mutex<VecDeque<Result<Vec<Sandbox>, String>>>,
    last_listing: Mutex<Vec<Sandbox>>,
    create_failure: Option<String>,
    run_result: Mutex<Result<Option<String>, String>>,
    submitted: Mutex<Vec<(String, String, String)>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    run_calls: AtomicUsize,
}

impl MockControlPlane {
    /// A control plane whose listing never changes
    pub fn with_sandboxes(sandboxes: Vec<Sandbox>) -> Self {
        Self::with_listings(vec![sandboxes])
    }

    /// A control plane that answers successive listings in order
    pub fn with_listings(listings: Vec<Vec<Sandbox>>) -> Self {
        Self {
            listings: Mutex::new(listings.into_iter().map(Ok).collect()),
            last_listing: Mutex::new(Vec::new()),
            create_failure: None,
            run_result: Mutex::new(Ok(None)),
            submitted: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            run_calls: AtomicUsize::new(0),
        }
    }

    /// Queue another listing after the ones already scripted.
    pub fn push_listing(self, sandboxes: Vec<Sandbox>) -> Self {
        self.listings.lock().push_back(Ok(sandboxes));
        self
    }

    /// Queue a failing listing after the ones already scripted.
    pub fn push_list_failure(self, message: &str) -> Self {
        self.listings.lock().push_back(Err(message.to_string()));
        self
    }

    /// Make every creation request fail.
    pub fn failing_create(mut self, message: &str) -> Self {
        self.create_failure = Some(message.to_string());
        self
    }

    /// Answer `run_code` with this raw result payload.
    pub fn with_run_result(self, result: Option<String>) -> Self {
        *self.run_result.lock() = Ok(result);
        self
    }

    /// Make `run_code` fail at the transport level.
    pub fn failing_run(self, message: &str) -> Self {
        *self.run_result.lock() = Err(message.to_string());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn run_calls(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }

    /// `(sandbox_id, function_id, data)` of every `run_code` call
    pub fn submitted(&self) -> Vec<(String, String, String)> {
        self.submitted.lock().clone()
    }
}

/// Convenience constructor for scripted listings
pub fn sandbox(id: &str, status: SandboxStatus, function_id: &str) -> Sandbox {
    Sandbox {
        id: id.to_string(),
        status,
        function_id: function_id.to_string(),
    }
}

fn mock_error(action: &str, message: &str) -> ControlPlaneError {
    ControlPlaneError::Api {
        action: action.to_string(),
        code: "MockFailure".to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl SandboxControlPlane for MockControlPlane {
    async fn list_sandboxes(&self, _function_id: &str) -> Result<Vec<Sandbox>, ControlPlaneError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let next = self.listings.lock().pop_front();
        match next {
            Some(Ok(sandboxes)) => {
                *self.last_listing.lock() = sandboxes.clone();
                Ok(sandboxes)
            }
            Some(Err(message)) => Err(mock_error("ListSandboxes", &message)),
            None => Ok(self.last_listing.lock().clone()),
        }
    }

    async fn create_sandbox(&self, function_id: &str) -> Result<String, ControlPlaneError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst);
        match &self.create_failure {
            Some(message) => Err(mock_error("CreateSandbox", message)),
            None => Ok(format!("{}-sandbox-{}", function_id, n + 1)),
        }
    }

    async fn run_code(
        &self,
        sandbox_id: &str,
        function_id: &str,
        data: &str,
    ) -> Result<Option<String>, ControlPlaneError> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().push((
            sandbox_id.to_string(),
            function_id.to_string(),
            data.to_string(),
        ));

        self.run_result
            .lock()
            .clone()
            .map_err(|message| mock_error("RunCode", &message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listings_repeat_last_entry() {
        let mock = MockControlPlane::with_listings(vec![
            vec![],
            vec![sandbox("sb-1", SandboxStatus::Ready, "fn")],
        ]);

        assert!(mock.list_sandboxes("fn").await.unwrap().is_empty());
        assert_eq!(mock.list_sandboxes("fn").await.unwrap().len(), 1);
        assert_eq!(mock.list_sandboxes("fn").await.unwrap().len(), 1);
        assert_eq!(mock.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_scripted_list_failure() {
        let mock = MockControlPlane::with_listings(vec![vec![]]).push_list_failure("boom");
        assert!(mock.list_sandboxes("fn").await.is_ok());
        assert!(mock.list_sandboxes("fn").await.is_err());
        // Falls back to the last successful listing
        assert!(mock.list_sandboxes("fn").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_code_records_submission() {
        let mock = MockControlPlane::with_sandboxes(vec![])
            .with_run_result(Some("{}".to_string()));
        let result = mock.run_code("sb-1", "fn", "payload").await.unwrap();
        assert_eq!(result.as_deref(), Some("{}"));
        assert_eq!(
            mock.submitted(),
            vec![("sb-1".to_string(), "fn".to_string(), "payload".to_string())]
        );
    }
}
