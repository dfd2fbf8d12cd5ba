//! Sandboxed Code Runner
//!
//! Runs untrusted Python snippets in remotely provisioned sandboxes. A run
//! acquires a ready sandbox for the configured function identity (creating
//! one when the pool is empty), wraps the snippet in a harness that feeds it
//! JSON parameters and captures its JSON result, submits it, and decodes the
//! result envelope the sandbox sends back.
//!
//! ```rust,no_run
//! use serde_json::{json, Map};
//! use symbi_coderunner::{CodeRunner, RunRequest, RunnerConfig, SandboxCodeRunner};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = SandboxCodeRunner::from_config(RunnerConfig::from_env()?)?;
//!
//! let mut params = Map::new();
//! params.insert("x".to_string(), json!(1));
//! let code = "async def main(args: Args) -> Output:\n    return {\"y\": args.params[\"x\"] + 1}\n";
//!
//! let response = runner
//!     .run(RunRequest::python(code, params), &CancellationToken::new())
//!     .await?;
//! assert_eq!(response.result["y"], json!(2));
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod envelope;
pub mod harness;
pub mod logging;
pub mod runner;
pub mod sandbox;
pub mod types;

pub use config::{ConfigError, LogFormat, LoggingConfig, RunnerConfig};
pub use envelope::{ResultDecoder, ResultEnvelope, StageResult};
pub use harness::HarnessBuilder;
pub use runner::{CodeRunner, SandboxCodeRunner};
pub use sandbox::{MockControlPlane, SandboxControlPlane, VefaasControlPlane};
pub use types::*;
