//! Signed HTTP client for the function-service sandbox API

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::signer::{canonical_query, RequestSigner, CONTENT_TYPE};
use super::SandboxControlPlane;
use crate::config::RunnerConfig;
use crate::types::{CodeRunnerError, ControlPlaneError, Sandbox, SandboxStatus};

const ACTION_LIST: &str = "ListSandboxes";
const ACTION_CREATE: &str = "CreateSandbox";
const ACTION_RUN: &str = "RunCode";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiResponse<T> {
    #[serde(default)]
    response_metadata: ResponseMetadata,
    result: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseMetadata {
    #[serde(default)]
    request_id: String,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct FunctionRequest<'a> {
    function_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSandboxRequest<'a> {
    function_id: &'a str,
    metadata: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RunCodeRequest<'a> {
    sandbox_id: &'a str,
    function_id: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListSandboxesResult {
    #[serde(default)]
    sandboxes: Vec<RemoteSandbox>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RemoteSandbox {
    id: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSandboxResult {
    sandbox_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RunCodeResult {
    result: Option<String>,
}

/// Control plane reached over signed OpenAPI-style HTTP calls
///
/// Every action is a `POST /?Action=..&Version=..` with a JSON body. The
/// client is built once and shared by all runs.
pub struct VefaasControlPlane {
    client: Client,
    endpoint: String,
    host: String,
    api_version: String,
    signer: RequestSigner,
}

impl VefaasControlPlane {
    /// Build the client session from configuration.
    pub fn new(config: &RunnerConfig) -> Result<Self, CodeRunnerError> {
        let url = Url::parse(&config.endpoint).map_err(|e| CodeRunnerError::SessionError {
            reason: format!("invalid endpoint '{}': {}", config.endpoint, e),
        })?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(CodeRunnerError::SessionError {
                    reason: format!("endpoint '{}' has no host", config.endpoint),
                })
            }
        };

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CodeRunnerError::SessionError {
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        tracing::debug!(
            endpoint = %config.endpoint,
            region = %config.region,
            service = %config.service,
            "Created sandbox control plane client"
        );

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            host,
            api_version: config.api_version.clone(),
            signer: RequestSigner::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                config.region.clone(),
                config.service.clone(),
            ),
        })
    }

    async fn call<B, T>(&self, action: &str, body: &B) -> Result<T, ControlPlaneError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;
        let query = [("Action", action), ("Version", self.api_version.as_str())];
        let signed = self
            .signer
            .sign("POST", &self.host, &query, &payload, Utc::now())?;
        let url = format!("{}/?{}", self.endpoint, canonical_query(&query));

        let response = self
            .client
            .post(&url)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Date", signed.x_date.as_str())
            .header("X-Content-Sha256", signed.x_content_sha256.as_str())
            .header("Authorization", signed.authorization.as_str())
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        let parsed: Result<ApiResponse<T>, _> = serde_json::from_str(&text);
        if let Ok(ApiResponse {
            response_metadata:
                ResponseMetadata {
                    error: Some(error),
                    request_id,
                },
            ..
        }) = &parsed
        {
            tracing::warn!(action, request_id = %request_id, code = %error.code, "Control plane rejected request");
            return Err(ControlPlaneError::Api {
                action: action.to_string(),
                code: error.code.clone(),
                message: error.message.clone(),
            });
        }

        if !status.is_success() {
            return Err(ControlPlaneError::Status {
                action: action.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed = parsed.map_err(|e| ControlPlaneError::MalformedResponse {
            action: action.to_string(),
            reason: e.to_string(),
        })?;
        parsed
            .result
            .ok_or_else(|| ControlPlaneError::MalformedResponse {
                action: action.to_string(),
                reason: "missing Result".to_string(),
            })
    }
}

#[async_trait]
impl SandboxControlPlane for VefaasControlPlane {
    async fn list_sandboxes(&self, function_id: &str) -> Result<Vec<Sandbox>, ControlPlaneError> {
        let result: ListSandboxesResult = self
            .call(ACTION_LIST, &FunctionRequest { function_id })
            .await?;

        Ok(result
            .sandboxes
            .into_iter()
            .map(|s| Sandbox {
                id: s.id,
                status: SandboxStatus::from_remote(s.status.as_deref()),
                function_id: function_id.to_string(),
            })
            .collect())
    }

    async fn create_sandbox(&self, function_id: &str) -> Result<String, ControlPlaneError> {
        let result: CreateSandboxResult = self
            .call(
                ACTION_CREATE,
                &CreateSandboxRequest {
                    function_id,
                    metadata: Map::new(),
                },
            )
            .await?;
        Ok(result.sandbox_id)
    }

    async fn run_code(
        &self,
        sandbox_id: &str,
        function_id: &str,
        data: &str,
    ) -> Result<Option<String>, ControlPlaneError> {
        let result: RunCodeResult = self
            .call(
                ACTION_RUN,
                &RunCodeRequest {
                    sandbox_id,
                    function_id,
                    data,
                },
            )
            .await?;
        Ok(result.result)
    }
}
