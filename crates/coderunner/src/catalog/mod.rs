//! Chat model catalogue
//!
//! Static model definitions loaded from YAML files or assembled from
//! environment variables over YAML templates, and a read-only manager that
//! lists and looks them up. The catalogue is immutable once built.
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::path::Path;
//! use symbi_coderunner::catalog::{
//!     fill_model_content, load_models_from_dir, load_models_from_env, std_env_lookup,
//!     StaticModelManager,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut models = load_models_from_dir(Path::new("conf/model"))?;
//! models.extend(load_models_from_env(
//!     Path::new("conf/model/template"),
//!     &HashMap::new(),
//!     std_env_lookup,
//! )?);
//! fill_model_content(&mut models)?;
//!
//! let manager = StaticModelManager::new(models);
//! let page = manager.list_in_use_models(20, None)?;
//! println!("{} models, more: {}", page.models.len(), page.has_more);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod manager;

pub use loader::{fill_model_content, load_models_from_dir, load_models_from_env, std_env_lookup};
pub use manager::{EndpointBinding, ListModelRequest, ListModelResponse, StaticModelManager};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors building or querying the model catalogue
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unsupported model protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing icon URI or icon URL, id={id}")]
    MissingIcon { id: i64 },

    #[error("Invalid cursor: {cursor}")]
    InvalidCursor { cursor: String },
}

/// Wire protocol a model is reached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Ark,
    #[serde(rename = "openai")]
    OpenAi,
    Deepseek,
    Claude,
    Gemini,
    Ollama,
    Qwen,
    #[serde(other)]
    Unknown,
}

impl Protocol {
    /// Parse a protocol name as written in configuration.
    pub fn from_name(name: &str) -> Self {
        match name {
            "ark" => Protocol::Ark,
            "openai" => Protocol::OpenAi,
            "deepseek" => Protocol::Deepseek,
            "claude" => Protocol::Claude,
            "gemini" => Protocol::Gemini,
            "ollama" => Protocol::Ollama,
            "qwen" => Protocol::Qwen,
            _ => Protocol::Unknown,
        }
    }
}

/// Lifecycle status of a model entry
///
/// Stored as an integer; values this crate does not know are kept as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ModelStatus {
    #[default]
    Default,
    InUse,
    Deleted,
    Other(i64),
}

impl From<i64> for ModelStatus {
    fn from(value: i64) -> Self {
        match value {
            0 => ModelStatus::Default,
            1 => ModelStatus::InUse,
            2 => ModelStatus::Deleted,
            other => ModelStatus::Other(other),
        }
    }
}

impl From<ModelStatus> for i64 {
    fn from(status: ModelStatus) -> Self {
        match status {
            ModelStatus::Default => 0,
            ModelStatus::InUse => 1,
            ModelStatus::Deleted => 2,
            ModelStatus::Other(other) => other,
        }
    }
}

/// Localised display text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizedText {
    pub zh: String,
    pub en: String,
}

/// Connection settings for a model
///
/// Only the fields the catalogue rewrites are typed; everything else is
/// carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub protocol: Protocol,
    #[serde(default)]
    pub capability: Map<String, Value>,
    #[serde(default)]
    pub conn_config: ConnConfig,
    #[serde(default)]
    pub status: ModelStatus,
}

/// One catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub icon_uri: String,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default)]
    pub default_parameters: Vec<Value>,
    pub meta: ModelMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL_YAML: &str = r#"
id: 7
name: doubao-seed-1.6
icon_uri: default_icon/doubao_v2.png
description:
  zh: 豆包
  en: Doubao
default_parameters:
  - name: temperature
    type: float
meta:
  protocol: ark
  capability:
    function_call: true
    input_tokens: 224000
  conn_config:
    base_url: https://ark.cn-beijing.volces.com/api/v3/
    api_key: ""
    model: ""
    temperature: 0.1
    ark:
      region: cn-beijing
  status: 0
"#;

    #[test]
    fn test_model_yaml_parses_with_opaque_fields() {
        let model: Model = serde_yaml::from_str(MODEL_YAML).unwrap();
        assert_eq!(model.id, 7);
        assert_eq!(model.meta.protocol, Protocol::Ark);
        assert_eq!(model.meta.status, ModelStatus::Default);
        assert_eq!(model.description.en, "Doubao");
        assert_eq!(model.default_parameters.len(), 1);
        assert_eq!(
            model.meta.conn_config.base_url,
            "https://ark.cn-beijing.volces.com/api/v3/"
        );
        assert!(model.meta.conn_config.extra.contains_key("temperature"));
        assert!(model.meta.conn_config.extra.contains_key("ark"));
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status: ModelStatus = serde_json::from_str("9").unwrap();
        assert_eq!(status, ModelStatus::Other(9));
        assert_eq!(serde_json::to_string(&status).unwrap(), "9");
        assert_eq!(serde_json::to_string(&ModelStatus::InUse).unwrap(), "1");
    }

    #[test]
    fn test_unknown_protocol() {
        let protocol: Protocol = serde_json::from_str("\"somevendor\"").unwrap();
        assert_eq!(protocol, Protocol::Unknown);
        let protocol: Protocol = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(protocol, Protocol::OpenAi);
        assert_eq!(Protocol::from_name("ark"), Protocol::Ark);
        assert_eq!(Protocol::from_name("ARK"), Protocol::Unknown);
    }
}
