//! Building catalogue entries from files and the environment

use std::collections::HashMap;
use std::path::Path;

use serde::de::DeserializeOwned;

use super::{CatalogError, Model, ModelStatus, Protocol};

pub const ENV_MODEL_PROTOCOL: &str = "MODEL_PROTOCOL";
pub const ENV_MODEL_OPENCOZE_ID: &str = "MODEL_OPENCOZE_ID";
pub const ENV_MODEL_NAME: &str = "MODEL_NAME";
pub const ENV_MODEL_ID: &str = "MODEL_ID";
pub const ENV_MODEL_API_KEY: &str = "MODEL_API_KEY";
pub const ENV_MODEL_BASE_URL: &str = "MODEL_BASE_URL";

const ARK_TEMPLATE_PREFIX: &str = "model_template_ark";
const MAX_ENV_MODELS: i32 = 1000;

/// Read every `.yaml` / `.yml` file in `dir` as a [`Model`], in file name order.
pub fn load_models_from_dir(dir: &Path) -> Result<Vec<Model>, CatalogError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_error(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        let path = entry.path();
        if path.is_file() && is_yaml(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let models = paths
        .iter()
        .map(|p| read_yaml::<Model>(p))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(dir = %dir.display(), count = models.len(), "Loaded model definitions");
    Ok(models)
}

/// Environment lookup treating unset and empty variables alike
pub fn std_env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Assemble models from indexed environment variables over YAML templates.
///
/// Entries are read for the unsuffixed keys first (`MODEL_PROTOCOL`, ...),
/// then `_0`, `_1`, and so on. The unsuffixed entry is optional; scanning
/// stops at the first suffixed index with no protocol, or at the first entry
/// missing a name, model id or API key.
///
/// `templates` maps a model name to the template file suffix. Names without a
/// mapping fall back to the default template and keep their own name.
pub fn load_models_from_env<F>(
    template_dir: &Path,
    templates: &HashMap<String, String>,
    lookup: F,
) -> Result<Vec<Model>, CatalogError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut models = Vec::new();

    for index in -1..MAX_ENV_MODELS {
        let Some(raw_protocol) = lookup(&env_key(ENV_MODEL_PROTOCOL, index)) else {
            if index < 0 {
                continue;
            }
            break;
        };

        let Some(entry) = EnvModelEntry::read(&lookup, index) else {
            break;
        };

        if Protocol::from_name(&raw_protocol) != Protocol::Ark {
            return Err(CatalogError::UnsupportedProtocol {
                protocol: raw_protocol,
            });
        }

        let suffix = templates.get(&entry.model_name);
        if suffix.is_none() {
            tracing::warn!(model = %entry.model_name, "No template for model, using default config");
        }
        let template = template_dir.join(template_file_name(
            ARK_TEMPLATE_PREFIX,
            suffix.map(String::as_str).unwrap_or(""),
        ));
        let mut model: Model = read_yaml(&template)?;

        model.id = entry
            .id
            .parse::<i64>()
            .map_err(|e: std::num::ParseIntError| CatalogError::InvalidValue {
                key: env_key(ENV_MODEL_OPENCOZE_ID, index),
                reason: e.to_string(),
            })?;
        if suffix.is_none() {
            model.name = entry.model_name;
        }
        model.meta.conn_config.model = entry.model_id;
        model.meta.conn_config.api_key = entry.api_key;
        model.meta.conn_config.base_url = entry.base_url;

        tracing::debug!(id = model.id, name = %model.name, "Loaded model from environment");
        models.push(model);
    }

    Ok(models)
}

/// Promote `Default` entries to `InUse` and require an icon on every entry.
pub fn fill_model_content(models: &mut [Model]) -> Result<(), CatalogError> {
    for model in models.iter_mut() {
        if model.meta.status == ModelStatus::Default {
            model.meta.status = ModelStatus::InUse;
        }
        if model.icon_uri.is_empty() && model.icon_url.is_empty() {
            return Err(CatalogError::MissingIcon { id: model.id });
        }
    }
    Ok(())
}

struct EnvModelEntry {
    id: String,
    model_name: String,
    model_id: String,
    api_key: String,
    base_url: String,
}

impl EnvModelEntry {
    fn read<F: Fn(&str) -> Option<String>>(lookup: &F, index: i32) -> Option<Self> {
        let get = |prefix: &str| lookup(&env_key(prefix, index)).unwrap_or_default();
        let entry = Self {
            id: get(ENV_MODEL_OPENCOZE_ID),
            model_name: get(ENV_MODEL_NAME),
            model_id: get(ENV_MODEL_ID),
            api_key: get(ENV_MODEL_API_KEY),
            base_url: get(ENV_MODEL_BASE_URL),
        };
        let valid =
            !entry.model_name.is_empty() && !entry.model_id.is_empty() && !entry.api_key.is_empty();
        valid.then_some(entry)
    }
}

fn env_key(prefix: &str, index: i32) -> String {
    if index < 0 {
        prefix.to_string()
    } else {
        format!("{}_{}", prefix, index)
    }
}

fn template_file_name(prefix: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        format!("{}.yaml", prefix)
    } else {
        format!("{}_{}.yaml", prefix, suffix)
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    serde_yaml::from_str(&content).map_err(|e| CatalogError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn io_error(path: &Path, e: std::io::Error) -> CatalogError {
    CatalogError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
