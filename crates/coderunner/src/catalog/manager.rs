//! Read-only model manager over a fixed catalogue

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{CatalogError, Model, ModelStatus, Protocol};

const DEFAULT_PAGE_LIMIT: usize = 100;
const HOSTED_BASE_URL_MARKER: &str = "volces";

/// Filter and page selection for [`StaticModelManager::list_models`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListModelRequest {
    /// Substring the model name must contain
    pub fuzzy_model_name: Option<String>,
    /// Accepted statuses; empty accepts all
    #[serde(default)]
    pub status: Vec<ModelStatus>,
    /// Page size; 0 means 100
    #[serde(default)]
    pub limit: usize,
    /// Opaque cursor from a previous response
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListModelResponse {
    pub models: Vec<Model>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Deployed endpoints for hosted models
#[derive(Debug, Clone, Default)]
pub struct EndpointBinding {
    /// Model name to endpoint id
    pub endpoints: HashMap<String, String>,
    /// API key shared by the bound endpoints
    pub api_key: String,
}

/// Catalogue of models held in memory, in load order
#[derive(Debug, Clone)]
pub struct StaticModelManager {
    models: Vec<Model>,
    by_id: HashMap<i64, usize>,
}

impl StaticModelManager {
    pub fn new(models: Vec<Model>) -> Self {
        let by_id = models
            .iter()
            .enumerate()
            .map(|(idx, m)| (m.id, idx))
            .collect();
        Self { models, by_id }
    }

    /// Keep only hosted `ark` models that have a deployed endpoint, pointing
    /// each at its endpoint.
    pub fn with_endpoint_binding(models: Vec<Model>, binding: &EndpointBinding) -> Self {
        let total = models.len();
        let bound: Vec<Model> = models
            .into_iter()
            .filter_map(|mut m| {
                let endpoint = binding.endpoints.get(&m.name)?;
                if m.meta.protocol != Protocol::Ark
                    || !m.meta.conn_config.base_url.contains(HOSTED_BASE_URL_MARKER)
                {
                    return None;
                }
                tracing::debug!(name = %m.name, endpoint = %endpoint, "Binding model to endpoint");
                m.meta.conn_config.model = endpoint.clone();
                m.meta.conn_config.api_key = binding.api_key.clone();
                m.meta.status = ModelStatus::InUse;
                Some(m)
            })
            .collect();

        tracing::info!(total, bound = bound.len(), "Bound models to deployed endpoints");
        Self::new(bound)
    }

    /// One page of models matching the request, in catalogue order.
    pub fn list_models(&self, req: &ListModelRequest) -> Result<ListModelResponse, CatalogError> {
        let start = match &req.cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| CatalogError::InvalidCursor {
                    cursor: cursor.clone(),
                })?,
            None => 0,
        };
        let limit = if req.limit == 0 {
            DEFAULT_PAGE_LIMIT
        } else {
            req.limit
        };
        let statuses: HashSet<ModelStatus> = req.status.iter().copied().collect();

        let mut page = Vec::new();
        let mut idx = start;
        while idx < self.models.len() && page.len() < limit {
            let m = &self.models[idx];
            idx += 1;

            if let Some(fuzzy) = &req.fuzzy_model_name {
                if !m.name.contains(fuzzy.as_str()) {
                    continue;
                }
            }
            if !statuses.is_empty() && !statuses.contains(&m.meta.status) {
                continue;
            }
            page.push(m.clone());
        }

        let has_more = idx < self.models.len();
        Ok(ListModelResponse {
            models: page,
            has_more,
            next_cursor: has_more.then(|| idx.to_string()),
        })
    }

    pub fn list_in_use_models(
        &self,
        limit: usize,
        cursor: Option<String>,
    ) -> Result<ListModelResponse, CatalogError> {
        self.list_models(&ListModelRequest {
            fuzzy_model_name: None,
            status: vec![ModelStatus::InUse],
            limit,
            cursor,
        })
    }

    /// Models for `ids` in request order; unknown ids are skipped.
    pub fn get_models_by_ids(&self, ids: &[i64]) -> Vec<&Model> {
        ids.iter()
            .filter_map(|id| self.by_id.get(id).map(|&idx| &self.models[idx]))
            .collect()
    }

    pub fn get_model(&self, id: i64) -> Option<&Model> {
        self.by_id.get(&id).map(|&idx| &self.models[idx])
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
