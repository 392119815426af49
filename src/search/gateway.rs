//! Dispatch of built requests to the engine
//!
//! The gateway resolves the configuration name to its applied index,
//! translates the request into the engine's call shape and returns the
//! engine's response unmodified.

use crate::engine::{EngineQuery, SearchEngine};
use crate::metrics::{SEARCH_DURATION_SECONDS, SEARCH_REQUESTS_TOTAL};
use crate::search::error::{SearchError, SearchResult};
use crate::search::facets::FacetClause;
use crate::search::registry::ConfigurationRegistry;
use crate::search::request::SearchRequest;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct SearchGateway {
    engine: Arc<dyn SearchEngine>,
    registry: Arc<ConfigurationRegistry>,
}

impl SearchGateway {
    pub fn new(engine: Arc<dyn SearchEngine>, registry: Arc<ConfigurationRegistry>) -> Self {
        Self { engine, registry }
    }

    /// Engine filter expression for one clause: `field = "value"`
    pub fn filter_expression(clause: &FacetClause) -> String {
        let escaped = clause.value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("{} = \"{}\"", clause.field, escaped)
    }

    pub fn translate(request: &SearchRequest) -> EngineQuery {
        EngineQuery {
            q: request.query_text.clone(),
            offset: request.offset,
            limit: request.limit,
            filter: request.filters.iter().map(Self::filter_expression).collect(),
            sort: request
                .sort
                .iter()
                .flatten()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Run `request` against the index applied for `config_name`
    pub async fn execute(&self, config_name: &str, request: &SearchRequest) -> SearchResult<Value> {
        let result = self.dispatch(config_name, request).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        SEARCH_REQUESTS_TOTAL
            .with_label_values(&[config_name, outcome])
            .inc();

        if let Err(e) = &result {
            tracing::warn!(config = config_name, error = %e, "Search failed");
        }

        result
    }

    async fn dispatch(&self, config_name: &str, request: &SearchRequest) -> SearchResult<Value> {
        let index_uid = self.registry.applied_index(config_name).ok_or_else(|| {
            SearchError::IndexNotFound(format!(
                "configuration `{}` has no applied index",
                config_name
            ))
        })?;

        let query = Self::translate(request);
        tracing::debug!(
            config = config_name,
            index_uid = %index_uid,
            q = %query.q,
            offset = query.offset,
            limit = query.limit,
            filters = query.filter.len(),
            "Dispatching search"
        );

        let timer = SEARCH_DURATION_SECONDS
            .with_label_values(&[config_name])
            .start_timer();
        let result = self.engine.search(&index_uid, &query).await;
        timer.observe_duration();

        result
    }
}
