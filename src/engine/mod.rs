//! The external search engine contract
//!
//! The routing layer only depends on four operations: create-or-get an index,
//! push its settings, add documents, and search. Any engine implementing
//! [`SearchEngine`] is substitutable.
//!
//! - [`MeilisearchEngine`]: HTTP adapter for a Meilisearch-compatible server
//! - [`InMemoryEngine`]: no-ranking engine for local runs and tests

mod meilisearch;
mod memory;

pub use meilisearch::MeilisearchEngine;
pub use memory::InMemoryEngine;

use crate::config::{EngineBackend, EngineConfig};
use crate::search::{IndexSettings, SearchResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Search call in the engine's wire shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineQuery {
    pub q: String,
    pub offset: usize,
    pub limit: usize,

    /// Filter expressions, AND-combined
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<String>,

    /// `field:asc|desc` clauses, highest priority first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<String>,
}

/// Operations the routing layer needs from a search engine
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Short backend identifier for logs and health output
    fn backend_name(&self) -> &'static str;

    /// Ensure the index exists, creating it with `primary_key` if needed
    async fn create_or_get_index(&self, index_uid: &str, primary_key: &str) -> SearchResult<()>;

    /// Replace the index settings with `settings`
    async fn update_settings(&self, index_uid: &str, settings: &IndexSettings) -> SearchResult<()>;

    /// Add or replace documents by primary key
    async fn add_documents(
        &self,
        index_uid: &str,
        primary_key: &str,
        documents: &[Value],
    ) -> SearchResult<()>;

    /// Run a search and return the engine's response body untouched
    async fn search(&self, index_uid: &str, query: &EngineQuery) -> SearchResult<Value>;

    /// Liveness probe
    async fn health(&self) -> SearchResult<()>;
}

/// Create the engine selected by configuration
pub fn create_engine(config: &EngineConfig) -> SearchResult<Arc<dyn SearchEngine>> {
    match config.backend {
        EngineBackend::Meilisearch => {
            tracing::info!(url = %config.url, "Using Meilisearch engine");
            Ok(Arc::new(MeilisearchEngine::new(config)?))
        }
        EngineBackend::InMemory => {
            tracing::warn!("Using in-memory engine: results are unranked");
            Ok(Arc::new(InMemoryEngine::new()))
        }
    }
}
