pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::engine::SearchEngine;
use crate::search::{ConfigurationRegistry, QueryRewriter, SearchGateway, SearchRequestBuilder};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub builder: SearchRequestBuilder,
    pub gateway: SearchGateway,
    pub registry: Arc<ConfigurationRegistry>,
    pub engine: Arc<dyn SearchEngine>,
    pub started_at: DateTime<Utc>,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        registry: Arc<ConfigurationRegistry>,
        rewriter: Arc<QueryRewriter>,
    ) -> Self {
        Self {
            builder: SearchRequestBuilder::new(registry.clone(), rewriter),
            gateway: SearchGateway::new(engine.clone(), registry.clone()),
            registry,
            engine,
            started_at: Utc::now(),
            metrics_enabled: true,
        }
    }

    /// Enable or disable the `/metrics` endpoint
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }
}
