//! Common test utilities
//!
//! Builds a gateway wired to an in-memory engine with the reference catalog
//! registered, applied and seeded.

#![allow(dead_code)]

use search_ab_gateway::api::AppState;
use search_ab_gateway::engine::InMemoryEngine;
use search_ab_gateway::search::{default_catalog, install, ConfigurationRegistry, QueryRewriter};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub struct TestGateway {
    pub engine: Arc<InMemoryEngine>,
    pub registry: Arc<ConfigurationRegistry>,
    pub rewriter: Arc<QueryRewriter>,
}

impl TestGateway {
    /// Catalog registered but not applied
    pub fn registered() -> Self {
        let engine = Arc::new(InMemoryEngine::new());
        let registry = Arc::new(ConfigurationRegistry::new(engine.clone()));
        let catalog = default_catalog("general_index", "id").unwrap();
        let rewriter = Arc::new(install(catalog, &registry));

        Self {
            engine,
            registry,
            rewriter,
        }
    }

    /// Catalog registered, applied and seeded with [`sample_documents`]
    pub async fn ready() -> Self {
        let gateway = Self::registered();
        gateway.registry.apply_all().await.unwrap();
        search_ab_gateway::corpus::seed(
            gateway.engine.as_ref(),
            &gateway.registry,
            &sample_documents(),
            2,
        )
        .await
        .unwrap();
        gateway
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.engine.clone(), self.registry.clone(), self.rewriter.clone())
    }
}

pub fn sample_documents() -> Vec<Value> {
    vec![
        json!({"id": "1", "title": "Wildfire exclusions", "state": "California", "weight": 5}),
        json!({"id": "2", "title": "Hail claims", "state": "Texas", "weight": 3}),
        json!({"id": "3", "title": "UM coverage basics", "state": "Ohio", "weight": 1}),
        json!({"id": "4", "title": "Flood mitigation", "state": "Florida", "weight": 2}),
        json!({"id": "5", "title": "Fire adjusting", "state": "California", "weight": 4}),
    ]
}

/// Parse Prometheus exposition format into metric name -> sample lines
pub fn parse_prometheus_output(output: &str) -> HashMap<String, Vec<String>> {
    let mut metrics: HashMap<String, Vec<String>> = HashMap::new();

    for line in output.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let name = line
            .split(|c| c == '{' || c == ' ')
            .next()
            .unwrap_or_default()
            .to_string();
        metrics.entry(name).or_default().push(line.to_string());
    }

    metrics
}
