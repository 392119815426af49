use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::search::{ConfigurationSummary, RawSearchParams};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

/// Search against a configuration
///
/// Serves both `/search/:config` and the per-name `/search_{name}` routes.
pub async fn search(
    state: &AppState,
    config_name: &str,
    params: std::result::Result<Query<RawSearchParams>, QueryRejection>,
) -> Result<Json<Value>> {
    let Query(params) = params.map_err(|e| AppError::Validation(e.body_text()))?;

    let request = state.builder.build(config_name, &params)?;
    let results = state.gateway.execute(config_name, &request).await?;

    Ok(Json(results))
}

pub async fn search_by_path(
    State(state): State<AppState>,
    Path(config_name): Path<String>,
    params: std::result::Result<Query<RawSearchParams>, QueryRejection>,
) -> Result<Json<Value>> {
    search(&state, &config_name, params).await
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.engine.health().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!(error = %e, "Engine health probe failed");
            "degraded"
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.engine.backend_name().to_string(),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds().max(0) as u64,
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub engine: String,
    pub uptime_seconds: u64,
}

/// List registered configurations
pub async fn list_configurations(State(state): State<AppState>) -> Json<Vec<ConfigurationSummary>> {
    Json(state.registry.summaries())
}

/// Full settings document of one configuration
pub async fn get_configuration(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>> {
    let configuration = state
        .registry
        .get(&name)
        .ok_or_else(|| AppError::NotFound(format!("Configuration {} not found", name)))?;

    Ok(Json(json!({
        "name": configuration.name,
        "index_uid": configuration.index_uid,
        "primary_key": configuration.primary_key,
        "state": state.registry.state(&name),
        "settings": configuration.settings,
    })))
}

/// Prometheus scrape endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}
