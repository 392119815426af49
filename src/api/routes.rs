use crate::api::{handlers, AppState};
use crate::search::RawSearchParams;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
///
/// Every configuration registered at this point gets its own
/// `/search_{name}` route; `/search/:config` serves any name.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health
        .route("/health", get(handlers::health_check))
        // Search
        .route("/search/:config", get(handlers::search_by_path))
        // Configurations
        .route("/configurations", get(handlers::list_configurations))
        .route("/configurations/:name", get(handlers::get_configuration));

    for name in state.registry.names() {
        let path = format!("/search_{}", name);
        router = router.route(
            &path,
            get(
                move |State(state): State<AppState>,
                      params: Result<Query<RawSearchParams>, QueryRejection>| {
                    let name = name.clone();
                    async move { handlers::search(&state, &name, params).await }
                },
            ),
        );
    }

    if state.metrics_enabled {
        router = router.route("/metrics", get(handlers::metrics_handler));
    }

    router
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
