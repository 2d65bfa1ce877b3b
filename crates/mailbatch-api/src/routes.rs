//! API routes

use axum::{
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use mailbatch_common::config::ApiConfig;
use mailbatch_core::{CampaignEngine, SenderManager};
use mailbatch_storage::DatabasePool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{analytics, campaigns, health, leads, sender, sender_configs};
use crate::openapi::create_openapi_routes;
use crate::state::AppState;

/// Create the API router
pub fn create_router(
    db_pool: DatabasePool,
    engine: Arc<CampaignEngine>,
    sender_manager: Arc<SenderManager>,
    api_config: &ApiConfig,
) -> Router {
    let state = Arc::new(AppState {
        db_pool,
        engine,
        sender: sender_manager,
    });

    // Health check routes
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/detailed", get(health::health_detailed))
        .with_state(state.clone());

    // Lead routes
    let lead_routes = Router::new()
        .route("/", get(leads::list_leads))
        .route("/", post(leads::create_lead))
        .route("/:id", get(leads::get_lead));

    // Campaign routes
    let campaign_routes = Router::new()
        .route("/", get(campaigns::list_campaigns))
        .route("/", post(campaigns::start_campaign))
        .route("/:id", get(campaigns::get_campaign))
        .route("/:id/cancel", post(campaigns::cancel_campaign));

    // Sender configuration routes
    let sender_config_routes = Router::new()
        .route("/", get(sender_configs::list_sender_configs))
        .route("/", post(sender_configs::create_sender_config))
        .route("/:id", get(sender_configs::get_sender_config))
        .route("/:id", put(sender_configs::update_sender_config))
        .route("/:id", delete(sender_configs::delete_sender_config))
        .route("/:id/activate", post(sender_configs::activate_sender_config));

    // Sender operation routes
    let sender_routes = Router::new()
        .route("/test", post(sender::send_test_email))
        .route("/stats", get(sender::get_sender_stats))
        .route("/health", get(sender::get_sender_health));

    // Analytics routes
    let analytics_routes = Router::new()
        .route("/trends", get(analytics::get_trends))
        .route("/recommendations", get(analytics::get_recommendations));

    // API v1 routes
    let api_v1 = Router::new()
        .nest("/leads", lead_routes)
        .nest("/campaigns", campaign_routes)
        .nest("/sender-configs", sender_config_routes)
        .nest("/sender", sender_routes)
        .nest("/analytics", analytics_routes)
        .with_state(state.clone());

    // CORS configuration
    let cors = if api_config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = api_config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Combine all routes
    let mut router = Router::new()
        .nest("/health", health_routes)
        .nest("/api/v1", api_v1);

    if api_config.enable_swagger {
        router = router.merge(create_openapi_routes());
    }

    router
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
