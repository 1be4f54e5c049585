//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing,
//! request ids), and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Request},
    routing::{delete, get, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use super::handlers;
use super::state::AppState;

/// Assigns a random UUID to requests that arrive without `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the API router with versioned endpoints
    let api_v1 = Router::new()
        // Stations
        .route(
            "/stations",
            get(handlers::list_stations).post(handlers::create_station),
        )
        .route(
            "/stations/{id}",
            get(handlers::get_station)
                .put(handlers::update_station)
                .delete(handlers::delete_station),
        )
        // Blocks
        .route(
            "/blocks",
            get(handlers::list_blocks).post(handlers::create_block),
        )
        .route(
            "/blocks/{id}",
            get(handlers::get_block)
                .put(handlers::update_block)
                .delete(handlers::delete_block),
        )
        // Sectors
        .route(
            "/sectors/{kind}",
            get(handlers::list_sectors).post(handlers::create_sector),
        )
        .route(
            "/sectors/{kind}/{id}",
            get(handlers::get_sector)
                .patch(handlers::rename_sector)
                .delete(handlers::delete_sector),
        )
        // Pair relations
        .route(
            "/sectors/{kind}/{id}/adjacent",
            get(handlers::list_adjacent).post(handlers::add_adjacency),
        )
        .route(
            "/sectors/{kind}/{id}/adjacent/{other}",
            delete(handlers::remove_adjacency),
        )
        .route(
            "/sectors/{kind}/{id}/nearest",
            get(handlers::list_nearest).post(handlers::add_nearest),
        )
        .route("/nearest/{dnc}/{ecd}", delete(handlers::remove_nearest))
        // Train sectors
        .route(
            "/train-sectors/{kind}",
            get(handlers::list_train_sectors).post(handlers::create_train_sector),
        )
        .route(
            "/train-sectors/{kind}/{id}",
            get(handlers::get_train_sector)
                .put(handlers::update_train_sector)
                .delete(handlers::delete_train_sector),
        )
        // Membership
        .route(
            "/train-sectors/{kind}/{id}/{member}",
            get(handlers::list_members).put(handlers::reconcile_members),
        )
        .route(
            "/train-sectors/{kind}/{id}/{member}/{member_id}",
            put(handlers::set_member_position).delete(handlers::remove_member),
        );

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CompressionLayer::new())
        .layer(cors);

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(middleware)
        .with_state(state)
}
