//! HTTP surface: chat completions, conversations, responses, and model discovery, wired to the
//! gw-core request-plane pipeline. Route layout and middleware stack mirror `proxy_router`: a flat
//! `Router`, bearer auth applied as an outer `from_fn_with_state` layer, tracing and CORS as
//! `tower_http` layers underneath.

mod auth;
mod chat;
mod convert;
mod conversations;
mod error;
mod models;
mod responses;
mod sse;

use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use gw_core::bootstrap::AppState;
use gw_core::config::cors_host_allowed;

pub fn gateway_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        .route("/v1/chat/completions", post(chat::chat_completions))
        .route("/v1/conversations", post(conversations::create_conversation))
        .route(
            "/v1/conversations/{id}",
            get(conversations::get_conversation)
                .patch(conversations::update_conversation)
                .post(conversations::update_conversation)
                .delete(conversations::delete_conversation),
        )
        .route(
            "/v1/conversations/{id}/items",
            post(conversations::add_items).get(conversations::list_items),
        )
        .route(
            "/v1/conversations/{id}/items/{item_id}",
            get(conversations::get_item).delete(conversations::delete_item),
        )
        .route("/v1/responses", post(responses::create_response))
        .route("/v1/responses/{id}", get(responses::get_response))
        .route("/v1/responses/{id}/cancel", post(responses::cancel_response))
        .route("/v1/responses/{id}/input_items", get(responses::list_input_items))
        .route("/v1/models", get(models::list_models))
        .layer(middleware::from_fn_with_state(state.clone(), auth::authenticate))
        .route("/version", get(models::version))
        .route("/health", get(models::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `ALLOWED_CORS_HOSTS` drives an allow-list predicate rather than `Any`: the gateway sits in front
/// of tenant-scoped conversations and responses, so a permissive default would leak cross-origin
/// reads of private data.
fn cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let allowed = state.config.allowed_cors_hosts.clone();
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
        .allow_origin(tower_http::cors::AllowOrigin::predicate(move |origin, _| {
            let Ok(origin) = origin.to_str() else { return false };
            let host = origin
                .split("://")
                .next_back()
                .unwrap_or(origin);
            cors_host_allowed(&allowed, host)
        }))
}
