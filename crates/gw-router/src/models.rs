//! `GET /v1/models` and `GET /version`: read-only discovery endpoints, both
//! served straight from in-memory state with no storage round-trip.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use gw_core::bootstrap::AppState;
use gw_protocol::openai::{ModelListResponse, ModelObject};

pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelListResponse> {
    let snapshot = state.registry.snapshot();
    let data = snapshot
        .all_models()
        .into_iter()
        .map(|model| ModelObject {
            id: model.id.clone(),
            object: model.object.clone(),
            created: model.created,
            owned_by: model.owned_by.clone(),
        })
        .collect();
    Json(ModelListResponse::new(data))
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn health() -> &'static str {
    "ok"
}
