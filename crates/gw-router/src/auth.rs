//! Authentication middleware: resolves the bearer credential on every protected route into a
//! [`Principal`] and attaches it as a request extension, mirroring `admin_auth` pattern in
//! `admin.rs` but for the app-scoped caller class rather than the admin one.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use gw_core::auth::CallerClass;
use gw_core::bootstrap::AppState;

use crate::error::ApiError;

pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let principal = state
        .principals
        .resolve(header.as_deref(), CallerClass::App)
        .await
        .map_err(ApiError::from)?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
