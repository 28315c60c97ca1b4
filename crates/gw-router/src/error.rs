//! Translates a [`GatewayError`] into the wire envelope and HTTP status from /: `{ "code":...,
//! "error":... }` with the status `kind` maps to.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use gw_common::GatewayError;

pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = self.0.envelope();
        let status = StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code = %envelope.code, error = %envelope.error, "request failed");
        }
        (status, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
