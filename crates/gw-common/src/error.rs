use serde::Serialize;

/// Stable error-kind tags per the gateway's error envelope contract. Every HTTP-facing failure
/// boils down to one of these. `kind` returns the exact wire tag; `status` the HTTP status it maps
/// to.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("missing or invalid credential")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// Distinct from `NotFound`: the entity exists but belongs to another tenant. Returned to the
    /// client as 403, logged distinctly for audit.
    #[error("conversation belongs to another user")]
    PrivateConversation,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("Model: {0} does not exist")]
    ModelUnavailable(String),

    #[error("upstream provider error: {0}")]
    ProviderUpstreamError(String),

    #[error("upstream provider timed out")]
    ProviderTimeout,

    #[error("internal error ({correlation_id})")]
    Internal {
        correlation_id: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl GatewayError {
    pub fn internal(source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            correlation_id: crate::ids::new_correlation_id(),
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalidRequest",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "notFound",
            Self::PrivateConversation => "privateConversation",
            Self::Conflict(_) => "conflict",
            Self::ModelUnavailable(_) => "modelUnavailable",
            Self::ProviderUpstreamError(_) => "providerUpstreamError",
            Self::ProviderTimeout => "providerTimeout",
            Self::Internal { .. } => "internal",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) | Self::ModelUnavailable(_) => 400,
            Self::Unauthorized => 401,
            Self::Forbidden | Self::PrivateConversation => 403,
            Self::NotFound => 404,
            Self::Conflict(_) => 409,
            Self::ProviderUpstreamError(_) => 502,
            Self::ProviderTimeout => 504,
            Self::Internal { .. } => 500,
        }
    }

    /// Renders the wire envelope `{ "code":..., "error":... }` from.
    pub fn envelope(&self) -> ErrorEnvelope {
        let code = match self {
            Self::Internal { correlation_id, .. } => correlation_id.clone(),
            other => other.kind().to_string(),
        };
        ErrorEnvelope {
            code,
            error: self.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub error: String,
}

pub type GatewayResult<T> = Result<T, GatewayError>;
