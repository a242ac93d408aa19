use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Server-side error type: every `grit::Error` plus the transport-specific
/// failures a request can hit before ever reaching the library.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Grit(#[from] grit::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

impl ServerError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotSupported(_) => StatusCode::BAD_REQUEST,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Grit(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// The JSON/RPC envelope's failure shape: `{success:false,
/// failure:true, data:{msg}}` with HTTP 400. Non-RPC routes (smart-HTTP,
/// static assets, file content) get a plain status code and body instead.
impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(error = %self, status = %status, "request failed");
        let body = Json(json!({
            "success": false,
            "failure": true,
            "data": { "msg": self.to_string() },
        }));
        (status, body).into_response()
    }
}
