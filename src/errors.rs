use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

/// Errors produced by the yield estimation engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum YieldError {
    /// Bad coordinates, capacity or loss assumptions. Never retried, never falls back.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The remote service rejected the location or parameters (HTTP 400).
    #[error("Location not covered by remote service: {0}")]
    Coverage(String),

    /// The remote request did not complete within the configured timeout (milliseconds).
    #[error("Remote service timed out after {0}ms")]
    Timeout(u64),

    #[error("Remote service error: {0}")]
    Service(String),

    /// Transport succeeded but the payload did not have the expected shape.
    #[error("Malformed remote response: {0}")]
    MalformedResponse(String),

    /// The static lookup table violates its partition or factor-sum invariants.
    #[error("Lookup table invariant violated: {0}")]
    LookupInvariant(String),
}

impl YieldError {
    /// Whether the orchestrator should fall back to the lookup table after this error.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            YieldError::Coverage(_)
                | YieldError::Timeout(_)
                | YieldError::Service(_)
                | YieldError::MalformedResponse(_)
        )
    }
}

/// Errors surfaced by the HTTP adapter.
///
/// Yield endpoints report engine failures inside `YieldCalculationResult`;
/// only input checks on the other endpoints short-circuit through `?`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<YieldError> for AppError {
    fn from(err: YieldError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}
