//! The error taxonomy of §7: a `thiserror`-derived enum with an
//! `axum::response::IntoResponse` impl, covering the seven variants and
//! the HTTP status mapping §7 defines.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad shape, missing references, illegal state. Surfaced; no retry.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Resource missing. For deletes, treated as idempotent success by the
    /// caller (see `services::*`); for reads/updates, surfaced.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate creation, binding already claimed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Local transaction failure. Transaction is always aborted before this
    /// variant is constructed.
    #[error("store error: {0}")]
    StoreError(String),

    /// SGROUP push failed. Per §7 propagation policy this is *absorbed*
    /// internally (logged + recorded as a condition) rather than returned to
    /// HTTP callers, but the variant exists so the sync coordinator has
    /// something concrete to log and wrap.
    #[error("external sync error: {0}")]
    ExternalSyncError(String),

    /// The reconciler's mass-deletion guard tripped (§4.E, §8 invariant 5).
    /// Nothing is deleted when this is returned.
    #[error("safety guard triggered: {0}")]
    SafetyGuardTriggered(String),

    /// Caller deadline was hit, or the operation was explicitly cancelled.
    /// Nothing is committed.
    #[error("cancelled or timed out: {0}")]
    Cancelled(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::ValidationFailed(msg.into())
    }

    pub fn not_found(key: impl std::fmt::Display) -> Self {
        Error::NotFound(key.to_string())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Error::Conflict(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Error::ValidationFailed(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Error::StoreError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            Error::ExternalSyncError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "external_sync_error"),
            Error::SafetyGuardTriggered(_) => (StatusCode::INTERNAL_SERVER_ERROR, "safety_guard_triggered"),
            Error::Cancelled(_) => (StatusCode::GATEWAY_TIMEOUT, "cancelled"),
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": code,
        }));

        (status, body).into_response()
    }
}
