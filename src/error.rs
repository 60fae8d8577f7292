use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::{
    dao::storage::StorageError,
    state::{
        AbortError, ApplyError, PlanError,
        discussion::{JoinError, ObserveError},
    },
};

/// Failures surfaced by the service layer, before any HTTP mapping.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A storage write or read failed.
    #[error("storage error: {0}")]
    Unavailable(#[source] StorageError),
    /// No storage backend is installed right now.
    #[error("running without storage (degraded)")]
    Degraded,
    /// The actor lacks the right to perform this command.
    #[error("forbidden: {0}")]
    Unauthorized(String),
    /// The request payload does not make sense.
    #[error("rejected input: {0}")]
    InvalidInput(String),
    /// The discussion is not in a state that allows this command.
    #[error("wrong state: {0}")]
    InvalidState(String),
    /// The addressed entity does not exist.
    #[error("missing: {0}")]
    NotFound(String),
    /// A transition took longer than the room allows.
    #[error("timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<JoinError> for ServiceError {
    fn from(err: JoinError) -> Self {
        match err {
            JoinError::RoleMismatch { .. } => ServiceError::InvalidInput(err.to_string()),
            JoinError::AlreadyJoined | JoinError::NotWaiting | JoinError::SideFull(_) => {
                ServiceError::InvalidState(err.to_string())
            }
        }
    }
}

impl From<ObserveError> for ServiceError {
    fn from(err: ObserveError) -> Self {
        match err {
            ObserveError::AlreadyJoined => ServiceError::InvalidState(err.to_string()),
            ObserveError::ObserversDisabled => ServiceError::Unauthorized(err.to_string()),
        }
    }
}

impl From<PlanError> for ServiceError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::AlreadyPending => {
                ServiceError::InvalidState("another phase transition is in flight".into())
            }
            PlanError::InvalidTransition(invalid) => {
                ServiceError::InvalidState(invalid.to_string())
            }
        }
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::NoPending => {
                ServiceError::InvalidState("nothing planned to apply".into())
            }
            ApplyError::IdMismatch { .. } => {
                ServiceError::InvalidState("a different transition is planned".into())
            }
            ApplyError::PhaseMismatch { expected, actual } => ServiceError::InvalidState(format!(
                "phase moved underneath the transition (planned from {expected:?}, now {actual:?})"
            )),
            ApplyError::VersionMismatch { expected, actual } => {
                ServiceError::InvalidState(format!(
                    "machine version moved underneath the transition (planned {expected}, now {actual})"
                ))
            }
        }
    }
}

impl From<AbortError> for ServiceError {
    fn from(err: AbortError) -> Self {
        match err {
            AbortError::NoPending => ServiceError::InvalidState("nothing planned to abort".into()),
            AbortError::IdMismatch { .. } => {
                ServiceError::InvalidState("a different transition is planned".into())
            }
        }
    }
}

/// Route-level error carrying the HTTP mapping of every [`ServiceError`].
#[derive(Debug, Error)]
pub enum AppError {
    /// 400, malformed or nonsensical request.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// 401, the actor may not do this.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// 404.
    #[error("not found: {0}")]
    NotFound(String),
    /// 409, the command raced another actor or arrived too late.
    #[error("conflict: {0}")]
    Conflict(String),
    /// 503, storage down or the room would not answer in time.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// 500.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

/// JSON body every error response carries.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
