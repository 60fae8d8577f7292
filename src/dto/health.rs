use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthz` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` while storage is reachable, `degraded` otherwise.
    pub status: String,
}

impl HealthResponse {
    /// Report a healthy backend.
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }

    /// Report a backend cut off from its storage.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".into(),
        }
    }
}
