use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Build the `/healthz` payload from the degraded flag, probing storage on
/// the way so connectivity trouble lands in the logs even between the
/// supervisor's own polls.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if let Ok(store) = state.require_store().await {
        if let Err(err) = store.health_check().await {
            warn!(error = %err, "storage probe failed during health request");
        }
    } else {
        warn!("health requested while no storage is installed");
    }

    match state.is_degraded() {
        true => HealthResponse::degraded(),
        false => HealthResponse::ok(),
    }
}
