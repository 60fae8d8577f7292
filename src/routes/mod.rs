use axum::{Router, extract::FromRequestParts, http::request::Parts};

use crate::{
    error::AppError,
    services::identity_service,
    state::{SharedState, UserSession},
};

pub mod auth;
pub mod discussions;
pub mod docs;
pub mod health;
pub mod messages;
pub mod sse;
pub mod votes;

const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Authenticated caller, resolved from the `X-Auth-Token` header.
pub struct CurrentUser(pub UserSession);

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized("missing auth token header `X-Auth-Token`".into())
            })?;

        let session = identity_service::current_user(state, token)?;
        Ok(Self(session))
    }
}

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = auth::router()
        .merge(discussions::router())
        .merge(messages::router())
        .merge(votes::router())
        .merge(sse::router())
        .merge(health::router());

    let docs_router = docs::router(state.clone());

    Router::new()
        .nest("/api", api_router)
        .merge(docs_router)
        .with_state(state)
}
