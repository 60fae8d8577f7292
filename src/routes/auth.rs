use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use axum_valid::Valid;
use tracing::info;

use crate::{
    dto::auth::{SessionResponse, SigninRequest, SignupRequest, UserResponse},
    error::AppError,
    routes::CurrentUser,
    services::identity_service,
    state::SharedState,
};

/// Identity endpoints: username registration and session management.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/signout", post(signout))
        .route("/auth/me", get(me))
}

/// Claim a username and open a session for it.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Session opened", body = SessionResponse),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn signup(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SignupRequest>>,
) -> Result<Json<SessionResponse>, AppError> {
    let (token, session) = identity_service::register(&state, &payload.username)?;
    info!(user_id = %session.user_id, username = %session.username, "user registered");
    Ok(Json(SessionResponse::from_session(token, &session)))
}

/// Open a fresh session for a registered username.
#[utoipa::path(
    post,
    path = "/api/auth/signin",
    tag = "auth",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Session opened", body = SessionResponse),
        (status = 401, description = "Unknown username")
    )
)]
pub async fn signin(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SigninRequest>>,
) -> Result<Json<SessionResponse>, AppError> {
    let (token, session) = identity_service::sign_in(&state, &payload.username)?;
    Ok(Json(SessionResponse::from_session(token, &session)))
}

/// Invalidate the presented session token.
#[utoipa::path(
    post,
    path = "/api/auth/signout",
    tag = "auth",
    params(("X-Auth-Token" = String, Header, description = "Session token to invalidate")),
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "Unknown session token")
    )
)]
pub async fn signout(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = headers
        .get(super::AUTH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing auth token header `X-Auth-Token`".into()))?;

    identity_service::sign_out(&state, token)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Profile of the authenticated caller.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    params(("X-Auth-Token" = String, Header, description = "Session token")),
    responses(
        (status = 200, description = "Authenticated user", body = UserResponse),
        (status = 401, description = "Missing or unknown session token")
    )
)]
pub async fn me(CurrentUser(session): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(session))
}
