use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::discussion::{
        CreateDiscussionRequest, DiscussionResponse, DiscussionSummary, JoinDiscussionRequest,
    },
    error::AppError,
    routes::CurrentUser,
    services::discussion_service,
    state::SharedState,
};

/// Discussion lifecycle endpoints: creation, roster, and phase control.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/discussions", get(list_discussions).post(create_discussion))
        .route("/discussions/{id}", get(get_discussion))
        .route("/discussions/{id}/join", post(join_discussion))
        .route("/discussions/{id}/observe", post(observe_discussion))
        .route("/discussions/{id}/start", post(start_discussion))
        .route("/discussions/{id}/advance", post(advance_discussion))
        .route("/discussions/{id}/end", post(end_discussion))
}

/// Open a new discussion in its waiting room.
#[utoipa::path(
    post,
    path = "/api/discussions",
    tag = "discussions",
    request_body = CreateDiscussionRequest,
    params(("X-Auth-Token" = String, Header, description = "Session token")),
    responses(
        (status = 200, description = "Discussion created", body = DiscussionResponse),
        (status = 400, description = "Invalid title or category"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_discussion(
    State(state): State<SharedState>,
    CurrentUser(session): CurrentUser,
    Valid(Json(payload)): Valid<Json<CreateDiscussionRequest>>,
) -> Result<Json<DiscussionResponse>, AppError> {
    let response = discussion_service::create_discussion(&state, &session, payload).await?;
    Ok(Json(response))
}

/// List discussions for the lobby, newest first.
#[utoipa::path(
    get,
    path = "/api/discussions",
    tag = "discussions",
    responses((status = 200, description = "Known discussions", body = [DiscussionSummary]))
)]
pub async fn list_discussions(
    State(state): State<SharedState>,
) -> Json<Vec<DiscussionSummary>> {
    Json(discussion_service::list_discussions(&state).await)
}

/// Retrieve the full state of one discussion.
#[utoipa::path(
    get,
    path = "/api/discussions/{id}",
    tag = "discussions",
    params(("id" = Uuid, Path, description = "Discussion identifier")),
    responses(
        (status = 200, description = "Discussion", body = DiscussionResponse),
        (status = 404, description = "Unknown discussion")
    )
)]
pub async fn get_discussion(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DiscussionResponse>, AppError> {
    Ok(Json(discussion_service::get_discussion(&state, id).await?))
}

/// Take a seat on one side of a waiting discussion.
#[utoipa::path(
    post,
    path = "/api/discussions/{id}/join",
    tag = "discussions",
    request_body = JoinDiscussionRequest,
    params(
        ("X-Auth-Token" = String, Header, description = "Session token"),
        ("id" = Uuid, Path, description = "Discussion identifier")
    ),
    responses(
        (status = 200, description = "Seat taken", body = DiscussionResponse),
        (status = 409, description = "Side full, already joined, or discussion not waiting")
    )
)]
pub async fn join_discussion(
    State(state): State<SharedState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<JoinDiscussionRequest>,
) -> Result<Json<DiscussionResponse>, AppError> {
    let response = discussion_service::join_discussion(&state, &session, id, payload).await?;
    Ok(Json(response))
}

/// Join a discussion as a silent observer.
#[utoipa::path(
    post,
    path = "/api/discussions/{id}/observe",
    tag = "discussions",
    params(
        ("X-Auth-Token" = String, Header, description = "Session token"),
        ("id" = Uuid, Path, description = "Discussion identifier")
    ),
    responses(
        (status = 200, description = "Observing", body = DiscussionResponse),
        (status = 401, description = "Observers are not allowed here")
    )
)]
pub async fn observe_discussion(
    State(state): State<SharedState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DiscussionResponse>, AppError> {
    let response = discussion_service::observe_discussion(&state, &session, id).await?;
    Ok(Json(response))
}

/// Start a discussion; creator only.
#[utoipa::path(
    post,
    path = "/api/discussions/{id}/start",
    tag = "discussions",
    params(
        ("X-Auth-Token" = String, Header, description = "Session token"),
        ("id" = Uuid, Path, description = "Discussion identifier")
    ),
    responses(
        (status = 200, description = "Discussion started", body = DiscussionResponse),
        (status = 401, description = "Caller is not the creator"),
        (status = 409, description = "Roster incomplete or already started")
    )
)]
pub async fn start_discussion(
    State(state): State<SharedState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DiscussionResponse>, AppError> {
    let response = discussion_service::start_discussion(&state, &session, id).await?;
    Ok(Json(response))
}

/// Advance a structured debate to its next phase; creator only.
#[utoipa::path(
    post,
    path = "/api/discussions/{id}/advance",
    tag = "discussions",
    params(
        ("X-Auth-Token" = String, Header, description = "Session token"),
        ("id" = Uuid, Path, description = "Discussion identifier")
    ),
    responses(
        (status = 200, description = "Phase advanced", body = DiscussionResponse),
        (status = 401, description = "Caller is not the creator"),
        (status = 409, description = "No further phase, or the phase moved concurrently")
    )
)]
pub async fn advance_discussion(
    State(state): State<SharedState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DiscussionResponse>, AppError> {
    let response = discussion_service::advance_discussion(&state, &session, id).await?;
    Ok(Json(response))
}

/// End a discussion ahead of its schedule; creator only.
#[utoipa::path(
    post,
    path = "/api/discussions/{id}/end",
    tag = "discussions",
    params(
        ("X-Auth-Token" = String, Header, description = "Session token"),
        ("id" = Uuid, Path, description = "Discussion identifier")
    ),
    responses(
        (status = 200, description = "Discussion ended", body = DiscussionResponse),
        (status = 401, description = "Caller is not the creator"),
        (status = 409, description = "Discussion already over")
    )
)]
pub async fn end_discussion(
    State(state): State<SharedState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DiscussionResponse>, AppError> {
    let response = discussion_service::end_discussion(&state, &session, id).await?;
    Ok(Json(response))
}
