use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::vote::{CastVoteRequest, CastVoteResponse, VoteResultsResponse},
    error::AppError,
    routes::CurrentUser,
    services::vote_service,
    state::SharedState,
};

/// Final ballot endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/discussions/{id}/votes",
        get(vote_results).post(cast_vote),
    )
}

/// Cast (or change) the caller's final vote; observers only.
#[utoipa::path(
    post,
    path = "/api/discussions/{id}/votes",
    tag = "votes",
    request_body = CastVoteRequest,
    params(
        ("X-Auth-Token" = String, Header, description = "Session token"),
        ("id" = Uuid, Path, description = "Discussion identifier")
    ),
    responses(
        (status = 200, description = "Vote recorded", body = CastVoteResponse),
        (status = 401, description = "Caller is not an observer"),
        (status = 409, description = "Voting is not open")
    )
)]
pub async fn cast_vote(
    State(state): State<SharedState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<CastVoteRequest>>,
) -> Result<Json<CastVoteResponse>, AppError> {
    let response = vote_service::cast_vote(&state, &session, id, payload).await?;
    Ok(Json(response))
}

/// Current results of the final ballot.
#[utoipa::path(
    get,
    path = "/api/discussions/{id}/votes",
    tag = "votes",
    params(("id" = Uuid, Path, description = "Discussion identifier")),
    responses(
        (status = 200, description = "Ballot results", body = VoteResultsResponse),
        (status = 404, description = "Unknown discussion")
    )
)]
pub async fn vote_results(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<VoteResultsResponse>, AppError> {
    Ok(Json(vote_service::vote_results(&state, id).await?))
}
