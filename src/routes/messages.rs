use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    dto::message::{MessageResponse, PostMessageRequest},
    error::AppError,
    routes::CurrentUser,
    services::message_service,
    state::{SharedState, state_machine::DebatePhase},
};

/// Message endpoints: posting, listing, and likes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/discussions/{id}/messages",
            get(list_messages).post(post_message),
        )
        .route(
            "/discussions/{id}/messages/{message_id}/like",
            post(like_message),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    /// Restrict the listing to messages authored in one phase.
    pub phase: Option<DebatePhase>,
}

/// Post a message into a discussion, subject to the phase's author gate.
#[utoipa::path(
    post,
    path = "/api/discussions/{id}/messages",
    tag = "messages",
    request_body = PostMessageRequest,
    params(
        ("X-Auth-Token" = String, Header, description = "Session token"),
        ("id" = Uuid, Path, description = "Discussion identifier")
    ),
    responses(
        (status = 200, description = "Message posted", body = MessageResponse),
        (status = 401, description = "Caller may not speak in the current phase"),
        (status = 409, description = "No messages accepted in the current phase")
    )
)]
pub async fn post_message(
    State(state): State<SharedState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<PostMessageRequest>>,
) -> Result<Json<MessageResponse>, AppError> {
    let response = message_service::post_message(&state, &session, id, payload).await?;
    Ok(Json(response))
}

/// List the messages of a discussion, optionally narrowed to one phase.
#[utoipa::path(
    get,
    path = "/api/discussions/{id}/messages",
    tag = "messages",
    params(
        ("id" = Uuid, Path, description = "Discussion identifier"),
        ("phase" = Option<String>, Query, description = "Only messages authored in this phase")
    ),
    responses(
        (status = 200, description = "Messages in posting order", body = [MessageResponse]),
        (status = 404, description = "Unknown discussion")
    )
)]
pub async fn list_messages(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let messages = message_service::list_messages(&state, id, query.phase).await?;
    Ok(Json(messages))
}

/// Like a message; liking twice is a no-op.
#[utoipa::path(
    post,
    path = "/api/discussions/{id}/messages/{message_id}/like",
    tag = "messages",
    params(
        ("X-Auth-Token" = String, Header, description = "Session token"),
        ("id" = Uuid, Path, description = "Discussion identifier"),
        ("message_id" = Uuid, Path, description = "Message to like")
    ),
    responses(
        (status = 200, description = "Message with updated likes", body = MessageResponse),
        (status = 401, description = "Caller is not part of the discussion"),
        (status = 404, description = "Unknown message")
    )
)]
pub async fn like_message(
    State(state): State<SharedState>,
    CurrentUser(session): CurrentUser,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, AppError> {
    let response = message_service::like_message(&state, &session, id, message_id).await?;
    Ok(Json(response))
}
