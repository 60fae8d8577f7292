use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    services::{
        discussion_service,
        sse_service::{self, StreamKind},
    },
    state::SharedState,
};

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/lobby/events", get(lobby_stream))
        .route("/discussions/{id}/events", get(discussion_stream))
}

/// Stream lobby updates: discussion listings and system status.
#[utoipa::path(
    get,
    path = "/api/lobby/events",
    tag = "sse",
    responses((status = 200, description = "Lobby SSE stream", content_type = "text/event-stream", body = String))
)]
pub async fn lobby_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe_lobby(&state);
    info!("New lobby SSE connection");
    let greeting = sse_service::lobby_greeting(&state);
    sse_service::to_sse_stream(greeting, receiver, StreamKind::Lobby)
}

/// Stream one discussion's events, starting with a full snapshot.
#[utoipa::path(
    get,
    path = "/api/discussions/{id}/events",
    tag = "sse",
    params(("id" = Uuid, Path, description = "Discussion identifier")),
    responses(
        (status = 200, description = "Discussion SSE stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown discussion")
    )
)]
pub async fn discussion_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let room = discussion_service::fetch_room(&state, id).await?;
    let receiver = sse_service::subscribe_room(&room);
    info!(discussion_id = %id, "New discussion SSE connection");
    let greeting = sse_service::room_greeting(&state, &room).await;
    Ok(sse_service::to_sse_stream(
        greeting,
        receiver,
        StreamKind::Room(id),
    ))
}
