use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{
    common::DiscussionPhaseSnapshot, discussion::DiscussionResponse, discussion::DiscussionSummary,
    message::MessageResponse, vote::VoteTallySummary,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`lobby` or `discussion`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast to a room whenever its discussion document changes.
pub struct DiscussionSnapshotEvent(pub DiscussionResponse);

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever a discussion's phase or status changes.
pub struct PhaseChangedEvent(pub DiscussionPhaseSnapshot);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a message has been accepted into a discussion.
pub struct MessagePostedEvent {
    pub message: MessageResponse,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a message collects a like.
pub struct MessageLikedEvent {
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub likes: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when an observer's final vote has been recorded.
pub struct VoteRecordedEvent {
    pub tally: VoteTallySummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted on the lobby stream when a discussion is created or its
/// listing row changes.
pub struct LobbyUpdatedEvent {
    pub discussion: DiscussionSummary,
}
