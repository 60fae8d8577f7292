use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::format_system_time,
    state::{
        discussion::{Message, MessageKind, ParticipantRole},
        state_machine::DebatePhase,
    },
};

/// Payload used to post a message into a discussion.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    /// Message this one replies to; must belong to the same discussion.
    #[serde(default)]
    pub reply_to: Option<Uuid>,
}

/// Message projection exposed to REST/SSE clients.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub discussion_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub content: String,
    pub timestamp: String,
    pub role: ParticipantRole,
    /// Phase the message was authored in; absent for legacy-mode messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<DebatePhase>,
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
    /// Users who liked the message.
    pub liked_by: Vec<Uuid>,
    pub likes: usize,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        let likes = message.liked_by.len();
        Self {
            id: message.id,
            discussion_id: message.discussion_id,
            user_id: message.user_id,
            username: message.username,
            content: message.content,
            timestamp: format_system_time(message.sent_at),
            role: message.role,
            phase: message.phase,
            kind: message.kind,
            reply_to: message.reply_to,
            liked_by: message.liked_by.into_iter().collect(),
            likes,
        }
    }
}
