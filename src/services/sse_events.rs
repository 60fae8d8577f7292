use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::{DiscussionEntity, DiscussionListItemEntity},
    dto::{
        common::DiscussionPhaseSnapshot,
        discussion::{DiscussionResponse, DiscussionSummary},
        message::MessageResponse,
        sse::{
            DiscussionSnapshotEvent, LobbyUpdatedEvent, MessageLikedEvent, MessagePostedEvent,
            PhaseChangedEvent, ServerEvent, SystemStatus, VoteRecordedEvent,
        },
        vote::VoteTallySummary,
    },
    state::{
        SharedState,
        discussion::{Discussion, Message, VoteTally},
        room::Room,
        state_machine::DebatePhase,
    },
};

pub(crate) const EVENT_DISCUSSION_SNAPSHOT: &str = "discussion.snapshot";
const EVENT_PHASE_CHANGED: &str = "phase_changed";
const EVENT_MESSAGE_POSTED: &str = "message.posted";
const EVENT_MESSAGE_LIKED: &str = "message.liked";
const EVENT_VOTE_RECORDED: &str = "vote.recorded";
const EVENT_LOBBY_UPDATED: &str = "lobby.updated";
const EVENT_STATUS: &str = "status";

/// Broadcast a full snapshot of the discussion to its room subscribers.
pub fn broadcast_discussion_snapshot(room: &Room, discussion: Discussion, phase: DebatePhase) {
    let payload = DiscussionSnapshotEvent(DiscussionResponse::from((discussion, phase)));
    send_room_event(room, EVENT_DISCUSSION_SNAPSHOT, &payload);
}

/// Broadcast a phase change notification to the room.
pub fn broadcast_phase_changed(
    state: &SharedState,
    room: &Room,
    discussion: &Discussion,
    phase: DebatePhase,
) {
    let payload = PhaseChangedEvent(DiscussionPhaseSnapshot::from_parts(
        discussion,
        phase,
        state.is_degraded(),
    ));
    send_room_event(room, EVENT_PHASE_CHANGED, &payload);
}

/// Broadcast a newly posted message to the room.
pub fn broadcast_message_posted(room: &Room, message: Message) {
    let payload = MessagePostedEvent {
        message: MessageResponse::from(message),
    };
    send_room_event(room, EVENT_MESSAGE_POSTED, &payload);
}

/// Broadcast an updated like count for a message.
pub fn broadcast_message_liked(room: &Room, message_id: Uuid, user_id: Uuid, likes: usize) {
    let payload = MessageLikedEvent {
        message_id,
        user_id,
        likes,
    };
    send_room_event(room, EVENT_MESSAGE_LIKED, &payload);
}

/// Broadcast the running tally after a vote lands.
pub fn broadcast_vote_recorded(room: &Room, tally: VoteTally) {
    let payload = VoteRecordedEvent {
        tally: VoteTallySummary::from(tally),
    };
    send_room_event(room, EVENT_VOTE_RECORDED, &payload);
}

/// Broadcast a refreshed lobby card for the discussion.
pub fn broadcast_lobby_updated(state: &SharedState, entity: &DiscussionEntity) {
    let payload = LobbyUpdatedEvent {
        discussion: DiscussionSummary::from(DiscussionListItemEntity::from(entity.clone())),
    };
    send_lobby_event(state, EVENT_LOBBY_UPDATED, &payload);
}

/// Broadcast the degraded flag to the lobby and every live room.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    send_lobby_event(state, EVENT_STATUS, &payload);
    for room in state.rooms().iter() {
        send_room_event(room.value(), EVENT_STATUS, &payload);
    }
}

fn send_room_event(room: &Room, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => room.sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize room SSE payload"),
    }
}

fn send_lobby_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.lobby_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize lobby SSE payload"),
    }
}
