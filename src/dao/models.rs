use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::{
    discussion::{DiscussionKind, DiscussionStatus, MessageKind, ParticipantRole, VoteChoice},
    state_machine::DebatePhase,
};

/// Timer regime persisted with a discussion.
///
/// Tagged so a document is unambiguously structured or legacy; the two
/// variants never share fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DebateModeEntity {
    /// Phase-driven debate with its current phase and phase timing.
    Structured {
        /// Phase the debate currently sits in.
        phase: DebatePhase,
        /// Duration of each phase, in minutes.
        phase_minutes: u32,
        /// When the current phase began; absent until the debate opens.
        phase_started_at: Option<SystemTime>,
    },
    /// Single-timer discussion; `time_minutes` absent means unlimited.
    Legacy {
        /// Overall duration from start, in minutes.
        time_minutes: Option<u32>,
    },
}

/// Roster entry persisted with a discussion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Stable identifier of the participant.
    pub user_id: Uuid,
    /// Display name captured at join time.
    pub username: String,
    /// Side the participant debates on.
    pub role: ParticipantRole,
    /// When the participant joined.
    pub joined_at: SystemTime,
    /// Whether this participant leads their side.
    pub team_leader: bool,
}

/// Observer entry persisted with a discussion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObserverEntity {
    /// Stable identifier of the observer.
    pub user_id: Uuid,
    /// Display name captured at join time.
    pub username: String,
    /// When the observer joined.
    pub joined_at: SystemTime,
}

/// Final vote persisted with a discussion; one entry per voter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteEntity {
    /// Voter's user id.
    pub user_id: Uuid,
    /// The recorded choice.
    pub choice: VoteChoice,
    /// When the vote was (last) cast.
    pub cast_at: SystemTime,
    /// Optional free-text justification.
    pub reasoning: Option<String>,
}

/// Aggregate discussion entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscussionEntity {
    /// Primary key of the discussion.
    pub id: Uuid,
    /// Title shown in listings.
    pub title: String,
    /// Longer description of the motion.
    pub description: String,
    /// Category label.
    pub category: String,
    /// Discussion format.
    pub kind: DiscussionKind,
    /// Lifecycle status.
    pub status: DiscussionStatus,
    /// User id of the creator.
    pub created_by: Uuid,
    /// Display name of the creator.
    pub creator_name: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// When the discussion went active.
    pub started_at: Option<SystemTime>,
    /// When the discussion ended.
    pub ended_at: Option<SystemTime>,
    /// Whether observers may watch and vote.
    pub allow_observers: bool,
    /// Optional roster cap; halved per side for pros/cons debates.
    pub max_participants: Option<u32>,
    /// Timer regime and, for structured debates, the persisted phase.
    pub mode: DebateModeEntity,
    /// Debating roster in join order.
    pub participants: Vec<ParticipantEntity>,
    /// Observer gallery in join order.
    pub observers: Vec<ObserverEntity>,
    /// Final votes, one per voter.
    pub votes: Vec<VoteEntity>,
    /// Outcome once decided.
    pub winner: Option<VoteChoice>,
}

/// Discussion list item entity (subset of DiscussionEntity) persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscussionListItemEntity {
    /// Primary key of the discussion.
    pub id: Uuid,
    /// Title shown in listings.
    pub title: String,
    /// Category label.
    pub category: String,
    /// Discussion format.
    pub kind: DiscussionKind,
    /// Lifecycle status.
    pub status: DiscussionStatus,
    /// Display name of the creator.
    pub creator_name: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Whether observers may watch and vote.
    pub allow_observers: bool,
    /// Optional roster cap.
    pub max_participants: Option<u32>,
    /// Number of debating participants.
    pub participant_count: usize,
    /// Number of observers.
    pub observer_count: usize,
}

/// Message entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageEntity {
    /// Primary key of the message.
    pub id: Uuid,
    /// Discussion this message belongs to.
    pub discussion_id: Uuid,
    /// Author's user id.
    pub user_id: Uuid,
    /// Author's display name at send time.
    pub username: String,
    /// Message body.
    pub content: String,
    /// When the message was accepted.
    pub sent_at: SystemTime,
    /// Author's role at send time.
    pub role: ParticipantRole,
    /// Phase current when the message was authored; absent in legacy mode.
    pub phase: Option<DebatePhase>,
    /// Classification within the debate flow.
    pub kind: MessageKind,
    /// Message this one replies to, if any.
    pub reply_to: Option<Uuid>,
    /// Users who liked this message.
    pub liked_by: Vec<Uuid>,
}

impl From<DiscussionEntity> for DiscussionListItemEntity {
    fn from(entity: DiscussionEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            category: entity.category,
            kind: entity.kind,
            status: entity.status,
            creator_name: entity.creator_name,
            created_at: entity.created_at,
            allow_observers: entity.allow_observers,
            max_participants: entity.max_participants,
            participant_count: entity.participants.len(),
            observer_count: entity.observers.len(),
        }
    }
}
