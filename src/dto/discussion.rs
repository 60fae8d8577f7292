use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::DiscussionListItemEntity,
    dto::{format_system_time, vote::VoteTallySummary},
    state::{
        discussion::{
            DebateMode, Discussion, DiscussionKind, DiscussionStatus, Observer, Participant,
            ParticipantRole, VoteChoice,
        },
        state_machine::DebatePhase,
    },
};

fn default_allow_observers() -> bool {
    true
}

/// Payload used to open a brand-new discussion.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateDiscussionRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    /// Must match one of the configured categories.
    pub category: String,
    pub kind: DiscussionKind,
    /// Phase length for pros/cons debates, overall limit for the other
    /// formats. Optional both ways: pros/cons falls back to the configured
    /// default, the others run without a limit.
    #[serde(default)]
    #[validate(range(min = 5, max = 180))]
    pub time_limit_minutes: Option<u32>,
    #[serde(default)]
    #[validate(range(min = 2, max = 10))]
    pub max_participants: Option<u32>,
    #[serde(default = "default_allow_observers")]
    pub allow_observers: bool,
}

/// Payload used to take a seat in a discussion.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinDiscussionRequest {
    /// Side to join; `participant` for free-form discussions.
    pub role: ParticipantRole,
}

/// Roster entry exposed to REST/SSE clients.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ParticipantSummary {
    pub user_id: Uuid,
    pub username: String,
    pub role: ParticipantRole,
    pub team_leader: bool,
    pub joined_at: String,
}

impl From<(Uuid, Participant)> for ParticipantSummary {
    fn from((user_id, participant): (Uuid, Participant)) -> Self {
        Self {
            user_id,
            username: participant.username,
            role: participant.role,
            team_leader: participant.team_leader,
            joined_at: format_system_time(participant.joined_at),
        }
    }
}

/// Observer entry exposed to REST/SSE clients.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ObserverSummary {
    pub user_id: Uuid,
    pub username: String,
    pub joined_at: String,
}

impl From<(Uuid, Observer)> for ObserverSummary {
    fn from((user_id, observer): (Uuid, Observer)) -> Self {
        Self {
            user_id,
            username: observer.username,
            joined_at: format_system_time(observer.joined_at),
        }
    }
}

/// Full projection of a discussion exposed to REST/SSE clients.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct DiscussionResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub kind: DiscussionKind,
    pub status: DiscussionStatus,
    pub created_by: Uuid,
    pub creator_name: String,
    pub created_at: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub allow_observers: bool,
    pub max_participants: Option<u32>,
    /// Current phase; present only for structured debates.
    pub phase: Option<DebatePhase>,
    /// Phase length in minutes; present only for structured debates.
    pub phase_minutes: Option<u32>,
    /// When the current phase began; present only for structured debates.
    pub phase_started_at: Option<String>,
    /// Overall limit in minutes; present only for single-timer discussions.
    pub time_limit_minutes: Option<u32>,
    /// Deadline of the running phase or overall timer.
    pub deadline: Option<String>,
    pub participants: Vec<ParticipantSummary>,
    pub observers: Vec<ObserverSummary>,
    pub votes: VoteTallySummary,
    pub winner: Option<VoteChoice>,
}

impl From<(Discussion, DebatePhase)> for DiscussionResponse {
    fn from((discussion, phase): (Discussion, DebatePhase)) -> Self {
        let deadline = discussion.deadline_at(phase).map(format_system_time);
        let votes = discussion.tally().into();
        let (visible_phase, phase_minutes, phase_started_at, time_limit_minutes) =
            match &discussion.mode {
                DebateMode::Structured {
                    phase_minutes,
                    phase_started_at,
                } => (
                    Some(phase),
                    Some(*phase_minutes),
                    phase_started_at.map(format_system_time),
                    None,
                ),
                DebateMode::Legacy { time_minutes } => (None, None, None, *time_minutes),
            };

        Self {
            id: discussion.id,
            title: discussion.title,
            description: discussion.description,
            category: discussion.category,
            kind: discussion.kind,
            status: discussion.status,
            created_by: discussion.created_by,
            creator_name: discussion.creator_name,
            created_at: format_system_time(discussion.created_at),
            started_at: discussion.started_at.map(format_system_time),
            ended_at: discussion.ended_at.map(format_system_time),
            allow_observers: discussion.allow_observers,
            max_participants: discussion.max_participants,
            phase: visible_phase,
            phase_minutes,
            phase_started_at,
            time_limit_minutes,
            deadline,
            participants: discussion
                .participants
                .into_iter()
                .map(Into::into)
                .collect(),
            observers: discussion.observers.into_iter().map(Into::into).collect(),
            votes,
            winner: discussion.winner,
        }
    }
}

/// Lobby row for a discussion.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct DiscussionSummary {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub kind: DiscussionKind,
    pub status: DiscussionStatus,
    pub creator_name: String,
    pub created_at: String,
    pub allow_observers: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    pub participant_count: usize,
    pub observer_count: usize,
}

impl From<DiscussionListItemEntity> for DiscussionSummary {
    fn from(entity: DiscussionListItemEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            category: entity.category,
            kind: entity.kind,
            status: entity.status,
            creator_name: entity.creator_name,
            created_at: format_system_time(entity.created_at),
            allow_observers: entity.allow_observers,
            max_participants: entity.max_participants,
            participant_count: entity.participant_count,
            observer_count: entity.observer_count,
        }
    }
}
