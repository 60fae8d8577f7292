use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::{
        discussion::{DebateMode, Discussion, DiscussionStatus, VoteChoice},
        state_machine::DebatePhase,
    },
};

/// Shared snapshot describing where a discussion stands in its debate flow.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct DiscussionPhaseSnapshot {
    /// Discussion the snapshot belongs to.
    pub discussion_id: Uuid,
    /// Lifecycle status of the discussion.
    pub status: DiscussionStatus,
    /// True when the backend operates in degraded mode (no connection to database).
    pub degraded: bool,
    /// Current phase; absent for single-timer discussions, which have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<DebatePhase>,
    /// Present while a structured phase is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_started_at: Option<String>,
    /// Present while a timed phase or single timer is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    /// Present once the outcome has been decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<VoteChoice>,
}

impl DiscussionPhaseSnapshot {
    /// Build the snapshot from the discussion aggregate and its live phase.
    pub fn from_parts(discussion: &Discussion, phase: DebatePhase, degraded: bool) -> Self {
        let phase_started_at = match &discussion.mode {
            DebateMode::Structured {
                phase_started_at, ..
            } => phase_started_at.map(format_system_time),
            DebateMode::Legacy { .. } => None,
        };

        Self {
            discussion_id: discussion.id,
            status: discussion.status,
            degraded,
            phase: discussion.mode.is_structured().then_some(phase),
            phase_started_at,
            deadline: discussion.deadline_at(phase).map(format_system_time),
            winner: discussion.winner,
        }
    }
}
