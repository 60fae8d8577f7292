//! Final votes cast by observers.
//!
//! Structured debates open the ballot during their voting phase and freeze
//! the winner when the debate ends; single-timer discussions collect votes
//! after they end and keep the published winner in step with the running
//! tally. One keyed vote per observer, recast overwrites.

use std::time::SystemTime;

use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::vote::{CastVoteRequest, CastVoteResponse, VoteResultsResponse},
    error::ServiceError,
    services::{discussion_service, sse_events},
    state::{
        SharedState, UserSession,
        discussion::{DiscussionStatus, FinalVote},
        state_machine::DebatePhase,
    },
};

/// Record an observer's final vote.
pub async fn cast_vote(
    state: &SharedState,
    session: &UserSession,
    id: Uuid,
    request: CastVoteRequest,
) -> Result<CastVoteResponse, ServiceError> {
    let room = discussion_service::fetch_room(state, id).await?;
    let store = state.require_store().await?;

    let (discussion, phase) = {
        let mut guard = room.state().write().await;
        let phase = room.phase().await;

        if !guard.discussion.observers.contains_key(&session.user_id) {
            return Err(ServiceError::Unauthorized(
                "only observers may cast a final vote".into(),
            ));
        }

        let eligible = if guard.discussion.mode.is_structured() {
            phase == DebatePhase::Voting
        } else {
            guard.discussion.status == DiscussionStatus::Ended
        };
        if !eligible {
            return Err(ServiceError::InvalidState("voting is not open".into()));
        }

        guard.discussion.record_vote(
            session.user_id,
            FinalVote {
                choice: request.choice,
                cast_at: SystemTime::now(),
                reasoning: request.reasoning,
            },
        );
        // Votes arrive after the end in the single-timer formats, so the
        // published winner has to track the running tally.
        if !guard.discussion.mode.is_structured() {
            guard.discussion.winner = guard.discussion.tally().winner();
        }
        (guard.discussion.clone(), phase)
    };

    if let Err(err) = store.save_discussion(discussion.to_entity(phase)).await {
        warn!(discussion_id = %id, error = %err, "failed to persist vote");
    }

    let tally = discussion.tally();
    sse_events::broadcast_vote_recorded(&room, tally);
    sse_events::broadcast_discussion_snapshot(&room, discussion.clone(), phase);

    Ok(CastVoteResponse {
        choice: request.choice,
        tally: tally.into(),
        winner: discussion.winner,
    })
}

/// Current ballot results for a discussion.
pub async fn vote_results(
    state: &SharedState,
    id: Uuid,
) -> Result<VoteResultsResponse, ServiceError> {
    let room = discussion_service::fetch_room(state, id).await?;
    let guard = room.state().read().await;
    let phase = room.phase().await;

    let open = if guard.discussion.mode.is_structured() {
        phase == DebatePhase::Voting
    } else {
        guard.discussion.status == DiscussionStatus::Ended
    };

    Ok(VoteResultsResponse {
        tally: guard.discussion.tally().into(),
        winner: guard.discussion.winner,
        open,
    })
}
