use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::state::discussion::{VoteChoice, VoteTally};

/// Payload used by an observer to cast (or change) their final vote.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CastVoteRequest {
    pub choice: VoteChoice,
    /// Optional free-text justification shown with the results.
    #[serde(default)]
    #[validate(length(max = 500))]
    pub reasoning: Option<String>,
}

/// Aggregated vote counts exposed to REST/SSE clients.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct VoteTallySummary {
    pub pros: usize,
    pub cons: usize,
    pub draw: usize,
    pub total: usize,
}

impl From<VoteTally> for VoteTallySummary {
    fn from(tally: VoteTally) -> Self {
        Self {
            pros: tally.pros,
            cons: tally.cons,
            draw: tally.draw,
            total: tally.total(),
        }
    }
}

/// Acknowledgement returned after a vote has been recorded.
#[derive(Debug, Serialize, ToSchema)]
pub struct CastVoteResponse {
    /// The choice that is now on record for the voter.
    pub choice: VoteChoice,
    /// Tally including the recorded vote.
    pub tally: VoteTallySummary,
    /// Winner so far, when one can already be published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<VoteChoice>,
}

/// Current results of the final ballot.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoteResultsResponse {
    pub tally: VoteTallySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<VoteChoice>,
    /// Whether votes are currently being accepted.
    pub open: bool,
}
