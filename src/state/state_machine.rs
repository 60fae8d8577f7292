use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::discussion::{MessageKind, ParticipantRole};

/// Stages of a structured debate, in their fixed running order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    /// Lobby stage before the debate opens; participants assemble here.
    Waiting,
    /// Opening statement delivered by the pros team leader.
    OpeningPros,
    /// Opening statement delivered by the cons team leader.
    OpeningCons,
    /// Internal strategy round for the pros side.
    StrategyPros,
    /// Internal strategy round for the cons side.
    StrategyCons,
    /// Rebuttal round for the pros side.
    RebuttalPros,
    /// Rebuttal round for the cons side.
    RebuttalCons,
    /// Closing statement delivered by the pros team leader.
    ClosingPros,
    /// Closing statement delivered by the cons team leader.
    ClosingCons,
    /// Observers cast their final votes.
    Voting,
    /// Terminal stage; the debate is over.
    Ended,
}

impl DebatePhase {
    /// Next phase in the fixed order, or `None` once the debate has ended.
    pub fn successor(self) -> Option<DebatePhase> {
        match self {
            DebatePhase::Waiting => Some(DebatePhase::OpeningPros),
            DebatePhase::OpeningPros => Some(DebatePhase::OpeningCons),
            DebatePhase::OpeningCons => Some(DebatePhase::StrategyPros),
            DebatePhase::StrategyPros => Some(DebatePhase::StrategyCons),
            DebatePhase::StrategyCons => Some(DebatePhase::RebuttalPros),
            DebatePhase::RebuttalPros => Some(DebatePhase::RebuttalCons),
            DebatePhase::RebuttalCons => Some(DebatePhase::ClosingPros),
            DebatePhase::ClosingPros => Some(DebatePhase::ClosingCons),
            DebatePhase::ClosingCons => Some(DebatePhase::Voting),
            DebatePhase::Voting => Some(DebatePhase::Ended),
            DebatePhase::Ended => None,
        }
    }

    /// Whether this phase runs against a per-phase deadline.
    pub fn has_deadline(self) -> bool {
        !matches!(self, DebatePhase::Waiting | DebatePhase::Ended)
    }

    /// Whether a participant with the given role may author a message now.
    ///
    /// Opening and closing rounds are reserved for the side's team leader;
    /// strategy and rebuttal rounds accept any member of the side. Nobody
    /// posts while waiting, voting, or after the end.
    pub fn permits_author(self, role: ParticipantRole, team_leader: bool) -> bool {
        match self {
            DebatePhase::OpeningPros | DebatePhase::ClosingPros => {
                role == ParticipantRole::Pros && team_leader
            }
            DebatePhase::OpeningCons | DebatePhase::ClosingCons => {
                role == ParticipantRole::Cons && team_leader
            }
            DebatePhase::StrategyPros | DebatePhase::RebuttalPros => role == ParticipantRole::Pros,
            DebatePhase::StrategyCons | DebatePhase::RebuttalCons => role == ParticipantRole::Cons,
            DebatePhase::Waiting | DebatePhase::Voting | DebatePhase::Ended => false,
        }
    }

    /// Message kind recorded for contributions authored during this phase.
    pub fn message_kind(self) -> Option<MessageKind> {
        match self {
            DebatePhase::OpeningPros | DebatePhase::OpeningCons => Some(MessageKind::Opening),
            DebatePhase::StrategyPros | DebatePhase::StrategyCons => Some(MessageKind::Strategy),
            DebatePhase::RebuttalPros | DebatePhase::RebuttalCons => Some(MessageKind::Rebuttal),
            DebatePhase::ClosingPros | DebatePhase::ClosingCons => Some(MessageKind::Closing),
            DebatePhase::Waiting | DebatePhase::Voting | DebatePhase::Ended => None,
        }
    }
}

/// Who (or what) requested a phase advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceTrigger {
    /// The discussion creator advanced the debate by hand.
    Creator,
    /// The per-phase deadline elapsed and the scheduler advanced it.
    Deadline,
}

/// Events that can be applied to the debate state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Leave the waiting room and begin the first opening round.
    Open,
    /// Move to the next phase, provided the machine is still in `from`.
    ///
    /// Carrying the expected source phase makes every advance a
    /// compare-and-swap: a trigger computed against stale state is rejected
    /// instead of silently re-advancing.
    Advance {
        /// Phase the caller observed and expects to leave.
        from: DebatePhase,
        /// Origin of the advance request, kept for logging.
        trigger: AdvanceTrigger,
    },
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: DebatePhase,
    /// The event that cannot be applied from this phase.
    pub event: PhaseEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: DebatePhase,
        /// Current phase.
        actual: DebatePhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned phase transition.
pub type PlanId = Uuid;

/// A planned phase transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: DebatePhase,
    /// Phase the state machine will transition to.
    pub to: DebatePhase,
    /// Event that triggered this transition.
    pub event: PhaseEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: DebatePhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<DebatePhase>,
}

/// State machine driving a structured debate through its fixed phase order.
///
/// Transitions are two-step: `plan` validates the event and reserves the
/// machine, the caller persists whatever state the transition implies, and
/// `apply` commits (or `abort` releases) the reservation. A version counter
/// detects any interleaved change between the two steps.
#[derive(Debug, Clone)]
pub struct DebateStateMachine {
    phase: DebatePhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for DebateStateMachine {
    fn default() -> Self {
        Self {
            phase: DebatePhase::Waiting,
            version: 0,
            pending: None,
        }
    }
}

impl DebateStateMachine {
    /// Create a new state machine initialised in the waiting room.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a machine at a known phase, e.g. when rehydrating from storage.
    pub fn resume_at(phase: DebatePhase) -> Self {
        Self {
            phase,
            version: 0,
            pending: None,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> DebatePhase {
        self.phase
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: PhaseEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<DebatePhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        self.pending = None;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state machine to its previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: PhaseEvent) -> Result<DebatePhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (DebatePhase::Waiting, PhaseEvent::Open) => DebatePhase::OpeningPros,
            // Waiting is left through `Open` only; everything after that walks
            // the fixed order one step at a time.
            (DebatePhase::Waiting, PhaseEvent::Advance { .. }) => {
                return Err(InvalidTransition {
                    from: self.phase,
                    event,
                });
            }
            (current, PhaseEvent::Advance { from, .. }) if current == from => {
                match current.successor() {
                    Some(next) => next,
                    None => {
                        return Err(InvalidTransition {
                            from: self.phase,
                            event,
                        });
                    }
                }
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut DebateStateMachine, event: PhaseEvent) -> DebatePhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    fn advance_from(phase: DebatePhase) -> PhaseEvent {
        PhaseEvent::Advance {
            from: phase,
            trigger: AdvanceTrigger::Creator,
        }
    }

    #[test]
    fn initial_state_is_waiting() {
        let sm = DebateStateMachine::new();
        assert_eq!(sm.phase(), DebatePhase::Waiting);
    }

    #[test]
    fn full_walk_follows_the_fixed_order() {
        let mut sm = DebateStateMachine::new();
        assert_eq!(apply(&mut sm, PhaseEvent::Open), DebatePhase::OpeningPros);

        let expected = [
            DebatePhase::OpeningCons,
            DebatePhase::StrategyPros,
            DebatePhase::StrategyCons,
            DebatePhase::RebuttalPros,
            DebatePhase::RebuttalCons,
            DebatePhase::ClosingPros,
            DebatePhase::ClosingCons,
            DebatePhase::Voting,
            DebatePhase::Ended,
        ];

        for next in expected {
            let current = sm.phase();
            assert_eq!(apply(&mut sm, advance_from(current)), next);
        }

        assert_eq!(sm.phase(), DebatePhase::Ended);
    }

    #[test]
    fn stale_advance_is_rejected() {
        let mut sm = DebateStateMachine::new();
        apply(&mut sm, PhaseEvent::Open);
        apply(&mut sm, advance_from(DebatePhase::OpeningPros));

        // A second trigger computed against the phase that was already left
        // must not advance a further step.
        let err = sm.plan(advance_from(DebatePhase::OpeningPros)).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, DebatePhase::OpeningCons);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sm.phase(), DebatePhase::OpeningCons);
    }

    #[test]
    fn ended_is_terminal() {
        let mut sm = DebateStateMachine::resume_at(DebatePhase::Ended);
        let err = sm.plan(advance_from(DebatePhase::Ended)).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));
        assert_eq!(sm.phase(), DebatePhase::Ended);
    }

    #[test]
    fn advance_cannot_skip_the_waiting_room() {
        let mut sm = DebateStateMachine::new();
        let err = sm.plan(advance_from(DebatePhase::Waiting)).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));
    }

    #[test]
    fn open_is_only_valid_from_waiting() {
        let mut sm = DebateStateMachine::new();
        apply(&mut sm, PhaseEvent::Open);

        let err = sm.plan(PhaseEvent::Open).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, DebatePhase::OpeningPros);
                assert_eq!(invalid.event, PhaseEvent::Open);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn plan_reserves_the_machine_until_resolved() {
        let mut sm = DebateStateMachine::new();
        let plan = sm.plan(PhaseEvent::Open).unwrap();

        assert_eq!(sm.plan(PhaseEvent::Open).unwrap_err(), PlanError::AlreadyPending);

        sm.abort(plan.id).unwrap();
        assert_eq!(sm.snapshot().pending, None);
        assert_eq!(sm.phase(), DebatePhase::Waiting);
    }

    #[test]
    fn apply_with_wrong_plan_id_keeps_the_plan_pending() {
        let mut sm = DebateStateMachine::new();
        let plan = sm.plan(PhaseEvent::Open).unwrap();

        let err = sm.apply(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApplyError::IdMismatch { .. }));

        // The original plan is still live and can be committed.
        assert_eq!(sm.apply(plan.id).unwrap(), DebatePhase::OpeningPros);
    }

    #[test]
    fn version_counts_every_transition() {
        let mut sm = DebateStateMachine::new();
        assert_eq!(sm.snapshot().version, 0);
        apply(&mut sm, PhaseEvent::Open);
        apply(&mut sm, advance_from(DebatePhase::OpeningPros));
        assert_eq!(sm.snapshot().version, 2);
    }

    #[test]
    fn leader_gate_covers_opening_and_closing_rounds() {
        for phase in [DebatePhase::OpeningPros, DebatePhase::ClosingPros] {
            assert!(phase.permits_author(ParticipantRole::Pros, true));
            assert!(!phase.permits_author(ParticipantRole::Pros, false));
            assert!(!phase.permits_author(ParticipantRole::Cons, true));
        }

        for phase in [DebatePhase::OpeningCons, DebatePhase::ClosingCons] {
            assert!(phase.permits_author(ParticipantRole::Cons, true));
            assert!(!phase.permits_author(ParticipantRole::Cons, false));
            assert!(!phase.permits_author(ParticipantRole::Pros, true));
        }
    }

    #[test]
    fn side_rounds_accept_any_member_of_the_side() {
        for phase in [DebatePhase::StrategyPros, DebatePhase::RebuttalPros] {
            assert!(phase.permits_author(ParticipantRole::Pros, false));
            assert!(phase.permits_author(ParticipantRole::Pros, true));
            assert!(!phase.permits_author(ParticipantRole::Cons, false));
        }

        for phase in [DebatePhase::StrategyCons, DebatePhase::RebuttalCons] {
            assert!(phase.permits_author(ParticipantRole::Cons, false));
            assert!(!phase.permits_author(ParticipantRole::Pros, true));
        }
    }

    #[test]
    fn nobody_posts_outside_the_debate_rounds() {
        for phase in [DebatePhase::Waiting, DebatePhase::Voting, DebatePhase::Ended] {
            for role in [
                ParticipantRole::Pros,
                ParticipantRole::Cons,
                ParticipantRole::Participant,
            ] {
                assert!(!phase.permits_author(role, true));
                assert!(!phase.permits_author(role, false));
            }
        }
    }
}
