use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::DiscussionEntity,
    error::ServiceError,
    state::{
        discussion::{Discussion, Message},
        sse::SseHub,
        state_machine::{
            AbortError, ApplyError, DebatePhase, DebateStateMachine, PhaseEvent, Plan, PlanError,
            PlanId, Snapshot,
        },
    },
};

/// Upper bound on how long transition work may run before the planned
/// transition is aborted.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

const ROOM_SSE_CAPACITY: usize = 16;

/// Mutable contents of a room: the discussion aggregate and its message log.
pub struct RoomState {
    /// The discussion aggregate.
    pub discussion: Discussion,
    /// Accepted messages in send order.
    pub messages: Vec<Message>,
}

/// Live counterpart of one discussion.
///
/// Owns the authoritative state machine for the discussion's phase, the lock
/// that serializes transitions, the room-scoped SSE hub, and the handle of
/// the at-most-one timer task scheduled for the room.
pub struct Room {
    id: Uuid,
    state: RwLock<RoomState>,
    machine: RwLock<DebateStateMachine>,
    sse: SseHub,
    transition_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Room {
    /// Wrap a freshly created discussion; the machine starts in the waiting
    /// room.
    pub fn new(discussion: Discussion) -> Arc<Self> {
        Self::with_machine(discussion, DebateStateMachine::new(), Vec::new())
    }

    /// Rebuild a room from persisted state, resuming the machine at the
    /// stored phase.
    pub fn resume(discussion: Discussion, phase: DebatePhase, messages: Vec<Message>) -> Arc<Self> {
        Self::with_machine(discussion, DebateStateMachine::resume_at(phase), messages)
    }

    fn with_machine(
        discussion: Discussion,
        machine: DebateStateMachine,
        messages: Vec<Message>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: discussion.id,
            state: RwLock::new(RoomState {
                discussion,
                messages,
            }),
            machine: RwLock::new(machine),
            sse: SseHub::new(ROOM_SSE_CAPACITY),
            transition_gate: Mutex::new(()),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
            timer: Mutex::new(None),
        })
    }

    /// Identifier of the discussion this room wraps.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Mutable room contents; callers take the read or write half as needed.
    pub fn state(&self) -> &RwLock<RoomState> {
        &self.state
    }

    /// Broadcast hub scoped to this room.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Current phase of the room's state machine.
    pub async fn phase(&self) -> DebatePhase {
        self.machine.read().await.phase()
    }

    /// Snapshot of the machine including its version counter.
    pub async fn snapshot(&self) -> Snapshot {
        self.machine.read().await.snapshot()
    }

    /// Build the storage entity for the room's discussion at its live phase.
    pub async fn to_entity(&self) -> DiscussionEntity {
        let phase = self.phase().await;
        let state = self.state.read().await;
        state.discussion.to_entity(phase)
    }

    /// Install the room's timer task, aborting any previously scheduled one
    /// so at most one timer ever runs per room.
    pub async fn arm_timer(&self, handle: JoinHandle<()>) {
        let mut guard = self.timer.lock().await;
        if let Some(previous) = guard.replace(handle) {
            previous.abort();
        }
    }

    /// Cancel the room's timer task, if any.
    pub async fn disarm_timer(&self) {
        let mut guard = self.timer.lock().await;
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }

    async fn plan_transition(&self, event: PhaseEvent) -> Result<Plan, PlanError> {
        let mut machine = self.machine.write().await;
        machine.plan(event)
    }

    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<DebatePhase, ApplyError> {
        let mut machine = self.machine.write().await;
        machine.apply(plan_id)
    }

    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut machine = self.machine.write().await;
        machine.abort(plan_id)
    }

    /// Run a phase transition: plan it, execute the side-effecting work, then
    /// apply. The gate serializes concurrent transitions; a timeout or work
    /// error aborts the plan and leaves the phase untouched.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: PhaseEvent,
        work: F,
    ) -> Result<(T, DebatePhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let Plan { id: plan_id, .. } = self.plan_transition(event).await?;

        let work_future = work();
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(abort_err) = self.abort_transition(plan_id).await {
                        warn!(
                            discussion_id = %self.id,
                            event = ?event,
                            plan_id = %plan_id,
                            error = ?abort_err,
                            "failed to abort transition after timeout"
                        );
                    }
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        discussion_id = %self.id,
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use indexmap::IndexMap;

    use super::*;
    use crate::state::{
        discussion::{DebateMode, DiscussionKind, DiscussionStatus},
        state_machine::AdvanceTrigger,
    };

    fn sample_discussion() -> Discussion {
        Discussion {
            id: Uuid::new_v4(),
            title: "motion".into(),
            description: "motion under test".into(),
            category: "society".into(),
            kind: DiscussionKind::ProsCons,
            status: DiscussionStatus::Waiting,
            created_by: Uuid::new_v4(),
            creator_name: "creator".into(),
            created_at: SystemTime::now(),
            started_at: None,
            ended_at: None,
            allow_observers: true,
            max_participants: None,
            mode: DebateMode::Structured {
                phase_minutes: 5,
                phase_started_at: None,
            },
            participants: IndexMap::new(),
            observers: IndexMap::new(),
            votes: IndexMap::new(),
            winner: None,
        }
    }

    #[tokio::test]
    async fn successful_work_commits_the_transition() {
        let room = Room::new(sample_discussion());

        let (value, next) = room
            .run_transition(PhaseEvent::Open, || async { Ok::<_, ServiceError>(42) })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(next, DebatePhase::OpeningPros);
        assert_eq!(room.phase().await, DebatePhase::OpeningPros);
    }

    #[tokio::test]
    async fn failed_work_leaves_the_phase_untouched() {
        let room = Room::new(sample_discussion());

        let result = room
            .run_transition(PhaseEvent::Open, || async {
                Err::<(), _>(ServiceError::InvalidInput("nope".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(room.phase().await, DebatePhase::Waiting);
        // The aborted plan does not block the next attempt.
        room.run_transition(PhaseEvent::Open, || async { Ok::<_, ServiceError>(()) })
            .await
            .unwrap();
        assert_eq!(room.phase().await, DebatePhase::OpeningPros);
    }

    #[tokio::test]
    async fn stale_trigger_is_rejected_without_side_effects() {
        let room = Room::new(sample_discussion());
        room.run_transition(PhaseEvent::Open, || async { Ok::<_, ServiceError>(()) })
            .await
            .unwrap();

        // A deadline computed against the waiting room arrives after the
        // debate already opened.
        let stale = PhaseEvent::Advance {
            from: DebatePhase::Waiting,
            trigger: AdvanceTrigger::Deadline,
        };
        let result = room
            .run_transition(stale, || async { Ok::<_, ServiceError>(()) })
            .await;

        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
        assert_eq!(room.phase().await, DebatePhase::OpeningPros);
    }

    #[tokio::test]
    async fn arming_a_second_timer_aborts_the_first() {
        let room = Room::new(sample_discussion());

        let first = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        room.arm_timer(first).await;

        let second = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        room.arm_timer(second).await;

        let guard = room.timer.lock().await;
        let current = guard.as_ref().unwrap();
        assert!(!current.is_finished());
        drop(guard);

        room.disarm_timer().await;
        assert!(room.timer.lock().await.is_none());
    }
}
