//! Deadline scheduling for discussion rooms.
//!
//! Each room carries at most one timer task. For structured debates the task
//! sleeps until the current phase deadline and advances the state machine,
//! then keeps watching the next phase; for single-timer discussions it ends
//! the discussion once the overall limit elapses. A trigger that loses the
//! compare-and-swap (because the creator advanced first) is dropped and the
//! task simply re-reads the current phase.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    time::{Duration, SystemTime},
};

use tracing::warn;

use crate::{
    error::ServiceError,
    services::discussion_service,
    state::{SharedState, discussion::DiscussionStatus, room::Room},
};

const RETRY_INITIAL_DELAY: Duration = Duration::from_secs(1);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Replace the room's timer task with a fresh one watching the current
/// deadline. The previous task, if any, is aborted.
pub async fn arm(state: &SharedState, room: &Arc<Room>) {
    let state = state.clone();
    let watched = room.clone();
    let handle = tokio::spawn(async move {
        run(state, watched).await;
    });
    room.arm_timer(handle).await;
}

// Boxed so the `run` -> `advance_room` -> `arm` -> `run` cycle has a
// type-erased point where the compiler can resolve `Send`.
fn run(state: SharedState, room: Arc<Room>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        let mut retry_delay = RETRY_INITIAL_DELAY;

        loop {
            let phase = room.phase().await;
            let (deadline, structured, status) = {
                let guard = room.state().read().await;
                (
                    guard.discussion.deadline_at(phase),
                    guard.discussion.mode.is_structured(),
                    guard.discussion.status,
                )
            };

            if status != DiscussionStatus::Active {
                break;
            }
            let Some(deadline) = deadline else {
                break;
            };

            let wait = deadline
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            let outcome = if structured {
                discussion_service::advance_for_deadline(&state, &room, phase).await
            } else {
                discussion_service::end_for_deadline(&state, &room).await
            };

            match outcome {
                Ok(()) => {
                    retry_delay = RETRY_INITIAL_DELAY;
                }
                // Lost the compare-and-swap: the phase moved (or the discussion
                // ended) while we slept. Re-read and keep watching.
                Err(ServiceError::InvalidState(_)) => {
                    retry_delay = RETRY_INITIAL_DELAY;
                }
                Err(
                    ServiceError::Degraded | ServiceError::Unavailable(_) | ServiceError::Timeout,
                ) => {
                    warn!(
                        discussion_id = %room.id(),
                        retry_in = ?retry_delay,
                        "deadline transition could not be persisted, retrying"
                    );
                    tokio::time::sleep(retry_delay).await;
                    retry_delay = (retry_delay * 2).min(RETRY_MAX_DELAY);
                }
                Err(err) => {
                    warn!(
                        discussion_id = %room.id(),
                        error = %err,
                        "deadline transition failed, stopping the timer"
                    );
                    break;
                }
            }
        }
    })
}
