use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{discussion_store::DiscussionStore, storage::StorageError},
    services::discussion_service,
    state::SharedState,
};

/// Shortest pause between retries; doubled up to [`BACKOFF_CEILING`].
const BACKOFF_FLOOR: Duration = Duration::from_secs(1);
const BACKOFF_CEILING: Duration = Duration::from_secs(10);
/// How often a healthy store is probed.
const PROBE_PERIOD: Duration = Duration::from_secs(5);
/// Reconnect attempts against a live handle before it is abandoned.
const RECOVERY_ATTEMPTS: u32 = 3;

/// Supervise the storage backend for the lifetime of the process.
///
/// Establishes the connection (retrying forever with backoff), installs the
/// handle into the shared state, rehydrates persisted discussions, then
/// probes health on a fixed period. A failed probe triggers a bounded
/// recovery; when recovery fails too, the handle is cleared so callers fail
/// fast, and the whole cycle starts over with a fresh connection.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn DiscussionStore>, StorageError>> + Send,
{
    loop {
        let store = establish(&state, &mut connect).await;
        watch(&state, &store).await;
        state.clear_store().await;
        warn!("storage handle abandoned; connecting from scratch");
    }
}

/// Retry the initial connection until it lands, then wire the store into the
/// shared state and bring persisted discussions back to life.
async fn establish<F, Fut>(state: &SharedState, connect: &mut F) -> Arc<dyn DiscussionStore>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<Arc<dyn DiscussionStore>, StorageError>> + Send,
{
    let mut pause = BACKOFF_FLOOR;
    loop {
        match connect().await {
            Ok(store) => {
                state.install_store(store.clone()).await;
                info!("storage online; leaving degraded mode");
                discussion_service::reconcile_store(state, &store).await;
                return store;
            }
            Err(err) => {
                warn!(error = %err, retry_in = ?pause, "could not reach storage");
                sleep(pause).await;
                pause = (pause * 2).min(BACKOFF_CEILING);
            }
        }
    }
}

/// Probe the store until it dies for good. Returns once bounded recovery has
/// been exhausted and the handle should be abandoned.
async fn watch(state: &SharedState, store: &Arc<dyn DiscussionStore>) {
    loop {
        if store.health_check().await.is_ok() {
            if state.is_degraded() {
                info!("storage healthy again; leaving degraded mode");
                state.set_degraded(false);
                discussion_service::flush_rooms(state, store).await;
            }
            sleep(PROBE_PERIOD).await;
            continue;
        }

        warn!("storage health probe failed; entering degraded mode");
        state.set_degraded(true);
        if !recover(store).await {
            return;
        }
        state.set_degraded(false);
        discussion_service::flush_rooms(state, store).await;
        sleep(PROBE_PERIOD).await;
    }
}

/// Drive the store's own reconnect a bounded number of times.
async fn recover(store: &Arc<dyn DiscussionStore>) -> bool {
    let mut pause = BACKOFF_FLOOR;
    for attempt in 1..=RECOVERY_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnect succeeded");
                return true;
            }
            Err(err) => {
                warn!(attempt, error = %err, "storage reconnect failed");
                if attempt < RECOVERY_ATTEMPTS {
                    sleep(pause).await;
                    pause = (pause * 2).min(BACKOFF_CEILING);
                }
            }
        }
    }
    false
}
