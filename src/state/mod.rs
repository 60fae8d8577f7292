pub mod discussion;
pub mod room;
mod sse;
pub mod state_machine;

use std::{sync::Arc, time::SystemTime};

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig, dao::discussion_store::DiscussionStore, error::ServiceError,
    state::room::Room,
};

pub use self::sse::SseHub;
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};
use self::sse::SseState;

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

const LOBBY_SSE_CAPACITY: usize = 16;

/// Authenticated user bound to an auth token.
#[derive(Debug, Clone)]
pub struct UserSession {
    /// Stable identifier of the user.
    pub user_id: Uuid,
    /// Unique display name.
    pub username: String,
    /// When the session was issued.
    pub created_at: SystemTime,
}

/// Owner of a claimed username, keeping the casing it was registered with.
#[derive(Debug, Clone)]
pub struct RegisteredUser {
    /// Stable identifier of the user.
    pub user_id: Uuid,
    /// Display name as originally registered.
    pub username: String,
}

/// Central application state: live rooms, sessions, and the storage handle.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn DiscussionStore>>>,
    sse: SseState,
    rooms: DashMap<Uuid, Arc<Room>>,
    sessions: DashMap<String, UserSession>,
    usernames: DashMap<String, RegisteredUser>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            store: RwLock::new(None),
            sse: SseState::new(LOBBY_SSE_CAPACITY),
            rooms: DashMap::new(),
            sessions: DashMap::new(),
            usernames: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration the server was started with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current discussion store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn DiscussionStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the store handle or fail because the application is degraded.
    pub async fn require_store(&self) -> Result<Arc<dyn DiscussionStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new discussion store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn DiscussionStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.set_degraded(false);
    }

    /// Remove the current discussion store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.set_degraded(true);
    }

    /// Current degraded flag.
    ///
    /// Tracks storage health rather than mere presence: the flag can be raised
    /// while a store handle is still installed but failing its health checks.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast hub used for the lobby SSE stream.
    pub fn lobby_sse(&self) -> &SseHub {
        self.sse.lobby()
    }

    /// Registry of live rooms keyed by discussion id.
    pub fn rooms(&self) -> &DashMap<Uuid, Arc<Room>> {
        &self.rooms
    }

    /// Look up the live room of a discussion.
    pub fn room(&self, id: Uuid) -> Option<Arc<Room>> {
        self.rooms.get(&id).map(|entry| entry.clone())
    }

    /// Register a live room, replacing any previous entry for the same id.
    pub fn insert_room(&self, room: Arc<Room>) {
        self.rooms.insert(room.id(), room);
    }

    /// Sessions keyed by auth token.
    pub fn sessions(&self) -> &DashMap<String, UserSession> {
        &self.sessions
    }

    /// Claimed usernames, keyed by their lowercased form.
    pub fn usernames(&self) -> &DashMap<String, RegisteredUser> {
        &self.usernames
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn set_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }
}
