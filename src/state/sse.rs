use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// SSE-specific sub-state carved out from [`AppState`](crate::state::AppState).
///
/// Holds the lobby-wide hub; each discussion room carries its own
/// [`SseHub`] for events scoped to that room.
pub struct SseState {
    lobby: SseHub,
}

impl SseState {
    /// Build the SSE sub-tree with the lobby channel capacity.
    pub fn new(lobby_capacity: usize) -> Self {
        Self {
            lobby: SseHub::new(lobby_capacity),
        }
    }

    /// Access the lobby hub used to fan out discussion-list events.
    pub fn lobby(&self) -> &SseHub {
        &self.lobby
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
