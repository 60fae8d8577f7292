use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::{
        discussion::DiscussionResponse,
        sse::{DiscussionSnapshotEvent, Handshake, ServerEvent},
    },
    services::{sse_events, sse_events::EVENT_DISCUSSION_SNAPSHOT},
    state::{SharedState, room::Room},
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Relay storage degradation flips to every connected SSE client.
///
/// Runs until the application state is dropped.
pub async fn watch_degraded(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    while watcher.changed().await.is_ok() {
        let degraded = *watcher.borrow_and_update();
        sse_events::broadcast_system_status(&state, degraded);
    }
}

/// Subscribe to the shared lobby SSE stream.
pub fn subscribe_lobby(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.lobby_sse().subscribe()
}

/// Subscribe to the SSE stream of one discussion room.
pub fn subscribe_room(room: &Room) -> broadcast::Receiver<ServerEvent> {
    room.sse().subscribe()
}

/// Identifies the target SSE stream so we can log stream-specific context
/// when the connection is torn down.
#[derive(Clone)]
pub enum StreamKind {
    Lobby,
    Room(Uuid),
}

/// Greeting events pushed to a lobby subscriber before live traffic starts.
pub fn lobby_greeting(state: &SharedState) -> Vec<ServerEvent> {
    let handshake = Handshake {
        stream: "lobby".to_string(),
        message: "connected to the lobby stream".to_string(),
        degraded: state.is_degraded(),
    };

    greeting_event(EVENT_HANDSHAKE, &handshake)
        .into_iter()
        .collect()
}

/// Greeting events pushed to a room subscriber: the handshake followed by a
/// full snapshot of the discussion, so late subscribers do not need a
/// separate fetch to catch up.
pub async fn room_greeting(state: &SharedState, room: &Arc<Room>) -> Vec<ServerEvent> {
    let phase = room.phase().await;
    let discussion = room.state().read().await.discussion.clone();

    let handshake = Handshake {
        stream: "discussion".to_string(),
        message: "connected to the discussion stream".to_string(),
        degraded: state.is_degraded(),
    };
    let snapshot = DiscussionSnapshotEvent(DiscussionResponse::from((discussion, phase)));

    greeting_event(EVENT_HANDSHAKE, &handshake)
        .into_iter()
        .chain(greeting_event(EVENT_DISCUSSION_SNAPSHOT, &snapshot))
        .collect()
}

/// Convert a broadcast receiver into an SSE response, pushing the greeting
/// events first, then forwarding live events until the client disconnects.
pub fn to_sse_stream(
    greeting: Vec<ServerEvent>,
    mut receiver: broadcast::Receiver<ServerEvent>,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: drains the greeting, then reads from broadcast and
    // pushes into mpsc
    tokio::spawn(async move {
        let mut live = true;
        for payload in greeting {
            if tx.send(Ok(render(payload))).await.is_err() {
                live = false;
                break;
            }
        }

        while live {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(render(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        match kind {
            StreamKind::Lobby => tracing::info!("Lobby SSE stream disconnected"),
            StreamKind::Room(id) => {
                tracing::info!(discussion_id = %id, "Discussion SSE stream disconnected")
            }
        }
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn render(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

fn greeting_event(name: &str, payload: &impl serde::Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(name.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::warn!(event = name, error = %err, "failed to serialize SSE greeting");
            None
        }
    }
}
