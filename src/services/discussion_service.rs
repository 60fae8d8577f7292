//! Lifecycle of discussions: creation, roster changes, phase progression and
//! reconciliation with the storage backend.
//!
//! Rooms are authoritative while the process lives; the store mirrors their
//! latest snapshot. Phase transitions persist before they commit, so a
//! discussion can always be resumed from storage at the phase it last
//! reached.

use std::{sync::Arc, time::SystemTime};

use dashmap::Entry;
use indexmap::IndexMap;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{
        discussion_store::DiscussionStore,
        models::{DiscussionListItemEntity, MessageEntity},
    },
    dto::discussion::{
        CreateDiscussionRequest, DiscussionResponse, DiscussionSummary, JoinDiscussionRequest,
    },
    error::ServiceError,
    services::{phase_timer, sse_events},
    state::{
        SharedState, UserSession,
        discussion::{DebateMode, Discussion, DiscussionKind, DiscussionStatus, Message},
        room::Room,
        state_machine::{AdvanceTrigger, DebatePhase, PhaseEvent},
    },
};

/// Open a new discussion and register its live room.
pub async fn create_discussion(
    state: &SharedState,
    session: &UserSession,
    request: CreateDiscussionRequest,
) -> Result<DiscussionResponse, ServiceError> {
    let discussion = build_discussion(state, session, request)?;
    let entity = discussion.to_entity(DebatePhase::Waiting);

    let store = state.require_store().await?;
    store.save_discussion(entity.clone()).await?;

    let response = DiscussionResponse::from((discussion.clone(), DebatePhase::Waiting));
    state.insert_room(Room::new(discussion));
    sse_events::broadcast_lobby_updated(state, &entity);

    Ok(response)
}

/// List every known discussion, newest first.
///
/// Live rooms win over their stored snapshot; a stored discussion with no
/// room (from a previous process run) is listed as persisted. Storage
/// trouble degrades the listing to live rooms instead of failing it.
pub async fn list_discussions(state: &SharedState) -> Vec<DiscussionSummary> {
    let mut items: IndexMap<Uuid, DiscussionListItemEntity> = IndexMap::new();

    if let Some(store) = state.store().await {
        match store.list_discussions().await {
            Ok(listed) => {
                for item in listed {
                    items.insert(item.id, item);
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to list stored discussions; serving live rooms only");
            }
        }
    }

    let rooms: Vec<Arc<Room>> = state
        .rooms()
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    for room in rooms {
        let entity = room.to_entity().await;
        items.insert(entity.id, DiscussionListItemEntity::from(entity));
    }

    let mut listed: Vec<_> = items.into_values().collect();
    listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    listed.into_iter().map(DiscussionSummary::from).collect()
}

/// Fetch the full projection of one discussion.
pub async fn get_discussion(
    state: &SharedState,
    id: Uuid,
) -> Result<DiscussionResponse, ServiceError> {
    let room = fetch_room(state, id).await?;
    Ok(room_response(&room).await)
}

/// Take a seat on one side of the discussion.
pub async fn join_discussion(
    state: &SharedState,
    session: &UserSession,
    id: Uuid,
    request: JoinDiscussionRequest,
) -> Result<DiscussionResponse, ServiceError> {
    let room = fetch_room(state, id).await?;
    let store = state.require_store().await?;

    let discussion = {
        let mut guard = room.state().write().await;
        guard.discussion.admit(
            session.user_id,
            session.username.clone(),
            request.role,
            SystemTime::now(),
        )?;
        guard.discussion.clone()
    };

    let phase = room.phase().await;
    mirror_discussion(&store, &discussion, phase).await;

    let entity = discussion.to_entity(phase);
    sse_events::broadcast_discussion_snapshot(&room, discussion.clone(), phase);
    sse_events::broadcast_lobby_updated(state, &entity);

    Ok(DiscussionResponse::from((discussion, phase)))
}

/// Join the observer gallery of the discussion.
pub async fn observe_discussion(
    state: &SharedState,
    session: &UserSession,
    id: Uuid,
) -> Result<DiscussionResponse, ServiceError> {
    let room = fetch_room(state, id).await?;
    let store = state.require_store().await?;

    let discussion = {
        let mut guard = room.state().write().await;
        guard
            .discussion
            .observe(session.user_id, session.username.clone(), SystemTime::now())?;
        guard.discussion.clone()
    };

    let phase = room.phase().await;
    mirror_discussion(&store, &discussion, phase).await;

    let entity = discussion.to_entity(phase);
    sse_events::broadcast_discussion_snapshot(&room, discussion.clone(), phase);
    sse_events::broadcast_lobby_updated(state, &entity);

    Ok(DiscussionResponse::from((discussion, phase)))
}

/// Start the discussion: structured debates open their first phase, the
/// other formats just flip to active and start their overall timer.
pub async fn start_discussion(
    state: &SharedState,
    session: &UserSession,
    id: Uuid,
) -> Result<DiscussionResponse, ServiceError> {
    let room = fetch_room(state, id).await?;
    let store = state.require_store().await?;

    let structured = {
        let guard = room.state().read().await;
        if guard.discussion.created_by != session.user_id {
            return Err(ServiceError::Unauthorized(
                "only the creator may start the discussion".into(),
            ));
        }
        if !guard.discussion.roster_ready() {
            return Err(ServiceError::InvalidState(
                "the roster is not complete yet".into(),
            ));
        }
        guard.discussion.mode.is_structured()
    };

    let (discussion, phase) = if structured {
        room.run_transition(PhaseEvent::Open, || async {
            let mut guard = room.state().write().await;
            let now = SystemTime::now();
            let mut updated = guard.discussion.clone();
            updated.status = DiscussionStatus::Active;
            updated.started_at = Some(now);
            if let DebateMode::Structured {
                phase_started_at, ..
            } = &mut updated.mode
            {
                *phase_started_at = Some(now);
            }
            store
                .save_discussion(updated.to_entity(DebatePhase::OpeningPros))
                .await?;
            guard.discussion = updated.clone();
            Ok(updated)
        })
        .await?
    } else {
        let mut guard = room.state().write().await;
        if guard.discussion.status != DiscussionStatus::Waiting {
            return Err(ServiceError::InvalidState(
                "discussion has already started".into(),
            ));
        }
        let mut updated = guard.discussion.clone();
        updated.status = DiscussionStatus::Active;
        updated.started_at = Some(SystemTime::now());
        store
            .save_discussion(updated.to_entity(DebatePhase::Waiting))
            .await?;
        guard.discussion = updated.clone();
        drop(guard);
        (updated, DebatePhase::Waiting)
    };

    phase_timer::arm(state, &room).await;
    announce_lifecycle(state, &room, &discussion, phase);

    Ok(DiscussionResponse::from((discussion, phase)))
}

/// Advance a structured debate to its next phase on the creator's request.
pub async fn advance_discussion(
    state: &SharedState,
    session: &UserSession,
    id: Uuid,
) -> Result<DiscussionResponse, ServiceError> {
    let room = fetch_room(state, id).await?;

    {
        let guard = room.state().read().await;
        if guard.discussion.created_by != session.user_id {
            return Err(ServiceError::Unauthorized(
                "only the creator may advance the debate".into(),
            ));
        }
        if !guard.discussion.mode.is_structured() {
            return Err(ServiceError::InvalidState(
                "this discussion has no phases to advance".into(),
            ));
        }
    }

    let from = room.phase().await;
    let (discussion, phase) = advance_room(state, &room, from, AdvanceTrigger::Creator).await?;
    Ok(DiscussionResponse::from((discussion, phase)))
}

/// End a single-timer discussion on the creator's request. Structured
/// debates cannot be cut short: they end by walking through their phases.
pub async fn end_discussion(
    state: &SharedState,
    session: &UserSession,
    id: Uuid,
) -> Result<DiscussionResponse, ServiceError> {
    let room = fetch_room(state, id).await?;
    let store = state.require_store().await?;

    {
        let guard = room.state().read().await;
        if guard.discussion.created_by != session.user_id {
            return Err(ServiceError::Unauthorized(
                "only the creator may end the discussion".into(),
            ));
        }
        if guard.discussion.mode.is_structured() {
            return Err(ServiceError::InvalidState(
                "a structured debate ends through its final phase".into(),
            ));
        }
    }

    let (discussion, phase) = end_legacy(&room, &store).await?;
    room.disarm_timer().await;

    announce_lifecycle(state, &room, &discussion, phase);
    Ok(DiscussionResponse::from((discussion, phase)))
}

/// Deadline-triggered advance, called by the room's timer task. Performs
/// exactly the same mutation as a creator advance; a stale trigger loses the
/// compare-and-swap and reports an invalid state.
pub async fn advance_for_deadline(
    state: &SharedState,
    room: &Arc<Room>,
    from: DebatePhase,
) -> Result<(), ServiceError> {
    advance_room(state, room, from, AdvanceTrigger::Deadline)
        .await
        .map(|_| ())
}

/// Deadline-triggered end of a single-timer discussion.
pub async fn end_for_deadline(state: &SharedState, room: &Arc<Room>) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let (discussion, phase) = end_legacy(room, &store).await?;
    announce_lifecycle(state, room, &discussion, phase);
    Ok(())
}

/// Resolve the live room for a discussion, rebuilding it from storage when
/// this process has not touched the discussion yet.
pub async fn fetch_room(state: &SharedState, id: Uuid) -> Result<Arc<Room>, ServiceError> {
    if let Some(room) = state.room(id) {
        return Ok(room);
    }

    let store = state.require_store().await?;
    hydrate_room(state, &store, id).await
}

/// Mirror every live room into the store. Called after a reconnect so the
/// backend catches up with mutations accepted while it was unreachable.
pub async fn flush_rooms(state: &SharedState, store: &Arc<dyn DiscussionStore>) {
    let rooms: Vec<Arc<Room>> = state
        .rooms()
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    for room in rooms {
        let entity = room.to_entity().await;
        let messages = room.state().read().await.messages.clone();
        let id = entity.id;

        if let Err(err) = store.save_discussion(entity).await {
            warn!(discussion_id = %id, error = %err, "failed to flush discussion snapshot");
            continue;
        }
        for message in messages {
            if let Err(err) = store.save_message(MessageEntity::from(message)).await {
                warn!(discussion_id = %id, error = %err, "failed to flush message");
            }
        }
    }
}

/// Bring rooms and store back in line after (re)connecting: push live rooms
/// out, then rebuild rooms for stored discussions that still need their
/// timers running.
pub async fn reconcile_store(state: &SharedState, store: &Arc<dyn DiscussionStore>) {
    flush_rooms(state, store).await;

    let listed = match store.list_discussions().await {
        Ok(listed) => listed,
        Err(err) => {
            warn!(error = %err, "failed to list stored discussions during reconciliation");
            return;
        }
    };

    for item in listed {
        if item.status == DiscussionStatus::Ended || state.room(item.id).is_some() {
            continue;
        }
        if let Err(err) = hydrate_room(state, store, item.id).await {
            warn!(discussion_id = %item.id, error = %err, "failed to rehydrate discussion");
        }
    }
}

/// Project the room's current state into the REST/SSE response shape.
pub async fn room_response(room: &Arc<Room>) -> DiscussionResponse {
    let phase = room.phase().await;
    let discussion = room.state().read().await.discussion.clone();
    DiscussionResponse::from((discussion, phase))
}

fn build_discussion(
    state: &SharedState,
    session: &UserSession,
    request: CreateDiscussionRequest,
) -> Result<Discussion, ServiceError> {
    let CreateDiscussionRequest {
        title,
        description,
        category,
        kind,
        time_limit_minutes,
        max_participants,
        allow_observers,
    } = request;

    if title.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "discussion title must not be empty".into(),
        ));
    }
    if !state.config().is_known_category(&category) {
        return Err(ServiceError::InvalidInput(format!(
            "unknown category `{category}`"
        )));
    }

    let mode = match kind {
        DiscussionKind::ProsCons => DebateMode::Structured {
            phase_minutes: time_limit_minutes
                .unwrap_or_else(|| state.config().default_phase_minutes()),
            phase_started_at: None,
        },
        DiscussionKind::Free | DiscussionKind::OneOnOne => DebateMode::Legacy {
            time_minutes: time_limit_minutes,
        },
    };

    Ok(Discussion {
        id: Uuid::new_v4(),
        title,
        description,
        category,
        kind,
        status: DiscussionStatus::Waiting,
        created_by: session.user_id,
        creator_name: session.username.clone(),
        created_at: SystemTime::now(),
        started_at: None,
        ended_at: None,
        allow_observers,
        max_participants,
        mode,
        participants: IndexMap::new(),
        observers: IndexMap::new(),
        votes: IndexMap::new(),
        winner: None,
    })
}

async fn hydrate_room(
    state: &SharedState,
    store: &Arc<dyn DiscussionStore>,
    id: Uuid,
) -> Result<Arc<Room>, ServiceError> {
    let Some(entity) = store.find_discussion(id).await? else {
        return Err(ServiceError::NotFound(format!(
            "discussion `{id}` not found"
        )));
    };
    let messages = store
        .list_messages(id)
        .await?
        .into_iter()
        .map(Message::from)
        .collect();

    let (discussion, phase) = Discussion::from_entity(entity);
    let active = discussion.status == DiscussionStatus::Active;
    let room = Room::resume(discussion, phase, messages);

    // A concurrent request may have hydrated the same discussion already;
    // keep the registered room in that case so its timer stays unique.
    let (room, fresh) = match state.rooms().entry(id) {
        Entry::Occupied(entry) => (entry.get().clone(), false),
        Entry::Vacant(slot) => {
            slot.insert(room.clone());
            (room, true)
        }
    };
    if fresh && active {
        phase_timer::arm(state, &room).await;
    }

    Ok(room)
}

/// Shared mutation for creator- and deadline-triggered advances.
async fn advance_room(
    state: &SharedState,
    room: &Arc<Room>,
    from: DebatePhase,
    trigger: AdvanceTrigger,
) -> Result<(Discussion, DebatePhase), ServiceError> {
    let store = state.require_store().await?;
    let target = from
        .successor()
        .ok_or_else(|| ServiceError::InvalidState(format!("no phase follows `{from:?}`")))?;

    let (discussion, phase) = room
        .run_transition(PhaseEvent::Advance { from, trigger }, || async {
            let mut guard = room.state().write().await;
            let mut updated = if target == DebatePhase::Ended {
                finish_discussion(&guard.discussion)
            } else {
                guard.discussion.clone()
            };
            if let DebateMode::Structured {
                phase_started_at, ..
            } = &mut updated.mode
            {
                *phase_started_at = Some(SystemTime::now());
            }
            store.save_discussion(updated.to_entity(target)).await?;
            guard.discussion = updated.clone();
            Ok(updated)
        })
        .await?;

    match trigger {
        AdvanceTrigger::Creator => {
            if phase == DebatePhase::Ended {
                room.disarm_timer().await;
            } else {
                phase_timer::arm(state, room).await;
            }
        }
        // The timer loop that fired this advance re-reads the phase on its
        // own and either keeps waiting or exits.
        AdvanceTrigger::Deadline => {}
    }

    announce_lifecycle(state, room, &discussion, phase);
    Ok((discussion, phase))
}

async fn end_legacy(
    room: &Arc<Room>,
    store: &Arc<dyn DiscussionStore>,
) -> Result<(Discussion, DebatePhase), ServiceError> {
    let mut guard = room.state().write().await;
    match guard.discussion.status {
        DiscussionStatus::Ended => {
            return Err(ServiceError::InvalidState(
                "discussion is already over".into(),
            ));
        }
        DiscussionStatus::Waiting => {
            return Err(ServiceError::InvalidState(
                "discussion has not started".into(),
            ));
        }
        DiscussionStatus::Active => {}
    }

    let updated = finish_discussion(&guard.discussion);
    let phase = room.phase().await;
    store.save_discussion(updated.to_entity(phase)).await?;
    guard.discussion = updated.clone();

    Ok((updated, phase))
}

/// Clone the discussion with its terminal bookkeeping applied.
fn finish_discussion(discussion: &Discussion) -> Discussion {
    let mut updated = discussion.clone();
    updated.status = DiscussionStatus::Ended;
    updated.ended_at = Some(SystemTime::now());
    updated.winner = updated.tally().winner();
    updated
}

/// Best-effort mirror of a roster change; the room stays authoritative if
/// the write fails and the supervisor re-flushes after reconnecting.
async fn mirror_discussion(
    store: &Arc<dyn DiscussionStore>,
    discussion: &Discussion,
    phase: DebatePhase,
) {
    if let Err(err) = store.save_discussion(discussion.to_entity(phase)).await {
        warn!(discussion_id = %discussion.id, error = %err, "failed to persist roster change");
    }
}

fn announce_lifecycle(
    state: &SharedState,
    room: &Room,
    discussion: &Discussion,
    phase: DebatePhase,
) {
    let entity = discussion.to_entity(phase);
    sse_events::broadcast_phase_changed(state, room, discussion, phase);
    sse_events::broadcast_discussion_snapshot(room, discussion.clone(), phase);
    sse_events::broadcast_lobby_updated(state, &entity);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::discussion_store::memory::MemoryDiscussionStore,
        state::{AppState, discussion::ParticipantRole},
    };

    fn session(name: &str) -> UserSession {
        UserSession {
            user_id: Uuid::new_v4(),
            username: name.to_string(),
            created_at: SystemTime::now(),
        }
    }

    async fn ready_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_store(Arc::new(MemoryDiscussionStore::new()))
            .await;
        state
    }

    fn pros_cons_request() -> CreateDiscussionRequest {
        CreateDiscussionRequest {
            title: "Ban combustion cars by 2035".into(),
            description: "Municipal motion up for debate".into(),
            category: "politics".into(),
            kind: DiscussionKind::ProsCons,
            time_limit_minutes: Some(5),
            max_participants: None,
            allow_observers: true,
        }
    }

    fn free_request(limit: Option<u32>) -> CreateDiscussionRequest {
        CreateDiscussionRequest {
            title: "Open floor on urban gardening".into(),
            description: String::new(),
            category: "society".into(),
            kind: DiscussionKind::Free,
            time_limit_minutes: limit,
            max_participants: None,
            allow_observers: true,
        }
    }

    /// Create a pros/cons debate with one debater seated on each side.
    async fn seated_debate(state: &SharedState) -> (UserSession, Uuid) {
        let creator = session("creator");
        let created = create_discussion(state, &creator, pros_cons_request())
            .await
            .unwrap();

        join_discussion(
            state,
            &session("pros-lead"),
            created.id,
            JoinDiscussionRequest {
                role: ParticipantRole::Pros,
            },
        )
        .await
        .unwrap();
        join_discussion(
            state,
            &session("cons-lead"),
            created.id,
            JoinDiscussionRequest {
                role: ParticipantRole::Cons,
            },
        )
        .await
        .unwrap();

        (creator, created.id)
    }

    /// Let spawned tasks (timers, transitions) run to their next suspension.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn creating_a_discussion_registers_a_live_room() {
        let state = ready_state().await;
        let creator = session("creator");

        let created = create_discussion(&state, &creator, pros_cons_request())
            .await
            .unwrap();

        assert_eq!(created.status, DiscussionStatus::Waiting);
        assert_eq!(created.phase, Some(DebatePhase::Waiting));
        assert_eq!(created.phase_minutes, Some(5));
        assert!(created.deadline.is_none());
        assert!(state.room(created.id).is_some());

        let store = state.store().await.unwrap();
        let stored = store.find_discussion(created.id).await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn creation_requires_a_known_category() {
        let state = ready_state().await;
        let mut request = pros_cons_request();
        request.category = "astrology".into();

        let err = create_discussion(&state, &session("creator"), request)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn creation_requires_storage() {
        let state = AppState::new(AppConfig::default());

        let err = create_discussion(&state, &session("creator"), pros_cons_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }

    #[tokio::test]
    async fn joining_twice_is_rejected() {
        let state = ready_state().await;
        let creator = session("creator");
        let created = create_discussion(&state, &creator, pros_cons_request())
            .await
            .unwrap();

        let debater = session("debater");
        let request = || JoinDiscussionRequest {
            role: ParticipantRole::Pros,
        };
        join_discussion(&state, &debater, created.id, request())
            .await
            .unwrap();

        let err = join_discussion(&state, &debater, created.id, request())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn observing_requires_permission() {
        let state = ready_state().await;
        let mut request = pros_cons_request();
        request.allow_observers = false;
        let created = create_discussion(&state, &session("creator"), request)
            .await
            .unwrap();

        let err = observe_discussion(&state, &session("lurker"), created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn start_requires_both_sides_seated() {
        let state = ready_state().await;
        let creator = session("creator");
        let created = create_discussion(&state, &creator, pros_cons_request())
            .await
            .unwrap();
        join_discussion(
            &state,
            &session("pros-lead"),
            created.id,
            JoinDiscussionRequest {
                role: ParticipantRole::Pros,
            },
        )
        .await
        .unwrap();

        let err = start_discussion(&state, &creator, created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn only_the_creator_starts_the_debate() {
        let state = ready_state().await;
        let (_creator, id) = seated_debate(&state).await;

        let err = start_discussion(&state, &session("stranger"), id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn starting_opens_the_first_phase() {
        let state = ready_state().await;
        let (creator, id) = seated_debate(&state).await;

        let response = start_discussion(&state, &creator, id).await.unwrap();

        assert_eq!(response.status, DiscussionStatus::Active);
        assert_eq!(response.phase, Some(DebatePhase::OpeningPros));
        assert!(response.started_at.is_some());
        assert!(response.phase_started_at.is_some());
        assert!(response.deadline.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn creator_advances_hand_the_floor_across_sides() {
        let state = ready_state().await;
        let (creator, id) = seated_debate(&state).await;
        start_discussion(&state, &creator, id).await.unwrap();

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
            let response = advance_discussion(&state, &creator, id).await.unwrap();
            assert_eq!(response.phase, Some(next));
        }

        let response = get_discussion(&state, id).await.unwrap();
        assert_eq!(response.status, DiscussionStatus::Ended);
        assert!(response.ended_at.is_some());

        let err = advance_discussion(&state, &creator, id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_deadline_trigger_is_ignored() {
        let state = ready_state().await;
        let (creator, id) = seated_debate(&state).await;
        start_discussion(&state, &creator, id).await.unwrap();
        advance_discussion(&state, &creator, id).await.unwrap();

        let room = state.room(id).unwrap();
        let err = advance_for_deadline(&state, &room, DebatePhase::OpeningPros)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert_eq!(room.phase().await, DebatePhase::OpeningCons);
    }

    #[tokio::test(start_paused = true)]
    async fn deadlines_walk_the_debate_through_every_phase() {
        let state = ready_state().await;
        let (creator, id) = seated_debate(&state).await;
        start_discussion(&state, &creator, id).await.unwrap();
        settle().await;

        let room = state.room(id).unwrap();
        assert_eq!(room.phase().await, DebatePhase::OpeningPros);

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
            tokio::time::advance(Duration::from_secs(5 * 60)).await;
            settle().await;
            assert_eq!(room.phase().await, next);
        }

        let response = get_discussion(&state, id).await.unwrap();
        assert_eq!(response.status, DiscussionStatus::Ended);
        assert!(response.ended_at.is_some());
        assert!(response.winner.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn a_legacy_discussion_ends_when_its_timer_expires() {
        let state = ready_state().await;
        let creator = session("creator");
        let created = create_discussion(&state, &creator, free_request(Some(10)))
            .await
            .unwrap();
        join_discussion(
            &state,
            &session("speaker"),
            created.id,
            JoinDiscussionRequest {
                role: ParticipantRole::Participant,
            },
        )
        .await
        .unwrap();

        let started = start_discussion(&state, &creator, created.id).await.unwrap();
        assert_eq!(started.status, DiscussionStatus::Active);
        assert!(started.phase.is_none());
        settle().await;

        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        settle().await;

        let response = get_discussion(&state, created.id).await.unwrap();
        assert_eq!(response.status, DiscussionStatus::Ended);
        assert!(response.ended_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn a_legacy_discussion_without_limit_keeps_running() {
        let state = ready_state().await;
        let creator = session("creator");
        let created = create_discussion(&state, &creator, free_request(None))
            .await
            .unwrap();
        join_discussion(
            &state,
            &session("speaker"),
            created.id,
            JoinDiscussionRequest {
                role: ParticipantRole::Participant,
            },
        )
        .await
        .unwrap();
        start_discussion(&state, &creator, created.id).await.unwrap();
        settle().await;

        tokio::time::advance(Duration::from_secs(24 * 60 * 60)).await;
        settle().await;

        let response = get_discussion(&state, created.id).await.unwrap();
        assert_eq!(response.status, DiscussionStatus::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn a_structured_debate_cannot_be_cut_short() {
        let state = ready_state().await;
        let (creator, id) = seated_debate(&state).await;
        start_discussion(&state, &creator, id).await.unwrap();
        advance_discussion(&state, &creator, id).await.unwrap();

        let err = end_discussion(&state, &creator, id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let response = get_discussion(&state, id).await.unwrap();
        assert_eq!(response.status, DiscussionStatus::Active);
        assert_eq!(response.phase, Some(DebatePhase::OpeningCons));
    }

    #[tokio::test(start_paused = true)]
    async fn discussions_survive_room_eviction() {
        let state = ready_state().await;
        let (creator, id) = seated_debate(&state).await;
        start_discussion(&state, &creator, id).await.unwrap();
        advance_discussion(&state, &creator, id).await.unwrap();

        state.rooms().remove(&id);

        let response = get_discussion(&state, id).await.unwrap();
        assert_eq!(response.status, DiscussionStatus::Active);
        assert_eq!(response.phase, Some(DebatePhase::OpeningCons));
        assert_eq!(response.participants.len(), 2);
        assert!(state.room(id).is_some());
    }

    #[tokio::test]
    async fn lobby_lists_stored_and_live_discussions() {
        let state = ready_state().await;
        let first = create_discussion(&state, &session("one"), pros_cons_request())
            .await
            .unwrap();
        let second = create_discussion(&state, &session("two"), free_request(None))
            .await
            .unwrap();

        let listed = list_discussions(&state).await;

        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|item| item.id == first.id));
        assert!(listed.iter().any(|item| item.id == second.id));
    }
}
