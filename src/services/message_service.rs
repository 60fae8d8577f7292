//! Message intake for discussion rooms.
//!
//! Structured debates gate authors by phase: opening and closing statements
//! belong to the side's team leader, strategy and rebuttal rounds to any
//! member of the side on the floor. Single-timer discussions accept messages
//! from any participant while they are active. Replies ride along as
//! comments but pass the same gate as top-level posts.

use std::time::SystemTime;

use indexmap::IndexSet;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::MessageEntity,
    dto::message::{MessageResponse, PostMessageRequest},
    error::ServiceError,
    services::{discussion_service, sse_events},
    state::{
        SharedState, UserSession,
        discussion::{DiscussionStatus, Message, MessageKind},
        state_machine::DebatePhase,
    },
};

/// Post a message into the discussion, subject to the phase's author gate.
pub async fn post_message(
    state: &SharedState,
    session: &UserSession,
    id: Uuid,
    request: PostMessageRequest,
) -> Result<MessageResponse, ServiceError> {
    let room = discussion_service::fetch_room(state, id).await?;
    let store = state.require_store().await?;

    let message = {
        let mut guard = room.state().write().await;
        let phase = room.phase().await;

        let Some(participant) = guard.discussion.participants.get(&session.user_id) else {
            return Err(ServiceError::Unauthorized(
                "only seated participants may post".into(),
            ));
        };
        let (role, team_leader) = (participant.role, participant.team_leader);
        let structured = guard.discussion.mode.is_structured();

        let kind = if structured {
            let Some(kind) = phase.message_kind() else {
                return Err(ServiceError::InvalidState(
                    "messages are not accepted in this phase".into(),
                ));
            };
            if !phase.permits_author(role, team_leader) {
                return Err(ServiceError::Unauthorized(
                    "it is not your side's turn to speak".into(),
                ));
            }
            kind
        } else {
            if guard.discussion.status != DiscussionStatus::Active {
                return Err(ServiceError::InvalidState(
                    "discussion is not running".into(),
                ));
            }
            MessageKind::Argument
        };

        if let Some(reply_to) = request.reply_to
            && !guard.messages.iter().any(|message| message.id == reply_to)
        {
            return Err(ServiceError::InvalidInput(
                "reply target does not exist in this discussion".into(),
            ));
        }

        let message = Message {
            id: Uuid::new_v4(),
            discussion_id: id,
            user_id: session.user_id,
            username: session.username.clone(),
            content: request.content,
            sent_at: SystemTime::now(),
            role,
            phase: structured.then_some(phase),
            kind: if request.reply_to.is_some() {
                MessageKind::Comment
            } else {
                kind
            },
            reply_to: request.reply_to,
            liked_by: IndexSet::new(),
        };
        guard.messages.push(message.clone());
        message
    };

    if let Err(err) = store.save_message(MessageEntity::from(message.clone())).await {
        warn!(discussion_id = %id, error = %err, "failed to persist message");
    }

    sse_events::broadcast_message_posted(&room, message.clone());
    Ok(MessageResponse::from(message))
}

/// List the discussion's messages in send order, optionally narrowed to one
/// phase.
pub async fn list_messages(
    state: &SharedState,
    id: Uuid,
    phase: Option<DebatePhase>,
) -> Result<Vec<MessageResponse>, ServiceError> {
    let room = discussion_service::fetch_room(state, id).await?;
    let guard = room.state().read().await;

    // Untagged messages predate phase tracking and show up in every view.
    Ok(guard
        .messages
        .iter()
        .filter(|message| match phase {
            Some(wanted) => message.phase.is_none() || message.phase == Some(wanted),
            None => true,
        })
        .cloned()
        .map(MessageResponse::from)
        .collect())
}

/// Record a like on a message. Liking the same message twice is a no-op.
pub async fn like_message(
    state: &SharedState,
    session: &UserSession,
    id: Uuid,
    message_id: Uuid,
) -> Result<MessageResponse, ServiceError> {
    let room = discussion_service::fetch_room(state, id).await?;
    let store = state.require_store().await?;

    let (message, newly_liked) = {
        let mut guard = room.state().write().await;
        if !guard.discussion.is_member(session.user_id) {
            return Err(ServiceError::Unauthorized(
                "only members of the discussion may like messages".into(),
            ));
        }

        let Some(message) = guard
            .messages
            .iter_mut()
            .find(|message| message.id == message_id)
        else {
            return Err(ServiceError::NotFound(format!(
                "message `{message_id}` not found"
            )));
        };

        let newly_liked = message.like(session.user_id);
        (message.clone(), newly_liked)
    };

    if newly_liked {
        if let Err(err) = store.save_message(MessageEntity::from(message.clone())).await {
            warn!(discussion_id = %id, error = %err, "failed to persist like");
        }
        sse_events::broadcast_message_liked(
            &room,
            message.id,
            session.user_id,
            message.liked_by.len(),
        );
    }

    Ok(MessageResponse::from(message))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::discussion_store::memory::MemoryDiscussionStore,
        dto::discussion::{CreateDiscussionRequest, JoinDiscussionRequest},
        state::{
            AppState,
            discussion::{DiscussionKind, ParticipantRole},
        },
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

    fn text(content: &str) -> PostMessageRequest {
        PostMessageRequest {
            content: content.to_string(),
            reply_to: None,
        }
    }

    struct DebateFixture {
        creator: UserSession,
        pros_lead: UserSession,
        pros_backup: UserSession,
        cons_lead: UserSession,
        id: Uuid,
    }

    /// A started pros/cons debate with a leader and a backup on the pros
    /// side and a leader on the cons side.
    async fn running_debate(state: &SharedState) -> DebateFixture {
        let creator = session("creator");
        let created = discussion_service::create_discussion(
            state,
            &creator,
            CreateDiscussionRequest {
                title: "Ban combustion cars by 2035".into(),
                description: String::new(),
                category: "politics".into(),
                kind: DiscussionKind::ProsCons,
                time_limit_minutes: Some(5),
                max_participants: None,
                allow_observers: true,
            },
        )
        .await
        .unwrap();

        let fixture = DebateFixture {
            creator,
            pros_lead: session("pros-lead"),
            pros_backup: session("pros-backup"),
            cons_lead: session("cons-lead"),
            id: created.id,
        };

        for (who, role) in [
            (&fixture.pros_lead, ParticipantRole::Pros),
            (&fixture.pros_backup, ParticipantRole::Pros),
            (&fixture.cons_lead, ParticipantRole::Cons),
        ] {
            discussion_service::join_discussion(
                state,
                who,
                fixture.id,
                JoinDiscussionRequest { role },
            )
            .await
            .unwrap();
        }

        discussion_service::start_discussion(state, &fixture.creator, fixture.id)
            .await
            .unwrap();
        fixture
    }

    async fn advance(state: &SharedState, fixture: &DebateFixture, steps: usize) {
        for _ in 0..steps {
            discussion_service::advance_discussion(state, &fixture.creator, fixture.id)
                .await
                .unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn posting_requires_a_seat() {
        let state = ready_state().await;
        let fixture = running_debate(&state).await;

        let err = post_message(&state, &session("stranger"), fixture.id, text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn opening_statements_belong_to_the_team_leader() {
        let state = ready_state().await;
        let fixture = running_debate(&state).await;

        let posted = post_message(&state, &fixture.pros_lead, fixture.id, text("we open"))
            .await
            .unwrap();
        assert_eq!(posted.kind, MessageKind::Opening);
        assert_eq!(posted.phase, Some(DebatePhase::OpeningPros));

        let err = post_message(&state, &fixture.pros_backup, fixture.id, text("me too"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let err = post_message(&state, &fixture.cons_lead, fixture.id, text("objection"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn strategy_rounds_accept_any_member_of_the_side() {
        let state = ready_state().await;
        let fixture = running_debate(&state).await;
        advance(&state, &fixture, 2).await;

        let posted = post_message(&state, &fixture.pros_backup, fixture.id, text("our plan"))
            .await
            .unwrap();
        assert_eq!(posted.kind, MessageKind::Strategy);

        let err = post_message(&state, &fixture.cons_lead, fixture.id, text("ours"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn no_messages_while_voting() {
        let state = ready_state().await;
        let fixture = running_debate(&state).await;
        advance(&state, &fixture, 8).await;

        let err = post_message(&state, &fixture.pros_lead, fixture.id, text("late"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn replies_become_comments_and_must_target_an_existing_message() {
        let state = ready_state().await;
        let fixture = running_debate(&state).await;

        let opening = post_message(&state, &fixture.pros_lead, fixture.id, text("we open"))
            .await
            .unwrap();

        let reply = post_message(
            &state,
            &fixture.pros_lead,
            fixture.id,
            PostMessageRequest {
                content: "clarifying my own point".into(),
                reply_to: Some(opening.id),
            },
        )
        .await
        .unwrap();
        assert_eq!(reply.kind, MessageKind::Comment);
        assert_eq!(reply.reply_to, Some(opening.id));

        let err = post_message(
            &state,
            &fixture.pros_lead,
            fixture.id,
            PostMessageRequest {
                content: "into the void".into(),
                reply_to: Some(Uuid::new_v4()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn free_discussions_accept_arguments_while_active() {
        let state = ready_state().await;
        let creator = session("creator");
        let created = discussion_service::create_discussion(
            &state,
            &creator,
            CreateDiscussionRequest {
                title: "Open floor".into(),
                description: String::new(),
                category: "society".into(),
                kind: DiscussionKind::Free,
                time_limit_minutes: None,
                max_participants: None,
                allow_observers: true,
            },
        )
        .await
        .unwrap();
        let speaker = session("speaker");
        discussion_service::join_discussion(
            &state,
            &speaker,
            created.id,
            JoinDiscussionRequest {
                role: ParticipantRole::Participant,
            },
        )
        .await
        .unwrap();

        // Nothing is accepted before the start.
        let err = post_message(&state, &speaker, created.id, text("early"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        discussion_service::start_discussion(&state, &creator, created.id)
            .await
            .unwrap();

        let posted = post_message(&state, &speaker, created.id, text("floor is open"))
            .await
            .unwrap();
        assert_eq!(posted.kind, MessageKind::Argument);
        assert!(posted.phase.is_none());

        discussion_service::end_discussion(&state, &creator, created.id)
            .await
            .unwrap();
        let err = post_message(&state, &speaker, created.id, text("too late"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn likes_are_recorded_once_per_user() {
        let state = ready_state().await;
        let fixture = running_debate(&state).await;
        let posted = post_message(&state, &fixture.pros_lead, fixture.id, text("we open"))
            .await
            .unwrap();

        let liked = like_message(&state, &fixture.cons_lead, fixture.id, posted.id)
            .await
            .unwrap();
        assert_eq!(liked.likes, 1);

        let liked_again = like_message(&state, &fixture.cons_lead, fixture.id, posted.id)
            .await
            .unwrap();
        assert_eq!(liked_again.likes, 1);

        let err = like_message(&state, &session("stranger"), fixture.id, posted.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn listings_can_be_narrowed_to_a_phase() {
        let state = ready_state().await;
        let fixture = running_debate(&state).await;

        post_message(&state, &fixture.pros_lead, fixture.id, text("pros opening"))
            .await
            .unwrap();
        advance(&state, &fixture, 1).await;
        post_message(&state, &fixture.cons_lead, fixture.id, text("cons opening"))
            .await
            .unwrap();

        // Simulate a message recorded before phase tagging existed.
        let room = state.room(fixture.id).unwrap();
        room.state().write().await.messages.push(Message {
            id: Uuid::new_v4(),
            discussion_id: fixture.id,
            user_id: fixture.pros_lead.user_id,
            username: fixture.pros_lead.username.clone(),
            content: "untagged".into(),
            sent_at: SystemTime::now(),
            role: ParticipantRole::Pros,
            phase: None,
            kind: MessageKind::Argument,
            reply_to: None,
            liked_by: IndexSet::new(),
        });

        let all = list_messages(&state, fixture.id, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let cons_only = list_messages(&state, fixture.id, Some(DebatePhase::OpeningCons))
            .await
            .unwrap();
        assert_eq!(cons_only.len(), 2);
        assert_eq!(cons_only[0].content, "cons opening");
        assert_eq!(cons_only[1].content, "untagged");
    }
}
