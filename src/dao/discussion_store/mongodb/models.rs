use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dao::models::{
        DebateModeEntity, DiscussionEntity, MessageEntity, ObserverEntity, ParticipantEntity,
        VoteEntity,
    },
    state::{
        discussion::{DiscussionKind, DiscussionStatus, MessageKind, ParticipantRole, VoteChoice},
        state_machine::DebatePhase,
    },
};

/// Discussion document as stored in the `discussions` collection. Top-level
/// timestamps become BSON dates so the collection can be indexed and sorted
/// on them; nested entities keep their serde encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoDiscussionDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    title: String,
    description: String,
    category: String,
    kind: DiscussionKind,
    status: DiscussionStatus,
    created_by: Uuid,
    creator_name: String,
    created_at: DateTime,
    started_at: Option<DateTime>,
    ended_at: Option<DateTime>,
    allow_observers: bool,
    max_participants: Option<u32>,
    mode: DebateModeEntity,
    participants: Vec<ParticipantEntity>,
    observers: Vec<ObserverEntity>,
    votes: Vec<VoteEntity>,
    winner: Option<VoteChoice>,
}

impl From<DiscussionEntity> for MongoDiscussionDocument {
    fn from(value: DiscussionEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            category: value.category,
            kind: value.kind,
            status: value.status,
            created_by: value.created_by,
            creator_name: value.creator_name,
            created_at: DateTime::from_system_time(value.created_at),
            started_at: value.started_at.map(DateTime::from_system_time),
            ended_at: value.ended_at.map(DateTime::from_system_time),
            allow_observers: value.allow_observers,
            max_participants: value.max_participants,
            mode: value.mode,
            participants: value.participants,
            observers: value.observers,
            votes: value.votes,
            winner: value.winner,
        }
    }
}

impl From<MongoDiscussionDocument> for DiscussionEntity {
    fn from(value: MongoDiscussionDocument) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            category: value.category,
            kind: value.kind,
            status: value.status,
            created_by: value.created_by,
            creator_name: value.creator_name,
            created_at: value.created_at.to_system_time(),
            started_at: value.started_at.map(|date| date.to_system_time()),
            ended_at: value.ended_at.map(|date| date.to_system_time()),
            allow_observers: value.allow_observers,
            max_participants: value.max_participants,
            mode: value.mode,
            participants: value.participants,
            observers: value.observers,
            votes: value.votes,
            winner: value.winner,
        }
    }
}

/// Message document as stored in the `messages` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessageDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    discussion_id: Uuid,
    user_id: Uuid,
    username: String,
    content: String,
    sent_at: DateTime,
    role: ParticipantRole,
    phase: Option<DebatePhase>,
    kind: MessageKind,
    reply_to: Option<Uuid>,
    #[serde(default)]
    liked_by: Vec<Uuid>,
}

impl From<MessageEntity> for MongoMessageDocument {
    fn from(value: MessageEntity) -> Self {
        Self {
            id: value.id,
            discussion_id: value.discussion_id,
            user_id: value.user_id,
            username: value.username,
            content: value.content,
            sent_at: DateTime::from_system_time(value.sent_at),
            role: value.role,
            phase: value.phase,
            kind: value.kind,
            reply_to: value.reply_to,
            liked_by: value.liked_by,
        }
    }
}

impl From<MongoMessageDocument> for MessageEntity {
    fn from(value: MongoMessageDocument) -> Self {
        Self {
            id: value.id,
            discussion_id: value.discussion_id,
            user_id: value.user_id,
            username: value.username,
            content: value.content,
            sent_at: value.sent_at.to_system_time(),
            role: value.role,
            phase: value.phase,
            kind: value.kind,
            reply_to: value.reply_to,
            liked_by: value.liked_by,
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
