use std::time::{Duration, SystemTime};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{
        DebateModeEntity, DiscussionEntity, MessageEntity, ObserverEntity, ParticipantEntity,
        VoteEntity,
    },
    state::state_machine::DebatePhase,
};

/// Formats a discussion can be created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DiscussionKind {
    /// Structured pros/cons debate driven by the phase state machine.
    ProsCons,
    /// Free-form discussion with an optional overall time limit.
    Free,
    /// Two debaters, one per side, on a single overall timer.
    OneOnOne,
}

/// Lifecycle status of a discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionStatus {
    /// Collecting participants; nothing has started yet.
    Waiting,
    /// The debate or discussion is underway.
    Active,
    /// The discussion is over.
    Ended,
}

/// Side a participant debates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    /// Argues for the motion.
    Pros,
    /// Argues against the motion.
    Cons,
    /// Undifferentiated member of a free-form discussion.
    Participant,
}

/// Choice recorded by an observer's final vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    /// The pros side made the stronger case.
    Pros,
    /// The cons side made the stronger case.
    Cons,
    /// Neither side prevailed.
    Draw,
}

/// Classification of a message within the debate flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Opening statement.
    Opening,
    /// Strategy-round contribution.
    Strategy,
    /// Rebuttal-round contribution.
    Rebuttal,
    /// Closing statement.
    Closing,
    /// Free-form argument outside the structured rounds.
    Argument,
    /// Side commentary, e.g. replies kept out of the main argument flow.
    Comment,
}

/// Timer regime of a discussion.
///
/// The two regimes are disjoint by construction: a structured debate never
/// carries an overall time limit and a legacy discussion never has phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebateMode {
    /// Phase-driven debate; the live phase itself is owned by the room's
    /// state machine, this side only tracks the timing configuration.
    Structured {
        /// Duration of each phase, in minutes.
        phase_minutes: u32,
        /// When the current phase began. `None` until the debate opens.
        phase_started_at: Option<SystemTime>,
    },
    /// Single-timer discussion. `None` means no limit: the discussion runs
    /// until the creator ends it.
    Legacy {
        /// Overall duration from start, in minutes.
        time_minutes: Option<u32>,
    },
}

impl DebateMode {
    /// Whether this discussion runs the structured phase machine.
    pub fn is_structured(&self) -> bool {
        matches!(self, DebateMode::Structured { .. })
    }
}

/// Roster entry for a debating participant, keyed externally by user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Display name captured at join time.
    pub username: String,
    /// Side the participant debates on.
    pub role: ParticipantRole,
    /// When the participant joined.
    pub joined_at: SystemTime,
    /// First joiner of a side carries the team leadership.
    pub team_leader: bool,
}

/// Non-debating viewer, keyed externally by user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observer {
    /// Display name captured at join time.
    pub username: String,
    /// When the observer joined.
    pub joined_at: SystemTime,
}

/// An observer's final vote, keyed externally by voter id.
///
/// Keying by voter makes a repeat vote an overwrite, so the tally can never
/// count the same person twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalVote {
    /// The recorded choice.
    pub choice: VoteChoice,
    /// When the vote was (last) cast.
    pub cast_at: SystemTime,
    /// Optional free-text justification.
    pub reasoning: Option<String>,
}

/// One chat/argument entry in a discussion's message stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Stable identifier of the message.
    pub id: Uuid,
    /// Discussion this message belongs to.
    pub discussion_id: Uuid,
    /// Author's user id.
    pub user_id: Uuid,
    /// Author's display name at send time.
    pub username: String,
    /// Message body.
    pub content: String,
    /// When the message was accepted.
    pub sent_at: SystemTime,
    /// Author's role at send time.
    pub role: ParticipantRole,
    /// Phase that was current when the message was authored; `None` for
    /// legacy-mode messages, which every phase filter lets through.
    pub phase: Option<DebatePhase>,
    /// Classification derived from the phase (or `Argument` in legacy mode).
    pub kind: MessageKind,
    /// Message this one replies to, if any.
    pub reply_to: Option<Uuid>,
    /// Users who liked this message; one like per user.
    pub liked_by: IndexSet<Uuid>,
}

impl Message {
    /// Register a like, returning false when the user already liked this message.
    pub fn like(&mut self, user_id: Uuid) -> bool {
        self.liked_by.insert(user_id)
    }
}

/// Vote counts per choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteTally {
    /// Votes for the pros side.
    pub pros: usize,
    /// Votes for the cons side.
    pub cons: usize,
    /// Votes declaring a draw.
    pub draw: usize,
}

impl VoteTally {
    /// Total number of counted voters.
    pub fn total(&self) -> usize {
        self.pros + self.cons + self.draw
    }

    /// Winner under plurality rules: a side wins when it outnumbers both the
    /// other side and the draw votes; every other non-empty outcome is a draw.
    pub fn winner(&self) -> Option<VoteChoice> {
        if self.total() == 0 {
            return None;
        }
        if self.pros > self.cons && self.pros > self.draw {
            Some(VoteChoice::Pros)
        } else if self.cons > self.pros && self.cons > self.draw {
            Some(VoteChoice::Cons)
        } else {
            Some(VoteChoice::Draw)
        }
    }
}

/// Reasons a join request is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// The user already sits in the roster or the observer gallery.
    #[error("user is already part of this discussion")]
    AlreadyJoined,
    /// Joining is only possible while the discussion is waiting.
    #[error("discussion is no longer accepting participants")]
    NotWaiting,
    /// The requested side has no seat left.
    #[error("the {0:?} side is full")]
    SideFull(ParticipantRole),
    /// The requested role does not exist for this discussion format.
    #[error("role {role:?} is not available in a {kind:?} discussion")]
    RoleMismatch {
        /// Requested role.
        role: ParticipantRole,
        /// Format of the discussion.
        kind: DiscussionKind,
    },
}

/// Reasons an observe request is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserveError {
    /// The user already sits in the roster or the observer gallery.
    #[error("user is already part of this discussion")]
    AlreadyJoined,
    /// The creator disabled observers for this discussion.
    #[error("this discussion does not accept observers")]
    ObserversDisabled,
}

/// Durable state of one debate: metadata, roster, votes, and timer regime.
///
/// The live phase of a structured debate is owned by the room's state
/// machine; everything else lives here.
#[derive(Debug, Clone)]
pub struct Discussion {
    /// Stable identifier.
    pub id: Uuid,
    /// Title shown in listings.
    pub title: String,
    /// Longer description of the motion.
    pub description: String,
    /// Category label, validated against the configured set.
    pub category: String,
    /// Discussion format.
    pub kind: DiscussionKind,
    /// Lifecycle status.
    pub status: DiscussionStatus,
    /// User id of the creator.
    pub created_by: Uuid,
    /// Display name of the creator.
    pub creator_name: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// When the discussion went active.
    pub started_at: Option<SystemTime>,
    /// When the discussion ended.
    pub ended_at: Option<SystemTime>,
    /// Whether observers may watch and vote.
    pub allow_observers: bool,
    /// Optional roster cap; halved per side for pros/cons debates.
    pub max_participants: Option<u32>,
    /// Timer regime.
    pub mode: DebateMode,
    /// Debating roster keyed by user id, in join order.
    pub participants: IndexMap<Uuid, Participant>,
    /// Observer gallery keyed by user id, in join order.
    pub observers: IndexMap<Uuid, Observer>,
    /// Final votes keyed by voter id; re-voting overwrites.
    pub votes: IndexMap<Uuid, FinalVote>,
    /// Outcome once decided.
    pub winner: Option<VoteChoice>,
}

impl Discussion {
    /// Whether the user already participates or observes.
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.participants.contains_key(&user_id) || self.observers.contains_key(&user_id)
    }

    /// Number of roster entries holding the given role.
    pub fn side_count(&self, role: ParticipantRole) -> usize {
        self.participants
            .values()
            .filter(|participant| participant.role == role)
            .count()
    }

    /// Per-side seat limit derived from the discussion format.
    pub fn side_capacity(&self) -> Option<usize> {
        match self.kind {
            DiscussionKind::OneOnOne => Some(1),
            DiscussionKind::ProsCons => self
                .max_participants
                .map(|limit| (limit as usize / 2).max(1)),
            DiscussionKind::Free => None,
        }
    }

    /// Whether the roster satisfies the start requirement for this format:
    /// both sides seated for sided formats, at least one participant for
    /// free-form discussions.
    pub fn roster_ready(&self) -> bool {
        match self.kind {
            DiscussionKind::ProsCons | DiscussionKind::OneOnOne => {
                self.side_count(ParticipantRole::Pros) >= 1
                    && self.side_count(ParticipantRole::Cons) >= 1
            }
            DiscussionKind::Free => !self.participants.is_empty(),
        }
    }

    /// Admit a participant, checking membership, status, and capacity before
    /// touching the roster. The first occupant of a side becomes its team
    /// leader.
    pub fn admit(
        &mut self,
        user_id: Uuid,
        username: String,
        role: ParticipantRole,
        now: SystemTime,
    ) -> Result<(), JoinError> {
        if self.is_member(user_id) {
            return Err(JoinError::AlreadyJoined);
        }
        if self.status != DiscussionStatus::Waiting {
            return Err(JoinError::NotWaiting);
        }

        let sided = matches!(
            self.kind,
            DiscussionKind::ProsCons | DiscussionKind::OneOnOne
        );
        match role {
            ParticipantRole::Pros | ParticipantRole::Cons if !sided => {
                return Err(JoinError::RoleMismatch {
                    role,
                    kind: self.kind,
                });
            }
            ParticipantRole::Participant if sided => {
                return Err(JoinError::RoleMismatch {
                    role,
                    kind: self.kind,
                });
            }
            _ => {}
        }

        let occupancy = self.side_count(role);
        if let Some(capacity) = self.side_capacity()
            && sided
            && occupancy >= capacity
        {
            return Err(JoinError::SideFull(role));
        }

        self.participants.insert(
            user_id,
            Participant {
                username,
                role,
                joined_at: now,
                team_leader: sided && occupancy == 0,
            },
        );
        Ok(())
    }

    /// Admit an observer.
    pub fn observe(
        &mut self,
        user_id: Uuid,
        username: String,
        now: SystemTime,
    ) -> Result<(), ObserveError> {
        if self.is_member(user_id) {
            return Err(ObserveError::AlreadyJoined);
        }
        if !self.allow_observers {
            return Err(ObserveError::ObserversDisabled);
        }

        self.observers.insert(
            user_id,
            Observer {
                username,
                joined_at: now,
            },
        );
        Ok(())
    }

    /// Record (or overwrite) a voter's final vote.
    pub fn record_vote(&mut self, voter: Uuid, vote: FinalVote) {
        self.votes.insert(voter, vote);
    }

    /// Deadline of the currently running timer, if any: phase start plus the
    /// phase length for structured debates, discussion start plus the overall
    /// limit for legacy ones.
    pub fn deadline_at(&self, phase: DebatePhase) -> Option<SystemTime> {
        match &self.mode {
            DebateMode::Structured {
                phase_minutes,
                phase_started_at,
            } => {
                if !phase.has_deadline() {
                    return None;
                }
                phase_started_at
                    .map(|start| start + Duration::from_secs(u64::from(*phase_minutes) * 60))
            }
            DebateMode::Legacy { time_minutes } => {
                if self.status != DiscussionStatus::Active {
                    return None;
                }
                match (time_minutes, self.started_at) {
                    (Some(minutes), Some(start)) => {
                        Some(start + Duration::from_secs(u64::from(*minutes) * 60))
                    }
                    _ => None,
                }
            }
        }
    }

    /// Count the recorded votes per choice.
    pub fn tally(&self) -> VoteTally {
        let mut tally = VoteTally::default();
        for vote in self.votes.values() {
            match vote.choice {
                VoteChoice::Pros => tally.pros += 1,
                VoteChoice::Cons => tally.cons += 1,
                VoteChoice::Draw => tally.draw += 1,
            }
        }
        tally
    }

    /// Build the storage entity for this discussion. The live phase is passed
    /// in by the owning room; legacy discussions ignore it.
    pub fn to_entity(&self, phase: DebatePhase) -> DiscussionEntity {
        DiscussionEntity {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            kind: self.kind,
            status: self.status,
            created_by: self.created_by,
            creator_name: self.creator_name.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
            allow_observers: self.allow_observers,
            max_participants: self.max_participants,
            mode: match &self.mode {
                DebateMode::Structured {
                    phase_minutes,
                    phase_started_at,
                } => DebateModeEntity::Structured {
                    phase,
                    phase_minutes: *phase_minutes,
                    phase_started_at: *phase_started_at,
                },
                DebateMode::Legacy { time_minutes } => DebateModeEntity::Legacy {
                    time_minutes: *time_minutes,
                },
            },
            participants: self
                .participants
                .iter()
                .map(|(id, participant)| (*id, participant.clone()).into())
                .collect(),
            observers: self
                .observers
                .iter()
                .map(|(id, observer)| (*id, observer.clone()).into())
                .collect(),
            votes: self
                .votes
                .iter()
                .map(|(id, vote)| (*id, vote.clone()).into())
                .collect(),
            winner: self.winner,
        }
    }

    /// Rebuild the runtime discussion from its storage entity, returning the
    /// persisted phase alongside so the room can resume its state machine.
    pub fn from_entity(entity: DiscussionEntity) -> (Self, DebatePhase) {
        let (mode, phase) = match entity.mode {
            DebateModeEntity::Structured {
                phase,
                phase_minutes,
                phase_started_at,
            } => (
                DebateMode::Structured {
                    phase_minutes,
                    phase_started_at,
                },
                phase,
            ),
            DebateModeEntity::Legacy { time_minutes } => {
                (DebateMode::Legacy { time_minutes }, DebatePhase::Waiting)
            }
        };

        let discussion = Self {
            id: entity.id,
            title: entity.title,
            description: entity.description,
            category: entity.category,
            kind: entity.kind,
            status: entity.status,
            created_by: entity.created_by,
            creator_name: entity.creator_name,
            created_at: entity.created_at,
            started_at: entity.started_at,
            ended_at: entity.ended_at,
            allow_observers: entity.allow_observers,
            max_participants: entity.max_participants,
            mode,
            participants: entity
                .participants
                .into_iter()
                .map(|participant| {
                    let (id, participant) = participant.into();
                    (id, participant)
                })
                .collect(),
            observers: entity
                .observers
                .into_iter()
                .map(|observer| {
                    let (id, observer) = observer.into();
                    (id, observer)
                })
                .collect(),
            votes: entity
                .votes
                .into_iter()
                .map(|vote| {
                    let (id, vote) = vote.into();
                    (id, vote)
                })
                .collect(),
            winner: entity.winner,
        };

        (discussion, phase)
    }
}

impl From<(Uuid, Participant)> for ParticipantEntity {
    fn from((user_id, participant): (Uuid, Participant)) -> Self {
        Self {
            user_id,
            username: participant.username,
            role: participant.role,
            joined_at: participant.joined_at,
            team_leader: participant.team_leader,
        }
    }
}

impl From<ParticipantEntity> for (Uuid, Participant) {
    fn from(entity: ParticipantEntity) -> Self {
        (
            entity.user_id,
            Participant {
                username: entity.username,
                role: entity.role,
                joined_at: entity.joined_at,
                team_leader: entity.team_leader,
            },
        )
    }
}

impl From<(Uuid, Observer)> for ObserverEntity {
    fn from((user_id, observer): (Uuid, Observer)) -> Self {
        Self {
            user_id,
            username: observer.username,
            joined_at: observer.joined_at,
        }
    }
}

impl From<ObserverEntity> for (Uuid, Observer) {
    fn from(entity: ObserverEntity) -> Self {
        (
            entity.user_id,
            Observer {
                username: entity.username,
                joined_at: entity.joined_at,
            },
        )
    }
}

impl From<(Uuid, FinalVote)> for VoteEntity {
    fn from((user_id, vote): (Uuid, FinalVote)) -> Self {
        Self {
            user_id,
            choice: vote.choice,
            cast_at: vote.cast_at,
            reasoning: vote.reasoning,
        }
    }
}

impl From<VoteEntity> for (Uuid, FinalVote) {
    fn from(entity: VoteEntity) -> Self {
        (
            entity.user_id,
            FinalVote {
                choice: entity.choice,
                cast_at: entity.cast_at,
                reasoning: entity.reasoning,
            },
        )
    }
}

impl From<Message> for MessageEntity {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            discussion_id: message.discussion_id,
            user_id: message.user_id,
            username: message.username,
            content: message.content,
            sent_at: message.sent_at,
            role: message.role,
            phase: message.phase,
            kind: message.kind,
            reply_to: message.reply_to,
            liked_by: message.liked_by.into_iter().collect(),
        }
    }
}

impl From<MessageEntity> for Message {
    fn from(entity: MessageEntity) -> Self {
        Self {
            id: entity.id,
            discussion_id: entity.discussion_id,
            user_id: entity.user_id,
            username: entity.username,
            content: entity.content,
            sent_at: entity.sent_at,
            role: entity.role,
            phase: entity.phase,
            kind: entity.kind,
            reply_to: entity.reply_to,
            liked_by: entity.liked_by.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiting_discussion(kind: DiscussionKind) -> Discussion {
        let mode = match kind {
            DiscussionKind::ProsCons => DebateMode::Structured {
                phase_minutes: 5,
                phase_started_at: None,
            },
            _ => DebateMode::Legacy {
                time_minutes: Some(30),
            },
        };

        Discussion {
            id: Uuid::new_v4(),
            title: "test motion".into(),
            description: "a motion under test".into(),
            category: "society".into(),
            kind,
            status: DiscussionStatus::Waiting,
            created_by: Uuid::new_v4(),
            creator_name: "creator".into(),
            created_at: SystemTime::now(),
            started_at: None,
            ended_at: None,
            allow_observers: true,
            max_participants: None,
            mode,
            participants: IndexMap::new(),
            observers: IndexMap::new(),
            votes: IndexMap::new(),
            winner: None,
        }
    }

    fn admit(discussion: &mut Discussion, role: ParticipantRole) -> Uuid {
        let id = Uuid::new_v4();
        discussion
            .admit(id, format!("user-{id}"), role, SystemTime::now())
            .unwrap();
        id
    }

    #[test]
    fn first_joiner_of_each_side_leads_the_team() {
        let mut discussion = waiting_discussion(DiscussionKind::ProsCons);

        let first_pros = admit(&mut discussion, ParticipantRole::Pros);
        let second_pros = admit(&mut discussion, ParticipantRole::Pros);
        let first_cons = admit(&mut discussion, ParticipantRole::Cons);

        assert!(discussion.participants[&first_pros].team_leader);
        assert!(!discussion.participants[&second_pros].team_leader);
        assert!(discussion.participants[&first_cons].team_leader);
    }

    #[test]
    fn duplicate_join_is_refused_before_any_mutation() {
        let mut discussion = waiting_discussion(DiscussionKind::ProsCons);
        let user = admit(&mut discussion, ParticipantRole::Pros);

        let err = discussion
            .admit(user, "other-name".into(), ParticipantRole::Cons, SystemTime::now())
            .unwrap_err();
        assert_eq!(err, JoinError::AlreadyJoined);
        assert_eq!(discussion.participants.len(), 1);
    }

    #[test]
    fn join_is_only_open_while_waiting() {
        let mut discussion = waiting_discussion(DiscussionKind::ProsCons);
        discussion.status = DiscussionStatus::Active;

        let err = discussion
            .admit(
                Uuid::new_v4(),
                "late".into(),
                ParticipantRole::Pros,
                SystemTime::now(),
            )
            .unwrap_err();
        assert_eq!(err, JoinError::NotWaiting);
    }

    #[test]
    fn one_on_one_seats_exactly_one_per_side() {
        let mut discussion = waiting_discussion(DiscussionKind::OneOnOne);
        admit(&mut discussion, ParticipantRole::Pros);

        let err = discussion
            .admit(
                Uuid::new_v4(),
                "second".into(),
                ParticipantRole::Pros,
                SystemTime::now(),
            )
            .unwrap_err();
        assert_eq!(err, JoinError::SideFull(ParticipantRole::Pros));

        // The other side still has its seat.
        admit(&mut discussion, ParticipantRole::Cons);
        assert!(discussion.roster_ready());
    }

    #[test]
    fn pros_cons_halves_the_roster_cap_per_side() {
        let mut discussion = waiting_discussion(DiscussionKind::ProsCons);
        discussion.max_participants = Some(4);

        admit(&mut discussion, ParticipantRole::Pros);
        admit(&mut discussion, ParticipantRole::Pros);

        let err = discussion
            .admit(
                Uuid::new_v4(),
                "third".into(),
                ParticipantRole::Pros,
                SystemTime::now(),
            )
            .unwrap_err();
        assert_eq!(err, JoinError::SideFull(ParticipantRole::Pros));
    }

    #[test]
    fn sided_formats_reject_the_neutral_role_and_vice_versa() {
        let mut sided = waiting_discussion(DiscussionKind::ProsCons);
        let err = sided
            .admit(
                Uuid::new_v4(),
                "neutral".into(),
                ParticipantRole::Participant,
                SystemTime::now(),
            )
            .unwrap_err();
        assert!(matches!(err, JoinError::RoleMismatch { .. }));

        let mut free = waiting_discussion(DiscussionKind::Free);
        let err = free
            .admit(
                Uuid::new_v4(),
                "partisan".into(),
                ParticipantRole::Pros,
                SystemTime::now(),
            )
            .unwrap_err();
        assert!(matches!(err, JoinError::RoleMismatch { .. }));
    }

    #[test]
    fn observers_require_the_creator_opt_in() {
        let mut discussion = waiting_discussion(DiscussionKind::ProsCons);
        discussion.allow_observers = false;

        let err = discussion
            .observe(Uuid::new_v4(), "viewer".into(), SystemTime::now())
            .unwrap_err();
        assert_eq!(err, ObserveError::ObserversDisabled);

        discussion.allow_observers = true;
        discussion
            .observe(Uuid::new_v4(), "viewer".into(), SystemTime::now())
            .unwrap();
        assert_eq!(discussion.observers.len(), 1);
    }

    #[test]
    fn a_participant_cannot_double_as_observer() {
        let mut discussion = waiting_discussion(DiscussionKind::ProsCons);
        let user = admit(&mut discussion, ParticipantRole::Pros);

        let err = discussion
            .observe(user, "viewer".into(), SystemTime::now())
            .unwrap_err();
        assert_eq!(err, ObserveError::AlreadyJoined);
    }

    #[test]
    fn revoting_overwrites_instead_of_appending() {
        let mut discussion = waiting_discussion(DiscussionKind::ProsCons);
        let voter = Uuid::new_v4();

        discussion.record_vote(
            voter,
            FinalVote {
                choice: VoteChoice::Pros,
                cast_at: SystemTime::now(),
                reasoning: None,
            },
        );
        discussion.record_vote(
            voter,
            FinalVote {
                choice: VoteChoice::Cons,
                cast_at: SystemTime::now(),
                reasoning: Some("changed my mind".into()),
            },
        );

        assert_eq!(discussion.votes.len(), 1);
        assert_eq!(discussion.votes[&voter].choice, VoteChoice::Cons);
        let tally = discussion.tally();
        assert_eq!((tally.pros, tally.cons, tally.draw), (0, 1, 0));
    }

    #[test]
    fn winner_follows_plurality_with_draw_on_ties() {
        let cases = [
            ((2, 1, 0), Some(VoteChoice::Pros)),
            ((1, 3, 1), Some(VoteChoice::Cons)),
            ((2, 2, 0), Some(VoteChoice::Draw)),
            ((1, 1, 3), Some(VoteChoice::Draw)),
            ((0, 0, 0), None),
        ];

        for ((pros, cons, draw), expected) in cases {
            let tally = VoteTally { pros, cons, draw };
            assert_eq!(tally.winner(), expected, "tally {tally:?}");
        }
    }

    #[test]
    fn roster_ready_needs_both_sides_or_any_member() {
        let mut sided = waiting_discussion(DiscussionKind::ProsCons);
        assert!(!sided.roster_ready());
        admit(&mut sided, ParticipantRole::Pros);
        assert!(!sided.roster_ready());
        admit(&mut sided, ParticipantRole::Cons);
        assert!(sided.roster_ready());

        let mut free = waiting_discussion(DiscussionKind::Free);
        assert!(!free.roster_ready());
        admit(&mut free, ParticipantRole::Participant);
        assert!(free.roster_ready());
    }

    #[test]
    fn deadline_tracks_the_phase_for_structured_debates() {
        let mut discussion = waiting_discussion(DiscussionKind::ProsCons);
        let phase_start = SystemTime::now();

        // No phase running yet.
        assert_eq!(discussion.deadline_at(DebatePhase::Waiting), None);

        discussion.mode = DebateMode::Structured {
            phase_minutes: 5,
            phase_started_at: Some(phase_start),
        };
        assert_eq!(
            discussion.deadline_at(DebatePhase::OpeningPros),
            Some(phase_start + Duration::from_secs(300))
        );
        // Terminal phases never expire.
        assert_eq!(discussion.deadline_at(DebatePhase::Ended), None);
    }

    #[test]
    fn deadline_runs_from_the_start_for_legacy_discussions() {
        let mut discussion = waiting_discussion(DiscussionKind::Free);
        let start = SystemTime::now();
        discussion.status = DiscussionStatus::Active;
        discussion.started_at = Some(start);

        assert_eq!(
            discussion.deadline_at(DebatePhase::Waiting),
            Some(start + Duration::from_secs(1800))
        );

        discussion.mode = DebateMode::Legacy { time_minutes: None };
        assert_eq!(discussion.deadline_at(DebatePhase::Waiting), None);
    }

    #[test]
    fn entity_round_trip_preserves_mode_and_phase() {
        let mut discussion = waiting_discussion(DiscussionKind::ProsCons);
        admit(&mut discussion, ParticipantRole::Pros);
        admit(&mut discussion, ParticipantRole::Cons);
        discussion.status = DiscussionStatus::Active;

        let entity = discussion.to_entity(DebatePhase::StrategyCons);
        let (restored, phase) = Discussion::from_entity(entity);

        assert_eq!(phase, DebatePhase::StrategyCons);
        assert_eq!(restored.participants.len(), 2);
        assert!(restored.mode.is_structured());
        assert_eq!(restored.status, DiscussionStatus::Active);
    }
}
