use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;
pub type ArcedDatabase = Arc<dyn Database>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait OptionalRecord<T> {
    /// Turns a missing record into [DatabaseError::NotFound]
    fn or_not_found(self, resource: &'static str, identifier: &'static str) -> Result<T>;
}

impl<T> OptionalRecord<T> for Result<Option<T>> {
    fn or_not_found(self, resource: &'static str, identifier: &'static str) -> Result<T> {
        self?.ok_or(DatabaseError::NotFound {
            resource,
            identifier,
        })
    }
}

/// The persistence gateway of neonpub.
///
/// Every lookup of a venue-owned record is filtered by the venue, so a record
/// of another venue is indistinguishable from a missing one. Updates return
/// how many records they modified.
#[async_trait]
pub trait Database: Send + Sync {
    async fn create_venue(&self, new_venue: NewVenue) -> Result<VenueData>;
    async fn venue_by_id(&self, venue_id: PrimaryKey) -> Result<Option<VenueData>>;
    async fn venue_by_code(&self, code: &str) -> Result<Option<VenueData>>;
    async fn set_active_performance(
        &self,
        venue_id: PrimaryKey,
        performance_id: Option<PrimaryKey>,
    ) -> Result<u64>;

    async fn create_participant(&self, new_participant: NewParticipant)
        -> Result<ParticipantData>;
    async fn participant_by_id(
        &self,
        venue_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<Option<ParticipantData>>;
    /// Adds points to a participant, creating it from `defaults` if it doesn't exist.
    async fn increment_score(
        &self,
        participant_id: PrimaryKey,
        points: i32,
        defaults: NewParticipant,
    ) -> Result<ParticipantData>;
    /// Participants by score, highest first. Ties keep the order participants joined in.
    async fn leaderboard(&self, venue_id: PrimaryKey, limit: usize)
        -> Result<Vec<ParticipantData>>;

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn session_by_token(&self, token: &str) -> Result<Option<SessionData>>;
    async fn delete_session_by_token(&self, token: &str) -> Result<u64>;
    async fn clear_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;

    async fn create_request(&self, new_request: NewSongRequest) -> Result<SongRequestData>;
    async fn request_by_id(
        &self,
        venue_id: PrimaryKey,
        request_id: PrimaryKey,
    ) -> Result<Option<SongRequestData>>;
    /// Requests in any of `statuses`, by position
    async fn requests_by_status(
        &self,
        venue_id: PrimaryKey,
        statuses: &[RequestStatus],
        limit: usize,
    ) -> Result<Vec<SongRequestData>>;
    /// Requests made by a participant, newest first
    async fn requests_by_participant(
        &self,
        venue_id: PrimaryKey,
        participant_id: PrimaryKey,
        limit: usize,
    ) -> Result<Vec<SongRequestData>>;
    async fn count_requests(&self, venue_id: PrimaryKey, statuses: &[RequestStatus])
        -> Result<u64>;
    async fn set_request_status(
        &self,
        venue_id: PrimaryKey,
        request_id: PrimaryKey,
        status: RequestStatus,
    ) -> Result<u64>;
    async fn set_request_position(
        &self,
        venue_id: PrimaryKey,
        request_id: PrimaryKey,
        position: i32,
    ) -> Result<u64>;

    /// Creates a live performance, marks its request as performing and makes it the
    /// venue's active performance, all or nothing
    async fn create_performance(&self, new_performance: NewPerformance)
        -> Result<PerformanceData>;
    async fn performance_by_id(
        &self,
        venue_id: PrimaryKey,
        performance_id: PrimaryKey,
    ) -> Result<Option<PerformanceData>>;
    async fn update_performance(&self, update: PerformanceUpdate) -> Result<u64>;
    /// Performances of a venue, most recently started first
    async fn performance_history(
        &self,
        venue_id: PrimaryKey,
        limit: usize,
    ) -> Result<Vec<PerformanceData>>;

    async fn create_vote(&self, new_vote: NewVote) -> Result<VoteData>;
    async fn vote_by_participant(
        &self,
        performance_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<Option<VoteData>>;
    async fn votes_for_performance(&self, performance_id: PrimaryKey) -> Result<Vec<VoteData>>;

    async fn create_quiz_session(&self, new_session: NewQuizSession) -> Result<QuizSessionData>;
    async fn quiz_session_by_id(
        &self,
        venue_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<Option<QuizSessionData>>;
    async fn update_quiz_session(&self, update: QuizSessionUpdate) -> Result<u64>;
    async fn active_quiz_sessions(&self, venue_id: PrimaryKey) -> Result<Vec<QuizSessionData>>;

    async fn create_quiz(&self, new_quiz: NewQuiz) -> Result<QuizData>;
    async fn quiz_by_id(&self, venue_id: PrimaryKey, quiz_id: PrimaryKey)
        -> Result<Option<QuizData>>;
    async fn active_quizzes(&self, venue_id: PrimaryKey) -> Result<Vec<QuizData>>;
    async fn end_quiz(&self, venue_id: PrimaryKey, quiz_id: PrimaryKey) -> Result<u64>;

    async fn create_answer(&self, new_answer: NewQuizAnswer) -> Result<QuizAnswerData>;
    async fn answer_by_participant(
        &self,
        quiz_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<Option<QuizAnswerData>>;
    async fn answers_for_quiz(&self, quiz_id: PrimaryKey) -> Result<Vec<QuizAnswerData>>;

    async fn create_reaction(&self, new_reaction: NewReaction) -> Result<ReactionData>;
    async fn count_reactions(
        &self,
        venue_id: PrimaryKey,
        performance_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<u64>;

    async fn create_message(&self, new_message: NewMessage) -> Result<MessageData>;
    async fn message_by_id(
        &self,
        venue_id: PrimaryKey,
        message_id: PrimaryKey,
    ) -> Result<Option<MessageData>>;
    /// Messages with a status, oldest first
    async fn messages_by_status(
        &self,
        venue_id: PrimaryKey,
        status: MessageStatus,
        limit: usize,
    ) -> Result<Vec<MessageData>>;
    async fn set_message_status(
        &self,
        venue_id: PrimaryKey,
        message_id: PrimaryKey,
        status: MessageStatus,
    ) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct NewVenue {
    pub name: String,
    pub code: String,
    /// Already hashed
    pub admin_password: String,
}

#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub venue_id: PrimaryKey,
    pub nickname: String,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub venue_id: PrimaryKey,
    pub participant_id: Option<PrimaryKey>,
    pub nickname: String,
    pub admin: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewSongRequest {
    pub venue_id: PrimaryKey,
    pub participant_id: PrimaryKey,
    pub nickname: String,
    pub title: String,
    pub artist: String,
    pub video_url: Option<String>,
    pub auto_searched: bool,
    pub position: i32,
}

#[derive(Debug)]
pub struct NewPerformance {
    pub venue_id: PrimaryKey,
    pub request_id: PrimaryKey,
    pub participant_id: PrimaryKey,
    pub nickname: String,
    pub song_title: String,
    pub song_artist: String,
    pub video_url: Option<String>,
}

/// Changes to a performance. Fields left as `None` stay untouched.
#[derive(Debug, Default)]
pub struct PerformanceUpdate {
    pub id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub status: Option<PerformanceStatus>,
    pub voting_open: Option<bool>,
    /// Average, count and sum of the votes
    pub tally: Option<(f64, i32, i64)>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct NewVote {
    pub performance_id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub participant_id: PrimaryKey,
    pub score: i32,
}

#[derive(Debug)]
pub struct NewQuizSession {
    pub venue_id: PrimaryKey,
    pub category: String,
    pub category_name: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Default)]
pub struct QuizSessionUpdate {
    pub id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub current_index: Option<i32>,
    pub status: Option<QuizStatus>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct NewQuiz {
    pub session_id: Option<PrimaryKey>,
    pub venue_id: PrimaryKey,
    pub category: Option<String>,
    pub category_name: Option<String>,
    pub question: Question,
    pub question_number: i32,
    pub total_questions: i32,
}

#[derive(Debug)]
pub struct NewQuizAnswer {
    pub quiz_id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub participant_id: PrimaryKey,
    pub nickname: String,
    pub answer_index: i32,
    pub is_correct: bool,
    pub points_earned: i32,
}

#[derive(Debug)]
pub struct NewReaction {
    pub venue_id: PrimaryKey,
    pub performance_id: Option<PrimaryKey>,
    pub participant_id: PrimaryKey,
    pub nickname: String,
    pub emoji: String,
    pub message: Option<String>,
}

#[derive(Debug)]
pub struct NewMessage {
    pub venue_id: PrimaryKey,
    pub participant_id: PrimaryKey,
    pub nickname: String,
    pub text: String,
}
