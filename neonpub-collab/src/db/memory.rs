use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    Database, DatabaseError, MessageData, MessageStatus, NewMessage, NewParticipant,
    NewPerformance, NewQuiz, NewQuizAnswer, NewQuizSession, NewReaction, NewSession,
    NewSongRequest, NewVenue, NewVote, ParticipantData, PerformanceData, PerformanceStatus,
    PerformanceUpdate, PrimaryKey, QuizAnswerData, QuizData, QuizSessionData, QuizSessionUpdate,
    QuizStatus, ReactionData, RequestStatus, Result, SessionData, SongRequestData, VenueData,
    VoteData,
};

/// A database that lives in memory, for development and tests.
/// Everything is lost when the process exits.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    venues: Table<VenueData>,
    participants: Table<ParticipantData>,
    sessions: Table<SessionData>,
    requests: Table<SongRequestData>,
    performances: Table<PerformanceData>,
    votes: Table<VoteData>,
    quiz_sessions: Table<QuizSessionData>,
    quizzes: Table<QuizData>,
    answers: Table<QuizAnswerData>,
    reactions: Table<ReactionData>,
    messages: Table<MessageData>,
}

/// Rows by key, ordered by insertion since keys only grow
struct Table<T> {
    last_key: PrimaryKey,
    rows: BTreeMap<PrimaryKey, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            last_key: 0,
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Clone> Table<T> {
    fn insert_with(&mut self, make: impl FnOnce(PrimaryKey) -> T) -> T {
        self.last_key += 1;
        let row = make(self.last_key);
        self.rows.insert(self.last_key, row.clone());
        row
    }

    fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.rows.values().find(|r| predicate(r)).cloned()
    }

    fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.values().filter(|r| predicate(r)).cloned().collect()
    }

    fn count(&self, predicate: impl Fn(&T) -> bool) -> u64 {
        self.rows.values().filter(|r| predicate(r)).count() as u64
    }

    fn update(&mut self, predicate: impl Fn(&T) -> bool, mut patch: impl FnMut(&mut T)) -> u64 {
        let mut modified = 0;

        for row in self.rows.values_mut().filter(|r| predicate(r)) {
            patch(row);
            modified += 1;
        }

        modified
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn create_venue(&self, new_venue: NewVenue) -> Result<VenueData> {
        let mut tables = self.tables.lock();

        if tables.venues.find(|v| v.code == new_venue.code).is_some() {
            return Err(DatabaseError::Conflict {
                resource: "venue",
                field: "code",
                value: new_venue.code,
            });
        }

        Ok(tables.venues.insert_with(|id| VenueData {
            id,
            name: new_venue.name,
            code: new_venue.code,
            admin_password: new_venue.admin_password,
            active_performance_id: None,
            created_at: Utc::now(),
        }))
    }

    async fn venue_by_id(&self, venue_id: PrimaryKey) -> Result<Option<VenueData>> {
        Ok(self.tables.lock().venues.find(|v| v.id == venue_id))
    }

    async fn venue_by_code(&self, code: &str) -> Result<Option<VenueData>> {
        Ok(self.tables.lock().venues.find(|v| v.code == code))
    }

    async fn set_active_performance(
        &self,
        venue_id: PrimaryKey,
        performance_id: Option<PrimaryKey>,
    ) -> Result<u64> {
        Ok(self
            .tables
            .lock()
            .venues
            .update(|v| v.id == venue_id, |v| v.active_performance_id = performance_id))
    }

    async fn create_participant(
        &self,
        new_participant: NewParticipant,
    ) -> Result<ParticipantData> {
        Ok(self
            .tables
            .lock()
            .participants
            .insert_with(|id| ParticipantData {
                id,
                venue_id: new_participant.venue_id,
                nickname: new_participant.nickname,
                score: 0,
                joined_at: Utc::now(),
            }))
    }

    async fn participant_by_id(
        &self,
        venue_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<Option<ParticipantData>> {
        Ok(self
            .tables
            .lock()
            .participants
            .find(|p| p.id == participant_id && p.venue_id == venue_id))
    }

    async fn increment_score(
        &self,
        participant_id: PrimaryKey,
        points: i32,
        defaults: NewParticipant,
    ) -> Result<ParticipantData> {
        let mut tables = self.tables.lock();
        let participants = &mut tables.participants;

        if let Some(participant) = participants.rows.get_mut(&participant_id) {
            participant.score += points;
            return Ok(participant.clone());
        }

        let participant = ParticipantData {
            id: participant_id,
            venue_id: defaults.venue_id,
            nickname: defaults.nickname,
            score: points,
            joined_at: Utc::now(),
        };

        participants.last_key = participants.last_key.max(participant_id);
        participants.rows.insert(participant_id, participant.clone());

        Ok(participant)
    }

    async fn leaderboard(
        &self,
        venue_id: PrimaryKey,
        limit: usize,
    ) -> Result<Vec<ParticipantData>> {
        let mut participants = self
            .tables
            .lock()
            .participants
            .filter(|p| p.venue_id == venue_id);

        // Stable, so equal scores keep the join order
        participants.sort_by(|a, b| b.score.cmp(&a.score));
        participants.truncate(limit);

        Ok(participants)
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        Ok(self.tables.lock().sessions.insert_with(|id| SessionData {
            id,
            token: new_session.token,
            venue_id: new_session.venue_id,
            participant_id: new_session.participant_id,
            nickname: new_session.nickname,
            admin: new_session.admin,
            expires_at: new_session.expires_at,
        }))
    }

    async fn session_by_token(&self, token: &str) -> Result<Option<SessionData>> {
        Ok(self.tables.lock().sessions.find(|s| s.token == token))
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<u64> {
        let mut tables = self.tables.lock();
        let before = tables.sessions.rows.len();

        tables.sessions.rows.retain(|_, s| s.token != token);

        Ok((before - tables.sessions.rows.len()) as u64)
    }

    async fn clear_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.lock();
        let before = tables.sessions.rows.len();

        tables.sessions.rows.retain(|_, s| s.expires_at > now);

        Ok((before - tables.sessions.rows.len()) as u64)
    }

    async fn create_request(&self, new_request: NewSongRequest) -> Result<SongRequestData> {
        Ok(self
            .tables
            .lock()
            .requests
            .insert_with(|id| SongRequestData {
                id,
                venue_id: new_request.venue_id,
                participant_id: new_request.participant_id,
                nickname: new_request.nickname,
                title: new_request.title,
                artist: new_request.artist,
                video_url: new_request.video_url,
                auto_searched: new_request.auto_searched,
                status: RequestStatus::Pending,
                position: new_request.position,
                created_at: Utc::now(),
            }))
    }

    async fn request_by_id(
        &self,
        venue_id: PrimaryKey,
        request_id: PrimaryKey,
    ) -> Result<Option<SongRequestData>> {
        Ok(self
            .tables
            .lock()
            .requests
            .find(|r| r.id == request_id && r.venue_id == venue_id))
    }

    async fn requests_by_status(
        &self,
        venue_id: PrimaryKey,
        statuses: &[RequestStatus],
        limit: usize,
    ) -> Result<Vec<SongRequestData>> {
        let mut requests = self
            .tables
            .lock()
            .requests
            .filter(|r| r.venue_id == venue_id && statuses.contains(&r.status));

        requests.sort_by_key(|r| r.position);
        requests.truncate(limit);

        Ok(requests)
    }

    async fn requests_by_participant(
        &self,
        venue_id: PrimaryKey,
        participant_id: PrimaryKey,
        limit: usize,
    ) -> Result<Vec<SongRequestData>> {
        let mut requests = self
            .tables
            .lock()
            .requests
            .filter(|r| r.venue_id == venue_id && r.participant_id == participant_id);

        requests.reverse();
        requests.truncate(limit);

        Ok(requests)
    }

    async fn count_requests(
        &self,
        venue_id: PrimaryKey,
        statuses: &[RequestStatus],
    ) -> Result<u64> {
        Ok(self
            .tables
            .lock()
            .requests
            .count(|r| r.venue_id == venue_id && statuses.contains(&r.status)))
    }

    async fn set_request_status(
        &self,
        venue_id: PrimaryKey,
        request_id: PrimaryKey,
        status: RequestStatus,
    ) -> Result<u64> {
        Ok(self.tables.lock().requests.update(
            |r| r.id == request_id && r.venue_id == venue_id,
            |r| r.status = status,
        ))
    }

    async fn set_request_position(
        &self,
        venue_id: PrimaryKey,
        request_id: PrimaryKey,
        position: i32,
    ) -> Result<u64> {
        Ok(self.tables.lock().requests.update(
            |r| r.id == request_id && r.venue_id == venue_id,
            |r| r.position = position,
        ))
    }

    async fn create_performance(
        &self,
        new_performance: NewPerformance,
    ) -> Result<PerformanceData> {
        let mut tables = self.tables.lock();
        let (venue_id, request_id) = (new_performance.venue_id, new_performance.request_id);

        let performance = tables.performances.insert_with(|id| PerformanceData {
            id,
            venue_id: new_performance.venue_id,
            request_id: new_performance.request_id,
            participant_id: new_performance.participant_id,
            nickname: new_performance.nickname,
            song_title: new_performance.song_title,
            song_artist: new_performance.song_artist,
            video_url: new_performance.video_url,
            status: PerformanceStatus::Live,
            voting_open: false,
            average_score: 0.0,
            vote_count: 0,
            vote_sum: 0,
            started_at: Utc::now(),
            ended_at: None,
        });

        tables.requests.update(
            |r| r.id == request_id && r.venue_id == venue_id,
            |r| r.status = RequestStatus::Performing,
        );
        tables.venues.update(
            |v| v.id == venue_id,
            |v| v.active_performance_id = Some(performance.id),
        );

        Ok(performance)
    }

    async fn performance_by_id(
        &self,
        venue_id: PrimaryKey,
        performance_id: PrimaryKey,
    ) -> Result<Option<PerformanceData>> {
        Ok(self
            .tables
            .lock()
            .performances
            .find(|p| p.id == performance_id && p.venue_id == venue_id))
    }

    async fn update_performance(&self, update: PerformanceUpdate) -> Result<u64> {
        Ok(self.tables.lock().performances.update(
            |p| p.id == update.id && p.venue_id == update.venue_id,
            |p| {
                if let Some(status) = update.status {
                    p.status = status;
                }
                if let Some(voting_open) = update.voting_open {
                    p.voting_open = voting_open;
                }
                if let Some((average, count, sum)) = update.tally {
                    p.average_score = average;
                    p.vote_count = count;
                    p.vote_sum = sum;
                }
                if let Some(started_at) = update.started_at {
                    p.started_at = started_at;
                }
                if let Some(ended_at) = update.ended_at {
                    p.ended_at = Some(ended_at);
                }
            },
        ))
    }

    async fn performance_history(
        &self,
        venue_id: PrimaryKey,
        limit: usize,
    ) -> Result<Vec<PerformanceData>> {
        let mut performances = self
            .tables
            .lock()
            .performances
            .filter(|p| p.venue_id == venue_id);

        performances.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        performances.truncate(limit);

        Ok(performances)
    }

    async fn create_vote(&self, new_vote: NewVote) -> Result<VoteData> {
        let mut tables = self.tables.lock();

        let exists = tables.votes.find(|v| {
            v.performance_id == new_vote.performance_id
                && v.participant_id == new_vote.participant_id
        });

        if exists.is_some() {
            return Err(DatabaseError::Conflict {
                resource: "vote",
                field: "participant_id",
                value: new_vote.participant_id.to_string(),
            });
        }

        Ok(tables.votes.insert_with(|id| VoteData {
            id,
            performance_id: new_vote.performance_id,
            venue_id: new_vote.venue_id,
            participant_id: new_vote.participant_id,
            score: new_vote.score,
            created_at: Utc::now(),
        }))
    }

    async fn vote_by_participant(
        &self,
        performance_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<Option<VoteData>> {
        Ok(self
            .tables
            .lock()
            .votes
            .find(|v| v.performance_id == performance_id && v.participant_id == participant_id))
    }

    async fn votes_for_performance(&self, performance_id: PrimaryKey) -> Result<Vec<VoteData>> {
        Ok(self
            .tables
            .lock()
            .votes
            .filter(|v| v.performance_id == performance_id))
    }

    async fn create_quiz_session(&self, new_session: NewQuizSession) -> Result<QuizSessionData> {
        Ok(self
            .tables
            .lock()
            .quiz_sessions
            .insert_with(|id| QuizSessionData {
                id,
                venue_id: new_session.venue_id,
                category: new_session.category,
                category_name: new_session.category_name,
                total_questions: new_session.questions.len() as i32,
                questions: new_session.questions,
                current_index: 0,
                status: QuizStatus::Active,
                started_at: Utc::now(),
                ended_at: None,
            }))
    }

    async fn quiz_session_by_id(
        &self,
        venue_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<Option<QuizSessionData>> {
        Ok(self
            .tables
            .lock()
            .quiz_sessions
            .find(|s| s.id == session_id && s.venue_id == venue_id))
    }

    async fn update_quiz_session(&self, update: QuizSessionUpdate) -> Result<u64> {
        Ok(self.tables.lock().quiz_sessions.update(
            |s| s.id == update.id && s.venue_id == update.venue_id,
            |s| {
                if let Some(index) = update.current_index {
                    s.current_index = index;
                }
                if let Some(status) = update.status {
                    s.status = status;
                }
                if let Some(ended_at) = update.ended_at {
                    s.ended_at = Some(ended_at);
                }
            },
        ))
    }

    async fn active_quiz_sessions(&self, venue_id: PrimaryKey) -> Result<Vec<QuizSessionData>> {
        Ok(self
            .tables
            .lock()
            .quiz_sessions
            .filter(|s| s.venue_id == venue_id && s.status == QuizStatus::Active))
    }

    async fn create_quiz(&self, new_quiz: NewQuiz) -> Result<QuizData> {
        Ok(self.tables.lock().quizzes.insert_with(|id| QuizData {
            id,
            session_id: new_quiz.session_id,
            venue_id: new_quiz.venue_id,
            category: new_quiz.category,
            category_name: new_quiz.category_name,
            question: new_quiz.question,
            question_number: new_quiz.question_number,
            total_questions: new_quiz.total_questions,
            status: QuizStatus::Active,
            started_at: Utc::now(),
        }))
    }

    async fn quiz_by_id(
        &self,
        venue_id: PrimaryKey,
        quiz_id: PrimaryKey,
    ) -> Result<Option<QuizData>> {
        Ok(self
            .tables
            .lock()
            .quizzes
            .find(|q| q.id == quiz_id && q.venue_id == venue_id))
    }

    async fn active_quizzes(&self, venue_id: PrimaryKey) -> Result<Vec<QuizData>> {
        Ok(self
            .tables
            .lock()
            .quizzes
            .filter(|q| q.venue_id == venue_id && q.status == QuizStatus::Active))
    }

    async fn end_quiz(&self, venue_id: PrimaryKey, quiz_id: PrimaryKey) -> Result<u64> {
        Ok(self.tables.lock().quizzes.update(
            |q| q.id == quiz_id && q.venue_id == venue_id && q.status == QuizStatus::Active,
            |q| q.status = QuizStatus::Ended,
        ))
    }

    async fn create_answer(&self, new_answer: NewQuizAnswer) -> Result<QuizAnswerData> {
        let mut tables = self.tables.lock();

        let exists = tables.answers.find(|a| {
            a.quiz_id == new_answer.quiz_id && a.participant_id == new_answer.participant_id
        });

        if exists.is_some() {
            return Err(DatabaseError::Conflict {
                resource: "answer",
                field: "participant_id",
                value: new_answer.participant_id.to_string(),
            });
        }

        Ok(tables.answers.insert_with(|id| QuizAnswerData {
            id,
            quiz_id: new_answer.quiz_id,
            venue_id: new_answer.venue_id,
            participant_id: new_answer.participant_id,
            nickname: new_answer.nickname,
            answer_index: new_answer.answer_index,
            is_correct: new_answer.is_correct,
            points_earned: new_answer.points_earned,
            answered_at: Utc::now(),
        }))
    }

    async fn answer_by_participant(
        &self,
        quiz_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<Option<QuizAnswerData>> {
        Ok(self
            .tables
            .lock()
            .answers
            .find(|a| a.quiz_id == quiz_id && a.participant_id == participant_id))
    }

    async fn answers_for_quiz(&self, quiz_id: PrimaryKey) -> Result<Vec<QuizAnswerData>> {
        Ok(self.tables.lock().answers.filter(|a| a.quiz_id == quiz_id))
    }

    async fn create_reaction(&self, new_reaction: NewReaction) -> Result<ReactionData> {
        Ok(self
            .tables
            .lock()
            .reactions
            .insert_with(|id| ReactionData {
                id,
                venue_id: new_reaction.venue_id,
                performance_id: new_reaction.performance_id,
                participant_id: new_reaction.participant_id,
                nickname: new_reaction.nickname,
                emoji: new_reaction.emoji,
                message: new_reaction.message,
                created_at: Utc::now(),
            }))
    }

    async fn count_reactions(
        &self,
        venue_id: PrimaryKey,
        performance_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<u64> {
        Ok(self.tables.lock().reactions.count(|r| {
            r.venue_id == venue_id
                && r.performance_id == Some(performance_id)
                && r.participant_id == participant_id
        }))
    }

    async fn create_message(&self, new_message: NewMessage) -> Result<MessageData> {
        Ok(self.tables.lock().messages.insert_with(|id| MessageData {
            id,
            venue_id: new_message.venue_id,
            participant_id: new_message.participant_id,
            nickname: new_message.nickname,
            text: new_message.text,
            status: MessageStatus::Pending,
            created_at: Utc::now(),
        }))
    }

    async fn message_by_id(
        &self,
        venue_id: PrimaryKey,
        message_id: PrimaryKey,
    ) -> Result<Option<MessageData>> {
        Ok(self
            .tables
            .lock()
            .messages
            .find(|m| m.id == message_id && m.venue_id == venue_id))
    }

    async fn messages_by_status(
        &self,
        venue_id: PrimaryKey,
        status: MessageStatus,
        limit: usize,
    ) -> Result<Vec<MessageData>> {
        let mut messages = self
            .tables
            .lock()
            .messages
            .filter(|m| m.venue_id == venue_id && m.status == status);

        messages.truncate(limit);

        Ok(messages)
    }

    async fn set_message_status(
        &self,
        venue_id: PrimaryKey,
        message_id: PrimaryKey,
        status: MessageStatus,
    ) -> Result<u64> {
        Ok(self.tables.lock().messages.update(
            |m| m.id == message_id && m.venue_id == venue_id,
            |m| m.status = status,
        ))
    }
}
