use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    query, query_as, types::Json, Error as SqlxError, FromRow, PgPool,
};

use crate::{
    Database, DatabaseError, MessageData, MessageStatus, NewMessage, NewParticipant,
    NewPerformance, NewQuiz, NewQuizAnswer, NewQuizSession, NewReaction, NewSession,
    NewSongRequest, NewVenue, NewVote, ParticipantData, PerformanceData, PerformanceUpdate,
    PrimaryKey, Question, QuizAnswerData, QuizData, QuizSessionData, QuizSessionUpdate,
    QuizStatus, ReactionData, RequestStatus, Result, SessionData, SongRequestData,
    UnknownStatus, VenueData, VoteData,
};

/// A postgres database implementation for neonpub
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Connects to the database and brings the schema up to date.
    ///
    /// `timeout` bounds both waiting for a pooled connection and every statement run on it.
    pub async fn new(url: &str, timeout: Duration) -> Result<Self> {
        let options = connect_options(url, timeout).map_err(|e| e.any())?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .map_err(|e| e.any())?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }
}

fn connect_options(
    url: &str,
    timeout: Duration,
) -> std::result::Result<PgConnectOptions, SqlxError> {
    let statement_timeout = format!("{}ms", timeout.as_millis());

    Ok(PgConnectOptions::from_str(url)?.options([("statement_timeout", statement_timeout)]))
}

#[derive(FromRow)]
struct SongRequestRow {
    id: PrimaryKey,
    venue_id: PrimaryKey,
    participant_id: PrimaryKey,
    nickname: String,
    title: String,
    artist: String,
    video_url: Option<String>,
    auto_searched: bool,
    status: String,
    position: i32,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct PerformanceRow {
    id: PrimaryKey,
    venue_id: PrimaryKey,
    request_id: PrimaryKey,
    participant_id: PrimaryKey,
    nickname: String,
    song_title: String,
    song_artist: String,
    video_url: Option<String>,
    status: String,
    voting_open: bool,
    average_score: f64,
    vote_count: i32,
    vote_sum: i64,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct QuizSessionRow {
    id: PrimaryKey,
    venue_id: PrimaryKey,
    category: String,
    category_name: String,
    questions: Json<Vec<Question>>,
    current_index: i32,
    total_questions: i32,
    status: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct QuizRow {
    id: PrimaryKey,
    session_id: Option<PrimaryKey>,
    venue_id: PrimaryKey,
    category: Option<String>,
    category_name: Option<String>,
    question: Json<Question>,
    question_number: i32,
    total_questions: i32,
    status: String,
    started_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MessageRow {
    id: PrimaryKey,
    venue_id: PrimaryKey,
    participant_id: PrimaryKey,
    nickname: String,
    text: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SongRequestRow> for SongRequestData {
    type Error = UnknownStatus;

    fn try_from(row: SongRequestRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            venue_id: row.venue_id,
            participant_id: row.participant_id,
            nickname: row.nickname,
            title: row.title,
            artist: row.artist,
            video_url: row.video_url,
            auto_searched: row.auto_searched,
            status: row.status.parse()?,
            position: row.position,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<PerformanceRow> for PerformanceData {
    type Error = UnknownStatus;

    fn try_from(row: PerformanceRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            venue_id: row.venue_id,
            request_id: row.request_id,
            participant_id: row.participant_id,
            nickname: row.nickname,
            song_title: row.song_title,
            song_artist: row.song_artist,
            video_url: row.video_url,
            status: row.status.parse()?,
            voting_open: row.voting_open,
            average_score: row.average_score,
            vote_count: row.vote_count,
            vote_sum: row.vote_sum,
            started_at: row.started_at,
            ended_at: row.ended_at,
        })
    }
}

impl TryFrom<QuizSessionRow> for QuizSessionData {
    type Error = UnknownStatus;

    fn try_from(row: QuizSessionRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            venue_id: row.venue_id,
            category: row.category,
            category_name: row.category_name,
            questions: row.questions.0,
            current_index: row.current_index,
            total_questions: row.total_questions,
            status: row.status.parse()?,
            started_at: row.started_at,
            ended_at: row.ended_at,
        })
    }
}

impl TryFrom<QuizRow> for QuizData {
    type Error = UnknownStatus;

    fn try_from(row: QuizRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            session_id: row.session_id,
            venue_id: row.venue_id,
            category: row.category,
            category_name: row.category_name,
            question: row.question.0,
            question_number: row.question_number,
            total_questions: row.total_questions,
            status: row.status.parse()?,
            started_at: row.started_at,
        })
    }
}

impl TryFrom<MessageRow> for MessageData {
    type Error = UnknownStatus;

    fn try_from(row: MessageRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            venue_id: row.venue_id,
            participant_id: row.participant_id,
            nickname: row.nickname,
            text: row.text,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

/// Converts rows with a stored status into records
fn convert<R, T>(row: R) -> Result<T>
where
    T: TryFrom<R, Error = UnknownStatus>,
{
    T::try_from(row).map_err(|e| DatabaseError::Internal(Box::new(e)))
}

fn convert_optional<R, T>(row: Option<R>) -> Result<Option<T>>
where
    T: TryFrom<R, Error = UnknownStatus>,
{
    row.map(convert).transpose()
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = UnknownStatus>,
{
    rows.into_iter().map(convert).collect()
}

/// Postgres takes a signed limit
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn status_names(statuses: &[RequestStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

#[async_trait]
impl Database for PgDatabase {
    async fn create_venue(&self, new_venue: NewVenue) -> Result<VenueData> {
        query_as::<_, VenueData>(
            "INSERT INTO venues (name, code, admin_password) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(new_venue.name)
        .bind(&new_venue.code)
        .bind(new_venue.admin_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.conflict_or("venue", "code", &new_venue.code))
    }

    async fn venue_by_id(&self, venue_id: PrimaryKey) -> Result<Option<VenueData>> {
        query_as::<_, VenueData>("SELECT * FROM venues WHERE id = $1")
            .bind(venue_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn venue_by_code(&self, code: &str) -> Result<Option<VenueData>> {
        query_as::<_, VenueData>("SELECT * FROM venues WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn set_active_performance(
        &self,
        venue_id: PrimaryKey,
        performance_id: Option<PrimaryKey>,
    ) -> Result<u64> {
        query("UPDATE venues SET active_performance_id = $1 WHERE id = $2")
            .bind(performance_id)
            .bind(venue_id)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| e.any())
    }

    async fn create_participant(
        &self,
        new_participant: NewParticipant,
    ) -> Result<ParticipantData> {
        query_as::<_, ParticipantData>(
            "INSERT INTO participants (venue_id, nickname) VALUES ($1, $2) RETURNING *",
        )
        .bind(new_participant.venue_id)
        .bind(new_participant.nickname)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn participant_by_id(
        &self,
        venue_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<Option<ParticipantData>> {
        query_as::<_, ParticipantData>(
            "SELECT * FROM participants WHERE id = $1 AND venue_id = $2",
        )
        .bind(participant_id)
        .bind(venue_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn increment_score(
        &self,
        participant_id: PrimaryKey,
        points: i32,
        defaults: NewParticipant,
    ) -> Result<ParticipantData> {
        query_as::<_, ParticipantData>(
            "
            INSERT INTO participants (id, venue_id, nickname, score)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET score = participants.score + EXCLUDED.score
            RETURNING *",
        )
        .bind(participant_id)
        .bind(defaults.venue_id)
        .bind(defaults.nickname)
        .bind(points)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn leaderboard(
        &self,
        venue_id: PrimaryKey,
        limit: usize,
    ) -> Result<Vec<ParticipantData>> {
        query_as::<_, ParticipantData>(
            "SELECT * FROM participants WHERE venue_id = $1 ORDER BY score DESC, id ASC LIMIT $2",
        )
        .bind(venue_id)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        query_as::<_, SessionData>(
            "
            INSERT INTO sessions (token, venue_id, participant_id, nickname, admin, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *",
        )
        .bind(&new_session.token)
        .bind(new_session.venue_id)
        .bind(new_session.participant_id)
        .bind(new_session.nickname)
        .bind(new_session.admin)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.conflict_or("session", "token", &new_session.token))
    }

    async fn session_by_token(&self, token: &str) -> Result<Option<SessionData>> {
        query_as::<_, SessionData>("SELECT * FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<u64> {
        query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| e.any())
    }

    async fn clear_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| e.any())
    }

    async fn create_request(&self, new_request: NewSongRequest) -> Result<SongRequestData> {
        let row = query_as::<_, SongRequestRow>(
            "
            INSERT INTO song_requests
                (venue_id, participant_id, nickname, title, artist, video_url, auto_searched, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *",
        )
        .bind(new_request.venue_id)
        .bind(new_request.participant_id)
        .bind(new_request.nickname)
        .bind(new_request.title)
        .bind(new_request.artist)
        .bind(new_request.video_url)
        .bind(new_request.auto_searched)
        .bind(new_request.position)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert(row)
    }

    async fn request_by_id(
        &self,
        venue_id: PrimaryKey,
        request_id: PrimaryKey,
    ) -> Result<Option<SongRequestData>> {
        let row = query_as::<_, SongRequestRow>(
            "SELECT * FROM song_requests WHERE id = $1 AND venue_id = $2",
        )
        .bind(request_id)
        .bind(venue_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert_optional(row)
    }

    async fn requests_by_status(
        &self,
        venue_id: PrimaryKey,
        statuses: &[RequestStatus],
        limit: usize,
    ) -> Result<Vec<SongRequestData>> {
        let rows = query_as::<_, SongRequestRow>(
            "
            SELECT * FROM song_requests
            WHERE venue_id = $1 AND status = ANY($2)
            ORDER BY position ASC, id ASC
            LIMIT $3",
        )
        .bind(venue_id)
        .bind(status_names(statuses))
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert_all(rows)
    }

    async fn requests_by_participant(
        &self,
        venue_id: PrimaryKey,
        participant_id: PrimaryKey,
        limit: usize,
    ) -> Result<Vec<SongRequestData>> {
        let rows = query_as::<_, SongRequestRow>(
            "
            SELECT * FROM song_requests
            WHERE venue_id = $1 AND participant_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT $3",
        )
        .bind(venue_id)
        .bind(participant_id)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert_all(rows)
    }

    async fn count_requests(
        &self,
        venue_id: PrimaryKey,
        statuses: &[RequestStatus],
    ) -> Result<u64> {
        let (count,): (i64,) = query_as(
            "SELECT COUNT(*) FROM song_requests WHERE venue_id = $1 AND status = ANY($2)",
        )
        .bind(venue_id)
        .bind(status_names(statuses))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(count as u64)
    }

    async fn set_request_status(
        &self,
        venue_id: PrimaryKey,
        request_id: PrimaryKey,
        status: RequestStatus,
    ) -> Result<u64> {
        query("UPDATE song_requests SET status = $1 WHERE id = $2 AND venue_id = $3")
            .bind(status.as_str())
            .bind(request_id)
            .bind(venue_id)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| e.any())
    }

    async fn set_request_position(
        &self,
        venue_id: PrimaryKey,
        request_id: PrimaryKey,
        position: i32,
    ) -> Result<u64> {
        query("UPDATE song_requests SET position = $1 WHERE id = $2 AND venue_id = $3")
            .bind(position)
            .bind(request_id)
            .bind(venue_id)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| e.any())
    }

    async fn create_performance(
        &self,
        new_performance: NewPerformance,
    ) -> Result<PerformanceData> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let row = query_as::<_, PerformanceRow>(
            "
            INSERT INTO performances
                (venue_id, request_id, participant_id, nickname, song_title, song_artist, video_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *",
        )
        .bind(new_performance.venue_id)
        .bind(new_performance.request_id)
        .bind(new_performance.participant_id)
        .bind(new_performance.nickname)
        .bind(new_performance.song_title)
        .bind(new_performance.song_artist)
        .bind(new_performance.video_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        query("UPDATE song_requests SET status = $1 WHERE id = $2 AND venue_id = $3")
            .bind(RequestStatus::Performing.as_str())
            .bind(row.request_id)
            .bind(row.venue_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        query("UPDATE venues SET active_performance_id = $1 WHERE id = $2")
            .bind(row.id)
            .bind(row.venue_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        convert(row)
    }

    async fn performance_by_id(
        &self,
        venue_id: PrimaryKey,
        performance_id: PrimaryKey,
    ) -> Result<Option<PerformanceData>> {
        let row = query_as::<_, PerformanceRow>(
            "SELECT * FROM performances WHERE id = $1 AND venue_id = $2",
        )
        .bind(performance_id)
        .bind(venue_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert_optional(row)
    }

    async fn update_performance(&self, update: PerformanceUpdate) -> Result<u64> {
        let (average, count, sum) = match update.tally {
            Some((average, count, sum)) => (Some(average), Some(count), Some(sum)),
            None => (None, None, None),
        };

        query(
            "
            UPDATE performances SET
                status = COALESCE($1, status),
                voting_open = COALESCE($2, voting_open),
                average_score = COALESCE($3, average_score),
                vote_count = COALESCE($4, vote_count),
                vote_sum = COALESCE($5, vote_sum),
                started_at = COALESCE($6, started_at),
                ended_at = COALESCE($7, ended_at)
            WHERE id = $8 AND venue_id = $9",
        )
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.voting_open)
        .bind(average)
        .bind(count)
        .bind(sum)
        .bind(update.started_at)
        .bind(update.ended_at)
        .bind(update.id)
        .bind(update.venue_id)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected())
        .map_err(|e| e.any())
    }

    async fn performance_history(
        &self,
        venue_id: PrimaryKey,
        limit: usize,
    ) -> Result<Vec<PerformanceData>> {
        let rows = query_as::<_, PerformanceRow>(
            "
            SELECT * FROM performances
            WHERE venue_id = $1
            ORDER BY started_at DESC, id DESC
            LIMIT $2",
        )
        .bind(venue_id)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert_all(rows)
    }

    async fn create_vote(&self, new_vote: NewVote) -> Result<VoteData> {
        let participant = new_vote.participant_id.to_string();

        query_as::<_, VoteData>(
            "
            INSERT INTO votes (performance_id, venue_id, participant_id, score)
            VALUES ($1, $2, $3, $4)
            RETURNING *",
        )
        .bind(new_vote.performance_id)
        .bind(new_vote.venue_id)
        .bind(new_vote.participant_id)
        .bind(new_vote.score)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.conflict_or("vote", "participant_id", &participant))
    }

    async fn vote_by_participant(
        &self,
        performance_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<Option<VoteData>> {
        query_as::<_, VoteData>(
            "SELECT * FROM votes WHERE performance_id = $1 AND participant_id = $2",
        )
        .bind(performance_id)
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn votes_for_performance(&self, performance_id: PrimaryKey) -> Result<Vec<VoteData>> {
        query_as::<_, VoteData>("SELECT * FROM votes WHERE performance_id = $1 ORDER BY id")
            .bind(performance_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn create_quiz_session(&self, new_session: NewQuizSession) -> Result<QuizSessionData> {
        let total = new_session.questions.len() as i32;

        let row = query_as::<_, QuizSessionRow>(
            "
            INSERT INTO quiz_sessions (venue_id, category, category_name, questions, total_questions)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *",
        )
        .bind(new_session.venue_id)
        .bind(new_session.category)
        .bind(new_session.category_name)
        .bind(Json(new_session.questions))
        .bind(total)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert(row)
    }

    async fn quiz_session_by_id(
        &self,
        venue_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<Option<QuizSessionData>> {
        let row = query_as::<_, QuizSessionRow>(
            "SELECT * FROM quiz_sessions WHERE id = $1 AND venue_id = $2",
        )
        .bind(session_id)
        .bind(venue_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert_optional(row)
    }

    async fn update_quiz_session(&self, update: QuizSessionUpdate) -> Result<u64> {
        query(
            "
            UPDATE quiz_sessions SET
                current_index = COALESCE($1, current_index),
                status = COALESCE($2, status),
                ended_at = COALESCE($3, ended_at)
            WHERE id = $4 AND venue_id = $5",
        )
        .bind(update.current_index)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.ended_at)
        .bind(update.id)
        .bind(update.venue_id)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected())
        .map_err(|e| e.any())
    }

    async fn active_quiz_sessions(&self, venue_id: PrimaryKey) -> Result<Vec<QuizSessionData>> {
        let rows = query_as::<_, QuizSessionRow>(
            "SELECT * FROM quiz_sessions WHERE venue_id = $1 AND status = $2 ORDER BY id",
        )
        .bind(venue_id)
        .bind(QuizStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert_all(rows)
    }

    async fn create_quiz(&self, new_quiz: NewQuiz) -> Result<QuizData> {
        let row = query_as::<_, QuizRow>(
            "
            INSERT INTO quizzes
                (session_id, venue_id, category, category_name, question, question_number, total_questions)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *",
        )
        .bind(new_quiz.session_id)
        .bind(new_quiz.venue_id)
        .bind(new_quiz.category)
        .bind(new_quiz.category_name)
        .bind(Json(new_quiz.question))
        .bind(new_quiz.question_number)
        .bind(new_quiz.total_questions)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert(row)
    }

    async fn quiz_by_id(
        &self,
        venue_id: PrimaryKey,
        quiz_id: PrimaryKey,
    ) -> Result<Option<QuizData>> {
        let row = query_as::<_, QuizRow>("SELECT * FROM quizzes WHERE id = $1 AND venue_id = $2")
            .bind(quiz_id)
            .bind(venue_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.any())?;

        convert_optional(row)
    }

    async fn active_quizzes(&self, venue_id: PrimaryKey) -> Result<Vec<QuizData>> {
        let rows = query_as::<_, QuizRow>(
            "SELECT * FROM quizzes WHERE venue_id = $1 AND status = $2 ORDER BY id",
        )
        .bind(venue_id)
        .bind(QuizStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert_all(rows)
    }

    async fn end_quiz(&self, venue_id: PrimaryKey, quiz_id: PrimaryKey) -> Result<u64> {
        query("UPDATE quizzes SET status = $1 WHERE id = $2 AND venue_id = $3 AND status = $4")
            .bind(QuizStatus::Ended.as_str())
            .bind(quiz_id)
            .bind(venue_id)
            .bind(QuizStatus::Active.as_str())
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| e.any())
    }

    async fn create_answer(&self, new_answer: NewQuizAnswer) -> Result<QuizAnswerData> {
        let participant = new_answer.participant_id.to_string();

        query_as::<_, QuizAnswerData>(
            "
            INSERT INTO quiz_answers
                (quiz_id, venue_id, participant_id, nickname, answer_index, is_correct, points_earned)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *",
        )
        .bind(new_answer.quiz_id)
        .bind(new_answer.venue_id)
        .bind(new_answer.participant_id)
        .bind(new_answer.nickname)
        .bind(new_answer.answer_index)
        .bind(new_answer.is_correct)
        .bind(new_answer.points_earned)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.conflict_or("answer", "participant_id", &participant))
    }

    async fn answer_by_participant(
        &self,
        quiz_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<Option<QuizAnswerData>> {
        query_as::<_, QuizAnswerData>(
            "SELECT * FROM quiz_answers WHERE quiz_id = $1 AND participant_id = $2",
        )
        .bind(quiz_id)
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn answers_for_quiz(&self, quiz_id: PrimaryKey) -> Result<Vec<QuizAnswerData>> {
        query_as::<_, QuizAnswerData>("SELECT * FROM quiz_answers WHERE quiz_id = $1 ORDER BY id")
            .bind(quiz_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn create_reaction(&self, new_reaction: NewReaction) -> Result<ReactionData> {
        query_as::<_, ReactionData>(
            "
            INSERT INTO reactions (venue_id, performance_id, participant_id, nickname, emoji, message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *",
        )
        .bind(new_reaction.venue_id)
        .bind(new_reaction.performance_id)
        .bind(new_reaction.participant_id)
        .bind(new_reaction.nickname)
        .bind(new_reaction.emoji)
        .bind(new_reaction.message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn count_reactions(
        &self,
        venue_id: PrimaryKey,
        performance_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<u64> {
        let (count,): (i64,) = query_as(
            "
            SELECT COUNT(*) FROM reactions
            WHERE venue_id = $1 AND performance_id = $2 AND participant_id = $3",
        )
        .bind(venue_id)
        .bind(performance_id)
        .bind(participant_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(count as u64)
    }

    async fn create_message(&self, new_message: NewMessage) -> Result<MessageData> {
        let row = query_as::<_, MessageRow>(
            "
            INSERT INTO messages (venue_id, participant_id, nickname, text)
            VALUES ($1, $2, $3, $4)
            RETURNING *",
        )
        .bind(new_message.venue_id)
        .bind(new_message.participant_id)
        .bind(new_message.nickname)
        .bind(new_message.text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert(row)
    }

    async fn message_by_id(
        &self,
        venue_id: PrimaryKey,
        message_id: PrimaryKey,
    ) -> Result<Option<MessageData>> {
        let row = query_as::<_, MessageRow>("SELECT * FROM messages WHERE id = $1 AND venue_id = $2")
            .bind(message_id)
            .bind(venue_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.any())?;

        convert_optional(row)
    }

    async fn messages_by_status(
        &self,
        venue_id: PrimaryKey,
        status: MessageStatus,
        limit: usize,
    ) -> Result<Vec<MessageData>> {
        let rows = query_as::<_, MessageRow>(
            "
            SELECT * FROM messages
            WHERE venue_id = $1 AND status = $2
            ORDER BY created_at ASC, id ASC
            LIMIT $3",
        )
        .bind(venue_id)
        .bind(status.as_str())
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        convert_all(rows)
    }

    async fn set_message_status(
        &self,
        venue_id: PrimaryKey,
        message_id: PrimaryKey,
        status: MessageStatus,
    ) -> Result<u64> {
        query("UPDATE messages SET status = $1 WHERE id = $2 AND venue_id = $3")
            .bind(status.as_str())
            .bind(message_id)
            .bind(venue_id)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| e.any())
    }
}

/// Helper trait to turn sqlx errors into [DatabaseError]
trait IntoDatabaseError {
    fn any(self) -> DatabaseError;
    fn conflict_or(self, resource: &'static str, field: &'static str, value: &str)
        -> DatabaseError;
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn conflict_or(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> DatabaseError {
        match &self {
            // unique_violation
            SqlxError::Database(e) if e.code().as_deref() == Some("23505") => {
                DatabaseError::Conflict {
                    resource,
                    field,
                    value: value.to_string(),
                }
            }
            _ => self.any(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::connect_options;

    #[test]
    fn statements_are_bounded_by_the_timeout() {
        let options =
            connect_options("postgres://neonpub@localhost/neonpub", Duration::from_secs(5))
                .unwrap();

        let server_options = options.get_options().unwrap_or_default();
        assert!(server_options.contains("statement_timeout=5000ms"));
    }
}
