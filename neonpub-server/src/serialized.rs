//! All schemas that are exposed from endpoints are defined here
//! along with the [ToSerialized] impls

use chrono::{DateTime, Utc};
use neonpub_collab::{
    AnswerOutcome, CategorySummary, DisplaySnapshot, LeaderboardEntry, Login, Member,
    MessageData, NextOutcome, NextQuestion, PerformanceData, QuizResults, QuizView,
    ReactionData, ReactionQuota, SentReaction, SongRequestData, VenueData, VenueView,
    VideoCandidate, VoteTally,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct Venue {
    id: i32,
    name: String,
    code: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct User {
    venue_id: i32,
    /// Absent for the admin
    participant_id: Option<i32>,
    nickname: String,
    /// Either `audience` or `admin`
    role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResult {
    token: String,
    user: User,
    venue: Venue,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SongRequest {
    id: i32,
    participant_id: i32,
    nickname: String,
    title: String,
    artist: String,
    video_url: Option<String>,
    auto_searched: bool,
    /// One of `pending`, `queued`, `performing`, `completed`, `rejected`
    status: String,
    position: i32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Performance {
    id: i32,
    request_id: i32,
    participant_id: i32,
    nickname: String,
    song_title: String,
    song_artist: String,
    video_url: Option<String>,
    /// One of `live`, `paused`, `voting`, `completed`, `skipped`
    status: String,
    voting_open: bool,
    average_score: f64,
    vote_count: i32,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NextResult {
    Started { performance: Performance },
    NoMoreSongs {},
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Tally {
    performance_id: i32,
    new_average: f64,
    vote_count: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Reaction {
    id: i32,
    performance_id: Option<i32>,
    participant_id: i32,
    nickname: String,
    emoji: String,
    message: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReactionResult {
    reaction: Reaction,
    remaining: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Quota {
    remaining: u32,
    limit: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Message {
    id: i32,
    participant_id: i32,
    nickname: String,
    text: String,
    /// One of `pending`, `approved`, `rejected`
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Category {
    id: String,
    name: String,
    description: String,
    icon: String,
    questions_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Quiz {
    id: i32,
    session_id: Option<i32>,
    category: Option<String>,
    category_name: Option<String>,
    question: String,
    options: Vec<String>,
    points: i32,
    question_number: i32,
    total_questions: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuizResult {
    quiz_id: i32,
    correct_answer: usize,
    correct_option: String,
    winners: Vec<String>,
    total_answers: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResult {
    is_correct: bool,
    points_earned: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardItem {
    id: i32,
    nickname: String,
    score: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NextQuestionResult {
    Started {
        quiz: Quiz,
    },
    SessionEnded {
        session_id: i32,
        leaderboard: Vec<LeaderboardItem>,
    },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Video {
    video_id: String,
    title: String,
    channel: String,
    thumbnail: String,
    url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Display {
    venue: Venue,
    current_performance: Option<Performance>,
    queue: Vec<SongRequest>,
    leaderboard: Vec<LeaderboardItem>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl<I, O> ToSerialized<Option<O>> for Option<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Option<O> {
        self.as_ref().map(|x| x.to_serialized())
    }
}

impl ToSerialized<Venue> for VenueData {
    fn to_serialized(&self) -> Venue {
        Venue {
            id: self.id,
            name: self.name.clone(),
            code: self.code.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Venue> for VenueView {
    fn to_serialized(&self) -> Venue {
        Venue {
            id: self.id,
            name: self.name.clone(),
            code: self.code.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<User> for Member {
    fn to_serialized(&self) -> User {
        User {
            venue_id: self.venue_id,
            participant_id: self.participant_id,
            nickname: self.nickname.clone(),
            role: if self.is_admin() { "admin" } else { "audience" }.to_string(),
        }
    }
}

impl ToSerialized<LoginResult> for Login {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.member.to_serialized(),
            venue: self.venue.to_serialized(),
        }
    }
}

impl ToSerialized<SongRequest> for SongRequestData {
    fn to_serialized(&self) -> SongRequest {
        SongRequest {
            id: self.id,
            participant_id: self.participant_id,
            nickname: self.nickname.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            video_url: self.video_url.clone(),
            auto_searched: self.auto_searched,
            status: self.status.to_string(),
            position: self.position,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Performance> for PerformanceData {
    fn to_serialized(&self) -> Performance {
        Performance {
            id: self.id,
            request_id: self.request_id,
            participant_id: self.participant_id,
            nickname: self.nickname.clone(),
            song_title: self.song_title.clone(),
            song_artist: self.song_artist.clone(),
            video_url: self.video_url.clone(),
            status: self.status.to_string(),
            voting_open: self.voting_open,
            average_score: self.average_score,
            vote_count: self.vote_count,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}

impl ToSerialized<NextResult> for NextOutcome {
    fn to_serialized(&self) -> NextResult {
        match self {
            NextOutcome::Started(performance) => NextResult::Started {
                performance: performance.to_serialized(),
            },
            NextOutcome::NoMoreSongs => NextResult::NoMoreSongs {},
        }
    }
}

impl ToSerialized<Tally> for VoteTally {
    fn to_serialized(&self) -> Tally {
        Tally {
            performance_id: self.performance_id,
            new_average: self.new_average,
            vote_count: self.vote_count,
        }
    }
}

impl ToSerialized<Reaction> for ReactionData {
    fn to_serialized(&self) -> Reaction {
        Reaction {
            id: self.id,
            performance_id: self.performance_id,
            participant_id: self.participant_id,
            nickname: self.nickname.clone(),
            emoji: self.emoji.clone(),
            message: self.message.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<ReactionResult> for SentReaction {
    fn to_serialized(&self) -> ReactionResult {
        ReactionResult {
            reaction: self.reaction.to_serialized(),
            remaining: self.remaining,
        }
    }
}

impl ToSerialized<Quota> for ReactionQuota {
    fn to_serialized(&self) -> Quota {
        Quota {
            remaining: self.remaining,
            limit: self.limit,
        }
    }
}

impl ToSerialized<Message> for MessageData {
    fn to_serialized(&self) -> Message {
        Message {
            id: self.id,
            participant_id: self.participant_id,
            nickname: self.nickname.clone(),
            text: self.text.clone(),
            status: self.status.to_string(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Category> for CategorySummary {
    fn to_serialized(&self) -> Category {
        Category {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
            questions_count: self.questions_count,
        }
    }
}

impl ToSerialized<Quiz> for QuizView {
    fn to_serialized(&self) -> Quiz {
        Quiz {
            id: self.id,
            session_id: self.session_id,
            category: self.category.clone(),
            category_name: self.category_name.clone(),
            question: self.question.clone(),
            options: self.options.clone(),
            points: self.points,
            question_number: self.question_number,
            total_questions: self.total_questions,
        }
    }
}

impl ToSerialized<QuizResult> for QuizResults {
    fn to_serialized(&self) -> QuizResult {
        QuizResult {
            quiz_id: self.quiz_id,
            correct_answer: self.correct_answer,
            correct_option: self.correct_option.clone(),
            winners: self.winners.clone(),
            total_answers: self.total_answers,
        }
    }
}

impl ToSerialized<AnswerResult> for AnswerOutcome {
    fn to_serialized(&self) -> AnswerResult {
        AnswerResult {
            is_correct: self.is_correct,
            points_earned: self.points_earned,
        }
    }
}

impl ToSerialized<LeaderboardItem> for LeaderboardEntry {
    fn to_serialized(&self) -> LeaderboardItem {
        LeaderboardItem {
            id: self.id,
            nickname: self.nickname.clone(),
            score: self.score,
        }
    }
}

impl ToSerialized<NextQuestionResult> for NextQuestion {
    fn to_serialized(&self) -> NextQuestionResult {
        match self {
            NextQuestion::Started(quiz) => NextQuestionResult::Started {
                quiz: quiz.to_serialized(),
            },
            NextQuestion::SessionEnded {
                session_id,
                leaderboard,
            } => NextQuestionResult::SessionEnded {
                session_id: *session_id,
                leaderboard: leaderboard.to_serialized(),
            },
        }
    }
}

impl ToSerialized<Video> for VideoCandidate {
    fn to_serialized(&self) -> Video {
        Video {
            video_id: self.video_id.clone(),
            title: self.title.clone(),
            channel: self.channel.clone(),
            thumbnail: self.thumbnail.clone(),
            url: self.url.clone(),
        }
    }
}

impl ToSerialized<Display> for DisplaySnapshot {
    fn to_serialized(&self) -> Display {
        Display {
            venue: self.venue.to_serialized(),
            current_performance: self.current_performance.to_serialized(),
            queue: self.queue.to_serialized(),
            leaderboard: self.leaderboard.to_serialized(),
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use neonpub_collab::{Member, NextQuestion, Role, VenueData};
    use serde_json::json;

    use super::{NextQuestionResult, ToSerialized, User, Venue};

    #[test]
    fn venues_hide_the_admin_password() {
        let venue = VenueData {
            id: 1,
            name: "Neon Pub".to_string(),
            code: "NEON0001".to_string(),
            admin_password: "$argon2id$...".to_string(),
            active_performance_id: None,
            created_at: Utc::now(),
        };

        let serialized: Venue = venue.to_serialized();
        let json = serde_json::to_value(serialized).unwrap();

        assert_eq!(json["code"], "NEON0001");
        assert!(json.get("admin_password").is_none());
    }

    #[test]
    fn admins_are_serialized_with_their_role() {
        let member = Member {
            venue_id: 1,
            participant_id: None,
            nickname: "Admin".to_string(),
            role: Role::Admin,
        };

        let serialized: User = member.to_serialized();
        let json = serde_json::to_value(serialized).unwrap();

        assert_eq!(json["role"], "admin");
        assert!(json["participant_id"].is_null());
    }

    #[test]
    fn ended_sessions_are_tagged() {
        let next = NextQuestion::SessionEnded {
            session_id: 4,
            leaderboard: vec![],
        };

        let serialized: NextQuestionResult = next.to_serialized();

        assert_eq!(
            serde_json::to_value(serialized).unwrap(),
            json!({ "status": "session_ended", "session_id": 4, "leaderboard": [] })
        );
    }
}
