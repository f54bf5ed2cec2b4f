use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// A venue hosting a karaoke night
#[derive(Debug, Clone, FromRow)]
pub struct VenueData {
    pub id: PrimaryKey,
    pub name: String,
    /// The code participants use to join, always upper case
    pub code: String,
    /// Argon2 hash of the admin password
    pub admin_password: String,
    /// The performance that is live, paused or being voted on, if any
    pub active_performance_id: Option<PrimaryKey>,
    pub created_at: DateTime<Utc>,
}

/// Someone in the audience of a venue
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ParticipantData {
    pub id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub nickname: String,
    /// Points collected from quizzes
    pub score: i32,
    pub joined_at: DateTime<Utc>,
}

/// Login session data for authentication
#[derive(Debug, Clone, FromRow)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub venue_id: PrimaryKey,
    /// Empty for the admin, who has no participant record
    pub participant_id: Option<PrimaryKey>,
    pub nickname: String,
    pub admin: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Queued,
    Performing,
    Completed,
    Rejected,
}

/// A song someone asked to sing
#[derive(Debug, Clone, Serialize)]
pub struct SongRequestData {
    pub id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub participant_id: PrimaryKey,
    pub nickname: String,
    pub title: String,
    pub artist: String,
    pub video_url: Option<String>,
    /// Whether `video_url` was found by the automatic search
    pub auto_searched: bool,
    pub status: RequestStatus,
    /// Ordinal among the queued requests of the venue, starting at 1
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceStatus {
    Live,
    Paused,
    Voting,
    Completed,
    Skipped,
}

/// One song being performed, from start to completion or skip
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceData {
    pub id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub request_id: PrimaryKey,
    /// The performer
    pub participant_id: PrimaryKey,
    pub nickname: String,
    pub song_title: String,
    pub song_artist: String,
    pub video_url: Option<String>,
    pub status: PerformanceStatus,
    /// Whether votes are accepted, independent of `status`
    pub voting_open: bool,
    pub average_score: f64,
    pub vote_count: i32,
    #[serde(skip)]
    pub vote_sum: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// A score given to a performance
#[derive(Debug, Clone, FromRow)]
pub struct VoteData {
    pub id: PrimaryKey,
    pub performance_id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub participant_id: PrimaryKey,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    Active,
    Ended,
}

/// A snapshot of a quiz question, including its answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub points: i32,
}

/// A run of several questions from one category
#[derive(Debug, Clone)]
pub struct QuizSessionData {
    pub id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub category: String,
    pub category_name: String,
    pub questions: Vec<Question>,
    /// Zero based index of the question being asked
    pub current_index: i32,
    pub total_questions: i32,
    pub status: QuizStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// A single live question, within a session or on its own
#[derive(Debug, Clone)]
pub struct QuizData {
    pub id: PrimaryKey,
    pub session_id: Option<PrimaryKey>,
    pub venue_id: PrimaryKey,
    pub category: Option<String>,
    pub category_name: Option<String>,
    pub question: Question,
    /// 1-based position of this question in its session
    pub question_number: i32,
    pub total_questions: i32,
    pub status: QuizStatus,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuizAnswerData {
    pub id: PrimaryKey,
    pub quiz_id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub participant_id: PrimaryKey,
    pub nickname: String,
    pub answer_index: i32,
    pub is_correct: bool,
    pub points_earned: i32,
    pub answered_at: DateTime<Utc>,
}

/// An emoji (and maybe a short message) thrown at the screen
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReactionData {
    pub id: PrimaryKey,
    pub venue_id: PrimaryKey,
    /// The performance that was active when sending, if any
    pub performance_id: Option<PrimaryKey>,
    pub participant_id: PrimaryKey,
    pub nickname: String,
    pub emoji: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Approved,
    Rejected,
}

/// A text message waiting for moderation before it is shown on screen
#[derive(Debug, Clone, Serialize)]
pub struct MessageData {
    pub id: PrimaryKey,
    pub venue_id: PrimaryKey,
    pub participant_id: PrimaryKey,
    pub nickname: String,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

/// Returned when a stored status string isn't known
#[derive(Debug)]
pub struct UnknownStatus(pub String);

impl Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown status {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

/// Implements string conversion of the status enums, used by the database layer
macro_rules! status_strings {
    ($kind:ty { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $kind {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $kind {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownStatus(other.to_string())),
                }
            }
        }

        impl Display for $kind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_strings!(RequestStatus {
    Pending => "pending",
    Queued => "queued",
    Performing => "performing",
    Completed => "completed",
    Rejected => "rejected",
});

status_strings!(PerformanceStatus {
    Live => "live",
    Paused => "paused",
    Voting => "voting",
    Completed => "completed",
    Skipped => "skipped",
});

status_strings!(QuizStatus {
    Active => "active",
    Ended => "ended",
});

status_strings!(MessageStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

impl PerformanceStatus {
    /// Completed and skipped performances never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

impl PerformanceData {
    /// Whether the performance occupies the venue's stage
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

impl Question {
    /// The text of the correct option
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_index).map(String::as_str)
    }
}

#[cfg(test)]
mod test {
    use super::{PerformanceStatus, RequestStatus};

    #[test]
    fn statuses_parse_their_own_names() {
        for status in [
            PerformanceStatus::Live,
            PerformanceStatus::Paused,
            PerformanceStatus::Voting,
            PerformanceStatus::Completed,
            PerformanceStatus::Skipped,
        ] {
            assert_eq!(status.as_str().parse::<PerformanceStatus>().unwrap(), status);
        }

        assert!("waiting".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn only_completed_and_skipped_are_terminal() {
        assert!(!PerformanceStatus::Live.is_terminal());
        assert!(!PerformanceStatus::Paused.is_terminal());
        assert!(!PerformanceStatus::Voting.is_terminal());
        assert!(PerformanceStatus::Completed.is_terminal());
        assert!(PerformanceStatus::Skipped.is_terminal());
    }
}
