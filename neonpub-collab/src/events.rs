use serde::Serialize;

use crate::{
    LeaderboardEntry, MessageData, PerformanceData, PrimaryKey, QuizResults, QuizView,
    ReactionData, SongRequestData, VoteTally,
};

/// Events pushed to every live channel of a venue.
///
/// On the wire every event is an object with a `type` naming the variant in snake case,
/// and its payload under `data`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CollabEvent {
    /// Someone asked to sing a song
    NewRequest(SongRequestData),
    /// The queue was approved into, rejected from or reordered
    QueueUpdated,
    PerformanceStarted(PerformanceData),
    PerformancePaused {
        performance_id: PrimaryKey,
    },
    PerformanceResumed {
        performance_id: PrimaryKey,
    },
    PerformanceRestarted(PerformanceData),
    /// Votes are accepted while the song is still being performed
    VotingOpened {
        performance_id: PrimaryKey,
        performance: PerformanceData,
    },
    /// The performance ended and is waiting for votes
    VotingStarted {
        performance_id: PrimaryKey,
        performance: PerformanceData,
    },
    /// The performance completed without scoring
    PerformanceFinished {
        performance_id: PrimaryKey,
    },
    VotingClosed {
        performance_id: PrimaryKey,
        average_score: f64,
        vote_count: i32,
    },
    /// Skipping ahead found an empty queue
    NoMoreSongs,
    /// Carries the tally only, never who voted what
    VoteReceived(VoteTally),
    Reaction(ReactionData),
    /// A message is waiting for moderation
    NewMessage(MessageData),
    MessageApproved(MessageData),
    QuizStarted(QuizView),
    QuizEnded(QuizResults),
    QuizSessionEnded {
        session_id: PrimaryKey,
        leaderboard: Vec<LeaderboardEntry>,
    },
    /// A visual effect for the screens of the venue
    Effect {
        effect_type: String,
        data: serde_json::Value,
    },
}

impl CollabEvent {
    /// The wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewRequest(_) => "new_request",
            Self::QueueUpdated => "queue_updated",
            Self::PerformanceStarted(_) => "performance_started",
            Self::PerformancePaused { .. } => "performance_paused",
            Self::PerformanceResumed { .. } => "performance_resumed",
            Self::PerformanceRestarted(_) => "performance_restarted",
            Self::VotingOpened { .. } => "voting_opened",
            Self::VotingStarted { .. } => "voting_started",
            Self::PerformanceFinished { .. } => "performance_finished",
            Self::VotingClosed { .. } => "voting_closed",
            Self::NoMoreSongs => "no_more_songs",
            Self::VoteReceived(_) => "vote_received",
            Self::Reaction(_) => "reaction",
            Self::NewMessage(_) => "new_message",
            Self::MessageApproved(_) => "message_approved",
            Self::QuizStarted(_) => "quiz_started",
            Self::QuizEnded(_) => "quiz_ended",
            Self::QuizSessionEnded { .. } => "quiz_session_ended",
            Self::Effect { .. } => "effect",
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::{json, Value};

    use crate::VoteTally;

    use super::CollabEvent;

    fn wire(event: &CollabEvent) -> Value {
        serde_json::to_value(event).unwrap()
    }

    #[test]
    fn events_are_tagged_with_their_name() {
        let event = CollabEvent::PerformancePaused { performance_id: 7 };
        let value = wire(&event);

        assert_eq!(value["type"], event.name());
        assert_eq!(value["data"], json!({ "performance_id": 7 }));
    }

    #[test]
    fn events_without_payload_only_carry_a_type() {
        assert_eq!(
            wire(&CollabEvent::NoMoreSongs),
            json!({ "type": "no_more_songs" })
        );
        assert_eq!(
            wire(&CollabEvent::QueueUpdated),
            json!({ "type": "queue_updated" })
        );
    }

    #[test]
    fn vote_received_only_carries_the_tally() {
        let event = CollabEvent::VoteReceived(VoteTally {
            performance_id: 3,
            new_average: 4.5,
            vote_count: 2,
        });

        assert_eq!(
            wire(&event),
            json!({
                "type": "vote_received",
                "data": { "performance_id": 3, "new_average": 4.5, "vote_count": 2 }
            })
        );
    }
}
