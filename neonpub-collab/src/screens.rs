use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    CollabContext, CollabError, CollabResult, LeaderboardEntry, ParticipantData, PerformanceData,
    PrimaryKey, RequestStatus, SongRequestData, VenueData,
};

/// What anyone may know about a venue
#[derive(Debug, Clone, Serialize)]
pub struct VenueView {
    pub id: PrimaryKey,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the big screen of a venue shows, in one read
#[derive(Debug, Clone, Serialize)]
pub struct DisplaySnapshot {
    pub venue: VenueView,
    pub current_performance: Option<PerformanceData>,
    pub queue: Vec<SongRequestData>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Read-only views for the screens of a venue, which need no login
pub struct Screens {
    context: CollabContext,
}

impl Screens {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn snapshot(&self, code: &str) -> CollabResult<DisplaySnapshot> {
        let config = &self.context.config;
        let db = &self.context.database;

        let venue = db
            .venue_by_code(&code.to_ascii_uppercase())
            .await?
            .ok_or(CollabError::NotFound("venue"))?;

        let current_performance = match venue.active_performance_id {
            Some(id) => db.performance_by_id(venue.id, id).await?,
            None => None,
        };

        let queue = db
            .requests_by_status(venue.id, &[RequestStatus::Queued], config.display_queue_size)
            .await?;

        let leaderboard = db
            .leaderboard(venue.id, config.display_leaderboard_size)
            .await?
            .into_iter()
            .map(ParticipantData::into)
            .collect();

        Ok(DisplaySnapshot {
            venue: venue.into(),
            current_performance,
            queue,
            leaderboard,
        })
    }
}

impl From<VenueData> for VenueView {
    fn from(venue: VenueData) -> Self {
        Self {
            id: venue.id,
            name: venue.name,
            code: venue.code,
            created_at: venue.created_at,
        }
    }
}

#[cfg(test)]
mod test {
    use neonpub_core::Config;

    use crate::{testing::Harness, CollabError, CustomQuestion};

    #[tokio::test]
    async fn snapshot_of_a_busy_night() {
        let harness = Harness::with_config(Config {
            display_queue_size: 2,
            ..Default::default()
        })
        .await;
        let alice = harness.join("Alice").await;

        let first = harness.queued(&alice, "Imagine").await;
        for title in ["Woman", "Jealous Guy", "Mind Games"] {
            harness.queued(&alice, title).await;
        }

        harness
            .collab
            .performances
            .start(&harness.admin, first.id, None)
            .await
            .unwrap();

        let quiz = harness
            .collab
            .quizzes
            .start(
                &harness.admin,
                CustomQuestion {
                    question: "2 + 2?".to_string(),
                    options: vec!["4".to_string(), "5".to_string()],
                    correct_index: 0,
                    points: None,
                },
            )
            .await
            .unwrap();
        harness.collab.quizzes.answer(&alice, quiz.id, 0).await.unwrap();

        let snapshot = harness.collab.screens.snapshot("neon0001").await.unwrap();

        assert_eq!(snapshot.venue.code, "NEON0001");
        assert_eq!(
            snapshot.current_performance.map(|p| p.song_title).as_deref(),
            Some("Imagine")
        );

        let titles: Vec<_> = snapshot.queue.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Woman", "Jealous Guy"]);

        assert_eq!(snapshot.leaderboard.len(), 1);
        assert_eq!(snapshot.leaderboard[0].score, 10);
    }

    #[tokio::test]
    async fn snapshot_of_an_unknown_venue() {
        let harness = Harness::new().await;

        let result = harness.collab.screens.snapshot("NOPE0000").await;
        assert!(matches!(result, Err(CollabError::NotFound("venue"))));
    }

    #[tokio::test]
    async fn snapshot_never_exposes_the_password() {
        let harness = Harness::new().await;

        let snapshot = harness.collab.screens.snapshot("NEON0001").await.unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();

        assert!(json["venue"].get("admin_password").is_none());
        assert!(json["current_performance"].is_null());
    }
}
