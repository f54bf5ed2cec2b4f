use chrono::Utc;
use log::info;
use neonpub_core::round_to_cents;
use serde::Serialize;

use crate::{
    queue::compact_queue, CollabContext, CollabError, CollabEvent, CollabResult, Member,
    NewPerformance, NewVote, OptionalRecord, PerformanceData, PerformanceStatus,
    PerformanceUpdate, PrimaryKey, RequestStatus,
};

/// The lowest and highest score a vote may give
pub const SCORE_RANGE: std::ops::RangeInclusive<i32> = 1..=5;

/// The result of an accepted vote, as everyone gets to see it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteTally {
    pub performance_id: PrimaryKey,
    pub new_average: f64,
    pub vote_count: i32,
}

/// What skipping ahead led to
#[derive(Debug, Clone)]
pub enum NextOutcome {
    Started(PerformanceData),
    NoMoreSongs,
}

/// The lifecycle of performances, and the votes they receive.
///
/// A venue has at most one performance that is live, paused or voting, and the
/// venue refers to it as its active performance. Every transition runs under the
/// transition lock of the venue's room.
pub struct Performances {
    context: CollabContext,
}

impl Performances {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Starts performing a queued request
    pub async fn start(
        &self,
        member: &Member,
        request_id: PrimaryKey,
        video_url: Option<String>,
    ) -> CollabResult<PerformanceData> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        self.start_locked(member.venue_id, request_id, video_url)
            .await
    }

    pub async fn pause(
        &self,
        member: &Member,
        performance_id: PrimaryKey,
    ) -> CollabResult<PerformanceData> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let performance = self.performance(member.venue_id, performance_id).await?;
        expect_status(&performance, &[PerformanceStatus::Live], "paused")?;

        let performance = self
            .apply(PerformanceUpdate {
                id: performance_id,
                venue_id: member.venue_id,
                status: Some(PerformanceStatus::Paused),
                ..Default::default()
            })
            .await?;

        self.context
            .emit(member.venue_id, CollabEvent::PerformancePaused { performance_id });

        Ok(performance)
    }

    pub async fn resume(
        &self,
        member: &Member,
        performance_id: PrimaryKey,
    ) -> CollabResult<PerformanceData> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let performance = self.performance(member.venue_id, performance_id).await?;
        expect_status(&performance, &[PerformanceStatus::Paused], "resumed")?;

        let performance = self
            .apply(PerformanceUpdate {
                id: performance_id,
                venue_id: member.venue_id,
                status: Some(PerformanceStatus::Live),
                ..Default::default()
            })
            .await?;

        self.context
            .emit(member.venue_id, CollabEvent::PerformanceResumed { performance_id });

        Ok(performance)
    }

    /// Starts the performance over, live from the beginning
    pub async fn restart(
        &self,
        member: &Member,
        performance_id: PrimaryKey,
    ) -> CollabResult<PerformanceData> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let performance = self.performance(member.venue_id, performance_id).await?;
        expect_status(
            &performance,
            &[PerformanceStatus::Live, PerformanceStatus::Paused],
            "restarted",
        )?;

        let performance = self
            .apply(PerformanceUpdate {
                id: performance_id,
                venue_id: member.venue_id,
                status: Some(PerformanceStatus::Live),
                started_at: Some(Utc::now()),
                ..Default::default()
            })
            .await?;

        self.context.emit(
            member.venue_id,
            CollabEvent::PerformanceRestarted(performance.clone()),
        );

        Ok(performance)
    }

    /// Accepts votes while the song is still going
    pub async fn open_voting(
        &self,
        member: &Member,
        performance_id: PrimaryKey,
    ) -> CollabResult<PerformanceData> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let performance = self.performance(member.venue_id, performance_id).await?;
        expect_status(&performance, &[PerformanceStatus::Live], "opened for voting")?;

        let performance = self
            .apply(PerformanceUpdate {
                id: performance_id,
                venue_id: member.venue_id,
                voting_open: Some(true),
                ..Default::default()
            })
            .await?;

        info!("Voting opened on performance {}", performance_id);

        self.context.emit(
            member.venue_id,
            CollabEvent::VotingOpened {
                performance_id,
                performance: performance.clone(),
            },
        );

        Ok(performance)
    }

    /// Ends the song and waits for votes
    pub async fn end(
        &self,
        member: &Member,
        performance_id: PrimaryKey,
    ) -> CollabResult<PerformanceData> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let performance = self.performance(member.venue_id, performance_id).await?;
        expect_status(
            &performance,
            &[PerformanceStatus::Live, PerformanceStatus::Paused],
            "ended",
        )?;

        let performance = self
            .apply(PerformanceUpdate {
                id: performance_id,
                venue_id: member.venue_id,
                status: Some(PerformanceStatus::Voting),
                voting_open: Some(true),
                ended_at: Some(Utc::now()),
                ..Default::default()
            })
            .await?;

        self.complete_request(&performance).await?;

        info!("Performance {} ended, voting started", performance_id);

        self.context.emit(
            member.venue_id,
            CollabEvent::VotingStarted {
                performance_id,
                performance: performance.clone(),
            },
        );

        Ok(performance)
    }

    /// Completes the performance without scoring
    pub async fn finish(
        &self,
        member: &Member,
        performance_id: PrimaryKey,
    ) -> CollabResult<PerformanceData> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let performance = self.performance(member.venue_id, performance_id).await?;
        expect_status(
            &performance,
            &[PerformanceStatus::Live, PerformanceStatus::Paused],
            "finished",
        )?;

        let performance = self
            .apply(PerformanceUpdate {
                id: performance_id,
                venue_id: member.venue_id,
                status: Some(PerformanceStatus::Completed),
                voting_open: Some(false),
                ended_at: Some(Utc::now()),
                ..Default::default()
            })
            .await?;

        self.complete_request(&performance).await?;
        self.clear_active(member.venue_id).await?;

        info!("Performance {} finished", performance_id);

        self.context
            .emit(member.venue_id, CollabEvent::PerformanceFinished { performance_id });

        Ok(performance)
    }

    /// Stops accepting votes and completes the performance
    pub async fn close_voting(
        &self,
        member: &Member,
        performance_id: PrimaryKey,
    ) -> CollabResult<PerformanceData> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let performance = self.performance(member.venue_id, performance_id).await?;

        let closable = match performance.status {
            PerformanceStatus::Voting => true,
            PerformanceStatus::Live | PerformanceStatus::Paused => performance.voting_open,
            _ => false,
        };

        if !closable {
            return Err(CollabError::conflict(format!(
                "Voting is not open on a {} performance",
                performance.status
            )));
        }

        let performance = self
            .apply(PerformanceUpdate {
                id: performance_id,
                venue_id: member.venue_id,
                status: Some(PerformanceStatus::Completed),
                voting_open: Some(false),
                ended_at: performance.ended_at.is_none().then(Utc::now),
                ..Default::default()
            })
            .await?;

        self.complete_request(&performance).await?;
        self.clear_active(member.venue_id).await?;

        info!(
            "Voting closed on performance {}, average {} from {} vote(s)",
            performance_id, performance.average_score, performance.vote_count
        );

        self.context.emit(
            member.venue_id,
            CollabEvent::VotingClosed {
                performance_id,
                average_score: performance.average_score,
                vote_count: performance.vote_count,
            },
        );

        Ok(performance)
    }

    /// Skips the active performance, if any, and starts the next queued request
    pub async fn next(&self, member: &Member) -> CollabResult<NextOutcome> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let venue = self.context.venue(member.venue_id).await?;

        if let Some(active_id) = venue.active_performance_id {
            let active = self
                .context
                .database
                .performance_by_id(venue.id, active_id)
                .await?;

            if let Some(active) = active.filter(|p| p.is_active()) {
                self.apply(PerformanceUpdate {
                    id: active.id,
                    venue_id: venue.id,
                    status: Some(PerformanceStatus::Skipped),
                    voting_open: Some(false),
                    ended_at: Some(Utc::now()),
                    ..Default::default()
                })
                .await?;

                self.complete_request(&active).await?;
                info!("Performance {} skipped", active.id);
            }

            self.clear_active(venue.id).await?;
        }

        let next = self
            .context
            .database
            .requests_by_status(venue.id, &[RequestStatus::Queued], 1)
            .await?
            .into_iter()
            .next();

        match next {
            Some(request) => {
                let performance = self.start_locked(venue.id, request.id, None).await?;
                Ok(NextOutcome::Started(performance))
            }
            None => {
                info!("No more songs in venue {}", venue.id);
                self.context.emit(venue.id, CollabEvent::NoMoreSongs);
                Ok(NextOutcome::NoMoreSongs)
            }
        }
    }

    /// The active performance of the venue, if any
    pub async fn current(&self, member: &Member) -> CollabResult<Option<PerformanceData>> {
        let venue = self.context.venue(member.venue_id).await?;

        match venue.active_performance_id {
            Some(id) => Ok(self.context.database.performance_by_id(venue.id, id).await?),
            None => Ok(None),
        }
    }

    /// Performances of the venue, most recent first
    pub async fn history(&self, member: &Member) -> CollabResult<Vec<PerformanceData>> {
        Ok(self
            .context
            .database
            .performance_history(member.venue_id, self.context.config.listing_limit)
            .await?)
    }

    /// Scores a performance on behalf of a participant
    pub async fn vote(
        &self,
        member: &Member,
        performance_id: PrimaryKey,
        score: i32,
    ) -> CollabResult<VoteTally> {
        if !SCORE_RANGE.contains(&score) {
            return Err(CollabError::invalid(format!(
                "Score must be between {} and {}",
                SCORE_RANGE.start(),
                SCORE_RANGE.end()
            )));
        }

        let participant_id = member.participant()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let performance = self.performance(member.venue_id, performance_id).await?;

        if !performance.voting_open {
            return Err(CollabError::conflict("Voting is not open"));
        }

        if performance.participant_id == participant_id {
            return Err(CollabError::forbidden("You cannot vote for yourself"));
        }

        let db = &self.context.database;

        if db
            .vote_by_participant(performance_id, participant_id)
            .await?
            .is_some()
        {
            return Err(CollabError::conflict("You already voted"));
        }

        db.create_vote(NewVote {
            performance_id,
            venue_id: member.venue_id,
            participant_id,
            score,
        })
        .await?;

        let votes = db.votes_for_performance(performance_id).await?;
        let sum: i64 = votes.iter().map(|v| v.score as i64).sum();
        let count = votes.len() as i32;
        let average = round_to_cents(sum as f64 / count as f64);

        self.apply(PerformanceUpdate {
            id: performance_id,
            venue_id: member.venue_id,
            tally: Some((average, count, sum)),
            ..Default::default()
        })
        .await?;

        let tally = VoteTally {
            performance_id,
            new_average: average,
            vote_count: count,
        };

        self.context
            .emit(member.venue_id, CollabEvent::VoteReceived(tally.clone()));

        Ok(tally)
    }

    /// Starts a queued request. The transition lock must be held.
    async fn start_locked(
        &self,
        venue_id: PrimaryKey,
        request_id: PrimaryKey,
        video_url: Option<String>,
    ) -> CollabResult<PerformanceData> {
        let venue = self.context.venue(venue_id).await?;
        let db = &self.context.database;

        if let Some(active_id) = venue.active_performance_id {
            let active = db.performance_by_id(venue_id, active_id).await?;

            if active.is_some_and(|p| p.is_active()) {
                return Err(CollabError::conflict(
                    "Another performance is still in progress",
                ));
            }
        }

        let request = db
            .request_by_id(venue_id, request_id)
            .await
            .or_not_found("request", "id")?;

        if request.status != RequestStatus::Queued {
            return Err(CollabError::conflict(format!(
                "Request is {}, only queued requests can be performed",
                request.status
            )));
        }

        let performance = db
            .create_performance(NewPerformance {
                venue_id,
                request_id,
                participant_id: request.participant_id,
                nickname: request.nickname,
                song_title: request.title,
                song_artist: request.artist,
                video_url: video_url.or(request.video_url),
            })
            .await?;

        compact_queue(&self.context, venue_id).await?;

        info!(
            "{} started performing '{}' in venue {}",
            performance.nickname, performance.song_title, venue_id
        );

        self.context.emit(
            venue_id,
            CollabEvent::PerformanceStarted(performance.clone()),
        );

        Ok(performance)
    }

    async fn performance(
        &self,
        venue_id: PrimaryKey,
        performance_id: PrimaryKey,
    ) -> CollabResult<PerformanceData> {
        Ok(self
            .context
            .database
            .performance_by_id(venue_id, performance_id)
            .await
            .or_not_found("performance", "id")?)
    }

    /// Writes an update and reads the performance back
    async fn apply(&self, update: PerformanceUpdate) -> CollabResult<PerformanceData> {
        let (venue_id, performance_id) = (update.venue_id, update.id);

        self.context.database.update_performance(update).await?;
        self.performance(venue_id, performance_id).await
    }

    async fn complete_request(&self, performance: &PerformanceData) -> CollabResult<()> {
        self.context
            .database
            .set_request_status(
                performance.venue_id,
                performance.request_id,
                RequestStatus::Completed,
            )
            .await?;

        Ok(())
    }

    async fn clear_active(&self, venue_id: PrimaryKey) -> CollabResult<()> {
        self.context
            .database
            .set_active_performance(venue_id, None)
            .await?;

        Ok(())
    }
}

fn expect_status(
    performance: &PerformanceData,
    allowed: &[PerformanceStatus],
    action: &str,
) -> CollabResult<()> {
    if allowed.contains(&performance.status) {
        Ok(())
    } else {
        Err(CollabError::conflict(format!(
            "A {} performance cannot be {}",
            performance.status, action
        )))
    }
}

#[cfg(test)]
mod test {
    use crate::{testing::Harness, CollabError, NextOutcome, PerformanceStatus, RequestStatus};

    #[tokio::test]
    async fn a_night_from_request_to_closed_voting() {
        let mut harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let bob = harness.join("Bob").await;

        let request = harness.queued(&alice, "Imagine").await;
        assert_eq!(request.status, RequestStatus::Queued);
        assert_eq!(request.position, 1);

        let performances = &harness.collab.performances;
        let admin = &harness.admin;

        let performance = performances.start(admin, request.id, None).await.unwrap();
        assert_eq!(performance.status, PerformanceStatus::Live);
        assert_eq!(harness.venue().await.active_performance_id, Some(performance.id));

        let performance = performances.open_voting(admin, performance.id).await.unwrap();
        assert!(performance.voting_open);
        assert_eq!(performance.status, PerformanceStatus::Live);

        let tally = performances.vote(&bob, performance.id, 4).await.unwrap();
        assert_eq!(tally.new_average, 4.0);
        assert_eq!(tally.vote_count, 1);

        let performance = performances.close_voting(admin, performance.id).await.unwrap();
        assert_eq!(performance.status, PerformanceStatus::Completed);
        assert!(!performance.voting_open);
        assert_eq!(harness.venue().await.active_performance_id, None);

        assert_eq!(
            harness.event_types(),
            vec![
                "new_request",
                "queue_updated",
                "performance_started",
                "voting_opened",
                "vote_received",
                "voting_closed"
            ]
        );
    }

    #[tokio::test]
    async fn only_one_performance_at_a_time() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;

        let first = harness.queued(&alice, "Imagine").await;
        let second = harness.queued(&alice, "Woman").await;

        let performances = &harness.collab.performances;
        let admin = &harness.admin;

        let performance = performances.start(admin, first.id, None).await.unwrap();

        let result = performances.start(admin, second.id, None).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        // Still blocked while waiting for votes
        performances.end(admin, performance.id).await.unwrap();
        let result = performances.start(admin, second.id, None).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        performances.close_voting(admin, performance.id).await.unwrap();
        let next = performances.start(admin, second.id, None).await.unwrap();
        assert_eq!(harness.venue().await.active_performance_id, Some(next.id));
    }

    #[tokio::test]
    async fn starting_compacts_the_queue() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;

        let first = harness.queued(&alice, "Imagine").await;
        let second = harness.queued(&alice, "Woman").await;

        harness
            .collab
            .performances
            .start(&harness.admin, first.id, None)
            .await
            .unwrap();

        let queue = harness.collab.queue.list(&harness.admin).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!((queue[0].id, queue[0].position), (second.id, 1));
    }

    #[tokio::test]
    async fn pending_requests_cannot_be_started() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;

        let request = harness
            .collab
            .queue
            .request(
                &alice,
                crate::NewSongRequestInput {
                    title: "Imagine".to_string(),
                    artist: "John Lennon".to_string(),
                    video_url: None,
                },
            )
            .await
            .unwrap();

        let result = harness
            .collab
            .performances
            .start(&harness.admin, request.id, None)
            .await;

        assert!(matches!(result, Err(CollabError::Conflict(_))));
        assert_eq!(harness.venue().await.active_performance_id, None);
    }

    #[tokio::test]
    async fn lifecycle_rejects_invalid_transitions() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let request = harness.queued(&alice, "Imagine").await;

        let performances = &harness.collab.performances;
        let admin = &harness.admin;
        let performance = performances.start(admin, request.id, None).await.unwrap();

        let result = performances.resume(admin, performance.id).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        let result = performances.close_voting(admin, performance.id).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        let paused = performances.pause(admin, performance.id).await.unwrap();
        assert_eq!(paused.status, PerformanceStatus::Paused);

        let result = performances.open_voting(admin, performance.id).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        let resumed = performances.resume(admin, performance.id).await.unwrap();
        assert_eq!(resumed.status, PerformanceStatus::Live);

        let restarted = performances.restart(admin, performance.id).await.unwrap();
        assert_eq!(restarted.status, PerformanceStatus::Live);
        assert!(restarted.started_at >= performance.started_at);

        let finished = performances.finish(admin, performance.id).await.unwrap();
        assert_eq!(finished.status, PerformanceStatus::Completed);
        assert!(!finished.voting_open);
        assert!(finished.ended_at.is_some());

        for result in [
            performances.pause(admin, performance.id).await,
            performances.end(admin, performance.id).await,
            performances.finish(admin, performance.id).await,
            performances.restart(admin, performance.id).await,
        ] {
            assert!(matches!(result, Err(CollabError::Conflict(_))));
        }

        assert_eq!(harness.venue().await.active_performance_id, None);

        let request = harness
            .collab
            .context
            .database
            .request_by_id(harness.venue.id, request.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, RequestStatus::Completed);
    }

    #[tokio::test]
    async fn ending_waits_for_votes() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let bob = harness.join("Bob").await;
        let request = harness.queued(&alice, "Imagine").await;

        let performances = &harness.collab.performances;
        let admin = &harness.admin;
        let performance = performances.start(admin, request.id, None).await.unwrap();

        let ended = performances.end(admin, performance.id).await.unwrap();
        assert_eq!(ended.status, PerformanceStatus::Voting);
        assert!(ended.voting_open);
        assert!(ended.ended_at.is_some());
        assert_eq!(harness.venue().await.active_performance_id, Some(performance.id));

        performances.vote(&bob, performance.id, 5).await.unwrap();

        let closed = performances.close_voting(admin, performance.id).await.unwrap();
        assert_eq!(closed.ended_at, ended.ended_at);
        assert_eq!(closed.vote_count, 1);
    }

    #[tokio::test]
    async fn votes_are_averaged_and_rounded() {
        let mut harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let request = harness.queued(&alice, "Imagine").await;

        let performances = &harness.collab.performances;
        let performance = performances
            .start(&harness.admin, request.id, None)
            .await
            .unwrap();
        performances
            .open_voting(&harness.admin, performance.id)
            .await
            .unwrap();

        let mut last = None;
        for (nickname, score) in [("Bob", 5), ("Carol", 5), ("Dave", 4)] {
            let voter = harness.join(nickname).await;
            last = Some(performances.vote(&voter, performance.id, score).await.unwrap());
        }

        let tally = last.unwrap();
        assert_eq!(tally.new_average, 4.67);
        assert_eq!(tally.vote_count, 3);

        let stored = performances.current(&alice).await.unwrap().unwrap();
        assert_eq!(stored.average_score, 4.67);
        assert_eq!(stored.vote_count, 3);

        let events = harness.events();
        let received = events.last().unwrap();
        assert_eq!(received["type"], "vote_received");
        assert_eq!(received["data"]["new_average"], 4.67);
        assert_eq!(received["data"]["vote_count"], 3);
        assert!(received["data"].get("score").is_none());
        assert!(received["data"].get("participant_id").is_none());
    }

    #[tokio::test]
    async fn votes_are_refused_when_invalid() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let bob = harness.join("Bob").await;
        let request = harness.queued(&alice, "Imagine").await;

        let performances = &harness.collab.performances;
        let performance = performances
            .start(&harness.admin, request.id, None)
            .await
            .unwrap();

        let result = performances.vote(&bob, performance.id, 4).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        performances
            .open_voting(&harness.admin, performance.id)
            .await
            .unwrap();

        for score in [0, 6] {
            let result = performances.vote(&bob, performance.id, score).await;
            assert!(matches!(result, Err(CollabError::InvalidArgument(_))));
        }

        let result = performances.vote(&alice, performance.id, 5).await;
        assert!(matches!(result, Err(CollabError::Forbidden(_))));

        performances.vote(&bob, performance.id, 3).await.unwrap();
        let result = performances.vote(&bob, performance.id, 3).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        let result = performances.vote(&harness.admin, performance.id, 3).await;
        assert!(matches!(result, Err(CollabError::Forbidden(_))));

        let stored = performances.current(&bob).await.unwrap().unwrap();
        assert_eq!(stored.vote_count, 1);
    }

    #[tokio::test]
    async fn next_skips_and_starts_the_following_request() {
        let mut harness = Harness::new().await;
        let alice = harness.join("Alice").await;

        let first = harness.queued(&alice, "Imagine").await;
        let second = harness.queued(&alice, "Woman").await;

        let performances = &harness.collab.performances;
        let admin = &harness.admin;

        let performance = performances.start(admin, first.id, None).await.unwrap();

        let outcome = performances.next(admin).await.unwrap();
        let NextOutcome::Started(next) = outcome else {
            panic!("expected the next request to start");
        };
        assert_eq!(next.request_id, second.id);

        let history = performances.history(admin).await.unwrap();
        let skipped = history.iter().find(|p| p.id == performance.id).unwrap();
        assert_eq!(skipped.status, PerformanceStatus::Skipped);
        assert_eq!(harness.venue().await.active_performance_id, Some(next.id));

        let outcome = performances.next(admin).await.unwrap();
        assert!(matches!(outcome, NextOutcome::NoMoreSongs));
        assert_eq!(harness.venue().await.active_performance_id, None);

        let types = harness.event_types();
        assert!(types.ends_with(&[
            "performance_started".to_string(),
            "performance_started".to_string(),
            "no_more_songs".to_string(),
        ]));
    }

    #[tokio::test]
    async fn next_with_an_empty_queue() {
        let mut harness = Harness::new().await;

        let outcome = harness.collab.performances.next(&harness.admin).await.unwrap();

        assert!(matches!(outcome, NextOutcome::NoMoreSongs));
        assert_eq!(harness.events(), vec![serde_json::json!({ "type": "no_more_songs" })]);
    }

    #[tokio::test]
    async fn lifecycle_is_admin_only_and_venue_scoped() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let request = harness.queued(&alice, "Imagine").await;

        let performances = &harness.collab.performances;

        let result = performances.start(&alice, request.id, None).await;
        assert!(matches!(result, Err(CollabError::Forbidden(_))));

        let result = performances.next(&alice).await;
        assert!(matches!(result, Err(CollabError::Forbidden(_))));

        let performance = performances
            .start(&harness.admin, request.id, None)
            .await
            .unwrap();

        let (_, other_admin) = Harness::create_venue(&harness.collab, "OTHER001").await;
        let result = performances.pause(&other_admin, performance.id).await;
        assert!(matches!(result, Err(CollabError::NotFound("performance"))));

        let current = performances.current(&other_admin).await.unwrap();
        assert!(current.is_none());
    }

    #[tokio::test]
    async fn video_url_given_at_start_wins() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let request = harness.queued(&alice, "Imagine").await;

        let performance = harness
            .collab
            .performances
            .start(
                &harness.admin,
                request.id,
                Some("https://www.youtube.com/watch?v=live".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(
            performance.video_url.as_deref(),
            Some("https://www.youtube.com/watch?v=live")
        );
    }
}
