use std::collections::HashSet;

use log::info;
use url::Url;

use crate::{
    CollabContext, CollabError, CollabEvent, CollabResult, Member, NewSongRequest,
    OptionalRecord, PrimaryKey, RequestStatus, Search, SongRequestData,
};

/// Statuses of requests still waiting for their turn
const WAITING: [RequestStatus; 2] = [RequestStatus::Pending, RequestStatus::Queued];

/// A song request as submitted by a participant
#[derive(Debug, Clone)]
pub struct NewSongRequestInput {
    pub title: String,
    pub artist: String,
    pub video_url: Option<String>,
}

/// The song queue of every venue.
///
/// Queued requests always hold the positions 1..N in the order they will be performed.
/// Pending requests keep the position they were given when submitted.
pub struct Queue {
    context: CollabContext,
    search: Search,
}

impl Queue {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            search: Search::new(context),
        }
    }

    /// Submits a song request, pending until the admin approves it
    pub async fn request(
        &self,
        member: &Member,
        input: NewSongRequestInput,
    ) -> CollabResult<SongRequestData> {
        let participant_id = member.participant()?;

        let title = input.title.trim().to_string();
        let artist = input.artist.trim().to_string();

        if title.is_empty() {
            return Err(CollabError::invalid("A title is required"));
        }

        let mut video_url = match input.video_url.filter(|u| !u.trim().is_empty()) {
            Some(url) => Some(validate_video_url(url.trim())?),
            None => None,
        };

        let mut auto_searched = false;

        if video_url.is_none() && self.context.config.auto_search {
            video_url = self.search.first_video(&title, &artist).await;
            auto_searched = video_url.is_some();
        }

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let waiting = self
            .context
            .database
            .count_requests(member.venue_id, &WAITING)
            .await?;

        let request = self
            .context
            .database
            .create_request(NewSongRequest {
                venue_id: member.venue_id,
                participant_id,
                nickname: member.nickname.clone(),
                title,
                artist,
                video_url,
                auto_searched,
                position: waiting as i32 + 1,
            })
            .await?;

        info!(
            "{} requested '{}' in venue {}",
            request.nickname, request.title, request.venue_id
        );

        self.context
            .emit(member.venue_id, CollabEvent::NewRequest(request.clone()));

        Ok(request)
    }

    /// Pending and queued requests, by position
    pub async fn list(&self, member: &Member) -> CollabResult<Vec<SongRequestData>> {
        Ok(self
            .context
            .database
            .requests_by_status(member.venue_id, &WAITING, self.context.config.listing_limit)
            .await?)
    }

    /// The requests of the acting participant, newest first
    pub async fn mine(&self, member: &Member) -> CollabResult<Vec<SongRequestData>> {
        let participant_id = member.participant()?;

        Ok(self
            .context
            .database
            .requests_by_participant(
                member.venue_id,
                participant_id,
                self.context.config.listing_limit,
            )
            .await?)
    }

    /// Moves a pending request to the end of the queue
    pub async fn approve(
        &self,
        member: &Member,
        request_id: PrimaryKey,
    ) -> CollabResult<SongRequestData> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let request = self.request_by_id(member.venue_id, request_id).await?;

        if request.status != RequestStatus::Pending {
            return Err(CollabError::conflict(format!(
                "Request is {}, only pending requests can be approved",
                request.status
            )));
        }

        let queued = self.queued(member.venue_id).await?;
        let last = queued.iter().map(|r| r.position).max().unwrap_or(0);

        let db = &self.context.database;
        db.set_request_status(member.venue_id, request_id, RequestStatus::Queued)
            .await?;
        db.set_request_position(member.venue_id, request_id, last + 1)
            .await?;

        compact_queue(&self.context, member.venue_id).await?;
        self.context.emit(member.venue_id, CollabEvent::QueueUpdated);

        self.request_by_id(member.venue_id, request_id).await
    }

    /// Refuses a request that is still waiting
    pub async fn reject(
        &self,
        member: &Member,
        request_id: PrimaryKey,
    ) -> CollabResult<SongRequestData> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let request = self.request_by_id(member.venue_id, request_id).await?;

        if !WAITING.contains(&request.status) {
            return Err(CollabError::conflict(format!(
                "Request is {}, it can no longer be rejected",
                request.status
            )));
        }

        self.context
            .database
            .set_request_status(member.venue_id, request_id, RequestStatus::Rejected)
            .await?;

        compact_queue(&self.context, member.venue_id).await?;
        self.context.emit(member.venue_id, CollabEvent::QueueUpdated);

        self.request_by_id(member.venue_id, request_id).await
    }

    /// Rewrites the queue in the given order.
    /// The ids must be exactly the queued requests of the venue.
    pub async fn reorder(
        &self,
        member: &Member,
        order: &[PrimaryKey],
    ) -> CollabResult<Vec<SongRequestData>> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let queued: HashSet<_> = self
            .queued(member.venue_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        let given: HashSet<_> = order.iter().copied().collect();

        if given.len() != order.len() {
            return Err(CollabError::invalid("The order contains duplicates"));
        }

        if given != queued {
            return Err(CollabError::invalid(
                "The order must contain every queued request and nothing else",
            ));
        }

        for (index, request_id) in order.iter().enumerate() {
            self.context
                .database
                .set_request_position(member.venue_id, *request_id, index as i32 + 1)
                .await?;
        }

        self.context.emit(member.venue_id, CollabEvent::QueueUpdated);

        self.queued(member.venue_id).await
    }

    async fn queued(&self, venue_id: PrimaryKey) -> CollabResult<Vec<SongRequestData>> {
        Ok(self
            .context
            .database
            .requests_by_status(venue_id, &[RequestStatus::Queued], usize::MAX)
            .await?)
    }

    async fn request_by_id(
        &self,
        venue_id: PrimaryKey,
        request_id: PrimaryKey,
    ) -> CollabResult<SongRequestData> {
        Ok(self
            .context
            .database
            .request_by_id(venue_id, request_id)
            .await
            .or_not_found("request", "id")?)
    }
}

/// Renumbers the queued requests of a venue to 1..N, keeping their order.
/// Callers hold the transition lock of the venue.
pub(crate) async fn compact_queue(context: &CollabContext, venue_id: PrimaryKey) -> CollabResult<()> {
    let queued = context
        .database
        .requests_by_status(venue_id, &[RequestStatus::Queued], usize::MAX)
        .await?;

    for (index, request) in queued.iter().enumerate() {
        let position = index as i32 + 1;

        if request.position != position {
            context
                .database
                .set_request_position(venue_id, request.id, position)
                .await?;
        }
    }

    Ok(())
}

/// Accepts absolute http(s) URLs only
fn validate_video_url(url: &str) -> CollabResult<String> {
    let parsed = Url::parse(url).map_err(|_| CollabError::invalid("Invalid video URL"))?;

    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(parsed.to_string()),
        _ => Err(CollabError::invalid("The video URL must be http or https")),
    }
}

#[cfg(test)]
mod test {
    use neonpub_core::Config;

    use crate::{testing::Harness, CollabError, NewSongRequestInput, RequestStatus};

    fn song(title: &str) -> NewSongRequestInput {
        NewSongRequestInput {
            title: title.to_string(),
            artist: "John Lennon".to_string(),
            video_url: None,
        }
    }

    #[tokio::test]
    async fn requests_are_positioned_after_waiting_ones() {
        let mut harness = Harness::new().await;
        let alice = harness.join("Alice").await;

        let first = harness.collab.queue.request(&alice, song("Imagine")).await.unwrap();
        let second = harness.collab.queue.request(&alice, song("Jealous Guy")).await.unwrap();

        assert_eq!(first.status, RequestStatus::Pending);
        assert_eq!(first.position, 1);
        assert_eq!(second.position, 2);
        assert_eq!(harness.event_types(), vec!["new_request", "new_request"]);

        let mine = harness.collab.queue.mine(&alice).await.unwrap();
        assert_eq!(mine[0].id, second.id);
    }

    #[tokio::test]
    async fn approving_appends_to_the_queue() {
        let mut harness = Harness::new().await;
        let alice = harness.join("Alice").await;

        let first = harness.collab.queue.request(&alice, song("Imagine")).await.unwrap();
        let second = harness.collab.queue.request(&alice, song("Woman")).await.unwrap();

        // Approved out of submission order
        let approved = harness.collab.queue.approve(&harness.admin, second.id).await.unwrap();
        assert_eq!(approved.status, RequestStatus::Queued);
        assert_eq!(approved.position, 1);

        let approved = harness.collab.queue.approve(&harness.admin, first.id).await.unwrap();
        assert_eq!(approved.position, 2);

        harness.events();
        let again = harness.collab.queue.approve(&harness.admin, first.id).await;
        assert!(matches!(again, Err(CollabError::Conflict(_))));
        assert!(harness.events().is_empty());
    }

    #[tokio::test]
    async fn rejecting_compacts_the_queue() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;

        let first = harness.queued(&alice, "Imagine").await;
        let second = harness.queued(&alice, "Woman").await;

        harness.collab.queue.reject(&harness.admin, first.id).await.unwrap();

        let queue = harness.collab.queue.list(&harness.admin).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, second.id);
        assert_eq!(queue[0].position, 1);
    }

    #[tokio::test]
    async fn reorder_requires_the_exact_queued_set() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;

        let a = harness.queued(&alice, "A").await;
        let b = harness.queued(&alice, "B").await;
        let c = harness.queued(&alice, "C").await;

        let queue = &harness.collab.queue;
        let admin = &harness.admin;

        let partial = queue.reorder(admin, &[c.id, a.id]).await;
        assert!(matches!(partial, Err(CollabError::InvalidArgument(_))));

        let duplicated = queue.reorder(admin, &[c.id, a.id, a.id]).await;
        assert!(matches!(duplicated, Err(CollabError::InvalidArgument(_))));

        let foreign = queue.reorder(admin, &[c.id, a.id, b.id, 999]).await;
        assert!(matches!(foreign, Err(CollabError::InvalidArgument(_))));

        let reordered = queue.reorder(admin, &[c.id, a.id, b.id]).await.unwrap();
        let order: Vec<_> = reordered.iter().map(|r| (r.id, r.position)).collect();
        assert_eq!(order, vec![(c.id, 1), (a.id, 2), (b.id, 3)]);
    }

    #[tokio::test]
    async fn queue_changes_are_admin_only() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let request = harness.collab.queue.request(&alice, song("Imagine")).await.unwrap();

        let result = harness.collab.queue.approve(&alice, request.id).await;
        assert!(matches!(result, Err(CollabError::Forbidden(_))));

        let result = harness.collab.queue.request(&harness.admin, song("Imagine")).await;
        assert!(matches!(result, Err(CollabError::Forbidden(_))));
    }

    #[tokio::test]
    async fn requests_of_other_venues_are_not_found() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let request = harness.collab.queue.request(&alice, song("Imagine")).await.unwrap();

        let (_, other_admin) = Harness::create_venue(&harness.collab, "OTHER001").await;
        let result = harness.collab.queue.approve(&other_admin, request.id).await;

        assert!(matches!(result, Err(CollabError::NotFound("request"))));
    }

    #[tokio::test]
    async fn video_urls_are_validated() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;

        let mut input = song("Imagine");
        input.video_url = Some("ftp://example.com/video".to_string());
        let result = harness.collab.queue.request(&alice, input).await;
        assert!(matches!(result, Err(CollabError::InvalidArgument(_))));

        let mut input = song("Imagine");
        input.video_url = Some("https://www.youtube.com/watch?v=xyz".to_string());
        let request = harness.collab.queue.request(&alice, input).await.unwrap();
        assert_eq!(
            request.video_url.as_deref(),
            Some("https://www.youtube.com/watch?v=xyz")
        );
        assert!(!request.auto_searched);
    }

    #[tokio::test]
    async fn auto_search_fills_missing_videos() {
        let harness = Harness::with_config(Config {
            auto_search: true,
            ..Config::default()
        })
        .await;
        let alice = harness.join("Alice").await;

        let request = harness.collab.queue.request(&alice, song("Imagine")).await.unwrap();

        assert!(request.auto_searched);
        assert_eq!(
            request.video_url.as_deref(),
            Some("https://www.youtube.com/watch?v=abc123")
        );
    }
}
