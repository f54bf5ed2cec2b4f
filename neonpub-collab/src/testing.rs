use std::sync::Arc;

use neonpub_core::{ChannelHandle, Config};
use serde_json::Value;

use crate::{
    Collab, FixtureSearch, Member, MemoryDatabase, NewParticipant, NewSongRequestInput,
    NewVenue, QuizBank, Role, RoomId, SongRequestData, VenueData, VideoCandidate,
};

/// A venue with an admin, backed by memory, with a channel listening to its events
pub(crate) struct Harness {
    pub collab: Collab,
    pub venue: VenueData,
    pub admin: Member,
    listener: ChannelHandle<RoomId>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let fixtures = FixtureSearch::new(vec![VideoCandidate {
            video_id: "abc123".to_string(),
            title: "Karaoke version".to_string(),
            channel: "Sing King".to_string(),
            thumbnail: "https://i.ytimg.com/vi/abc123/mqdefault.jpg".to_string(),
            url: "https://www.youtube.com/watch?v=abc123".to_string(),
        }]);

        let collab = Collab::new(
            config,
            Arc::new(MemoryDatabase::new()),
            QuizBank::builtin(),
            Arc::new(fixtures),
        );

        let (venue, admin) = Self::create_venue(&collab, "NEON0001").await;
        let listener = collab.context.hub.join(venue.id);

        Self {
            collab,
            venue,
            admin,
            listener,
        }
    }

    /// Creates a venue directly in the database, skipping password hashing
    pub async fn create_venue(collab: &Collab, code: &str) -> (VenueData, Member) {
        let venue = collab
            .context
            .database
            .create_venue(NewVenue {
                name: format!("Venue {}", code),
                code: code.to_string(),
                admin_password: "not a hash".to_string(),
            })
            .await
            .unwrap();

        let admin = Member {
            venue_id: venue.id,
            participant_id: None,
            nickname: "Admin".to_string(),
            role: Role::Admin,
        };

        (venue, admin)
    }

    pub async fn join(&self, nickname: &str) -> Member {
        let participant = self
            .collab
            .context
            .database
            .create_participant(NewParticipant {
                venue_id: self.venue.id,
                nickname: nickname.to_string(),
            })
            .await
            .unwrap();

        Member {
            venue_id: self.venue.id,
            participant_id: Some(participant.id),
            nickname: participant.nickname,
            role: Role::Audience,
        }
    }

    /// Requests a song and has the admin approve it
    pub async fn queued(&self, member: &Member, title: &str) -> SongRequestData {
        let request = self
            .collab
            .queue
            .request(
                member,
                NewSongRequestInput {
                    title: title.to_string(),
                    artist: "Someone".to_string(),
                    video_url: None,
                },
            )
            .await
            .unwrap();

        self.collab
            .queue
            .approve(&self.admin, request.id)
            .await
            .unwrap()
    }

    /// Everything broadcast to the venue since the last call
    pub fn events(&mut self) -> Vec<Value> {
        std::iter::from_fn(|| self.listener.try_recv())
            .map(|text| serde_json::from_str(&text).unwrap())
            .collect()
    }

    /// The types of everything broadcast since the last call
    pub fn event_types(&mut self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|e| e["type"].as_str().unwrap().to_string())
            .collect()
    }

    pub async fn venue(&self) -> VenueData {
        self.collab
            .context
            .database
            .venue_by_id(self.venue.id)
            .await
            .unwrap()
            .unwrap()
    }
}
