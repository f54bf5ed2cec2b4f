mod auth;
mod db;
mod error;
mod events;
mod performances;
mod queue;
mod quiz;
mod reactions;
mod rooms;
mod screens;
mod search;
mod util;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use log::{debug, error};
use neonpub_core::{Config, Hub};

pub use auth::*;
pub use db::*;
pub use error::*;
pub use events::*;
pub use performances::*;
pub use queue::*;
pub use quiz::*;
pub use reactions::*;
pub use rooms::*;
pub use screens::*;
pub use search::*;

/// The neonpub collab system, facilitating venues, the song queue, performances, quizzes, and more.
pub struct Collab {
    context: CollabContext,

    pub auth: Auth,
    pub rooms: RoomManager,
    pub queue: Queue,
    pub performances: Performances,
    pub quizzes: Quizzes,
    pub reactions: Reactions,
    pub screens: Screens,
    pub search: Search,
}

/// A type passed to various components of the collab system, to access state, emit events, and dispatch actions.
#[derive(Clone)]
pub struct CollabContext {
    pub config: Arc<Config>,
    pub database: ArcedDatabase,
    pub hub: Arc<Hub<RoomId>>,
    pub rooms: RoomStore,
    pub bank: Arc<QuizBank>,
    pub search: ArcedVideoSearch,
}

impl Collab {
    pub fn new(
        config: Config,
        database: ArcedDatabase,
        bank: QuizBank,
        search: ArcedVideoSearch,
    ) -> Self {
        let context = CollabContext {
            hub: Hub::new(config.channel_capacity),
            config: Arc::new(config),
            database,
            rooms: Default::default(),
            bank: Arc::new(bank),
            search,
        };

        Self {
            auth: Auth::new(&context),
            rooms: RoomManager::new(&context),
            queue: Queue::new(&context),
            performances: Performances::new(&context),
            quizzes: Quizzes::new(&context),
            reactions: Reactions::new(&context),
            screens: Screens::new(&context),
            search: Search::new(&context),
            context,
        }
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    pub fn bank(&self) -> &QuizBank {
        &self.context.bank
    }
}

impl CollabContext {
    /// Returns the room of a venue, creating it on first use
    pub fn room(&self, venue_id: RoomId) -> Arc<Room> {
        self.rooms
            .entry(venue_id)
            .or_insert_with(|| Arc::new(Room::new(venue_id)))
            .clone()
    }

    /// Pushes an event to every live channel of a venue
    pub fn emit(&self, venue_id: RoomId, event: CollabEvent) {
        match self.hub.broadcast(&venue_id, &event) {
            Ok(delivered) => debug!(
                "Emitted {} to {} channel(s) of venue {}",
                event.name(),
                delivered,
                venue_id
            ),
            Err(e) => error!("Could not serialize {}: {}", event.name(), e),
        }
    }

    /// Fetches the venue of an acting member
    pub(crate) async fn venue(&self, venue_id: RoomId) -> CollabResult<VenueData> {
        Ok(self
            .database
            .venue_by_id(venue_id)
            .await
            .or_not_found("venue", "id")?)
    }
}
