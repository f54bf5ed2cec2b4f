mod connection;
mod room;

use std::sync::Arc;

use dashmap::DashMap;

use crate::{CollabContext, CollabError, CollabResult};

pub use connection::*;
pub use room::*;

pub type RoomStore = Arc<DashMap<RoomId, Arc<Room>>>;

/// Keeps track of the in-process rooms, one for every venue that saw activity
/// since the process started. Rooms are created on first use and never persisted.
pub struct RoomManager {
    context: CollabContext,
}

impl RoomManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Opens a live channel into the venue with the given join code
    pub async fn connect(&self, code: &str) -> CollabResult<RoomConnectionHandle> {
        let code = code.to_ascii_uppercase();

        let venue = self
            .context
            .database
            .venue_by_code(&code)
            .await?
            .ok_or(CollabError::NotFound("venue"))?;

        let channel = self.context.hub.join(venue.id);

        Ok(RoomConnectionHandle::new(venue.code, channel))
    }

    /// How many live channels a venue has open
    pub fn connection_count(&self, venue_id: RoomId) -> usize {
        self.context.hub.channel_count(&venue_id)
    }
}
