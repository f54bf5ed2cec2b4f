use tokio::sync::{Mutex, MutexGuard};

use crate::PrimaryKey;

pub type RoomId = PrimaryKey;

/// The in-process side of a venue.
///
/// Holds no persisted state, only the locks that serialize read-modify-write
/// sequences against the database for this venue.
pub struct Room {
    venue_id: RoomId,
    /// Taken by lifecycle transitions, votes, queue changes and quiz changes
    transitions: Mutex<()>,
    /// Taken while checking and spending reaction quota
    reactions: Mutex<()>,
}

impl Room {
    pub fn new(venue_id: RoomId) -> Self {
        Self {
            venue_id,
            transitions: Mutex::new(()),
            reactions: Mutex::new(()),
        }
    }

    pub fn id(&self) -> RoomId {
        self.venue_id
    }

    /// Waits until no other transition is in progress in this venue
    pub async fn lock_transitions(&self) -> MutexGuard<'_, ()> {
        self.transitions.lock().await
    }

    pub async fn lock_reactions(&self) -> MutexGuard<'_, ()> {
        self.reactions.lock().await
    }
}
