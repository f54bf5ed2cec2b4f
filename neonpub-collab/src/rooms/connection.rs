use log::info;
use neonpub_core::{ChannelHandle, ChannelId};

use super::RoomId;

/// A live channel into a venue, which leaves the room when dropped
pub struct RoomConnectionHandle {
    venue_code: String,
    channel: ChannelHandle<RoomId>,
}

impl RoomConnectionHandle {
    pub fn new(venue_code: String, channel: ChannelHandle<RoomId>) -> Self {
        info!(
            "Channel {} connected to venue {}",
            channel.id(),
            venue_code
        );

        Self {
            venue_code,
            channel,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.channel.id()
    }

    pub fn venue_id(&self) -> RoomId {
        *self.channel.key()
    }

    /// Waits for the next serialized event.
    /// Returns `None` once the channel was pruned from the room.
    pub async fn recv(&mut self) -> Option<String> {
        self.channel.recv().await
    }
}

impl Drop for RoomConnectionHandle {
    fn drop(&mut self) {
        info!(
            "Channel {} disconnected from venue {}",
            self.channel.id(),
            self.venue_code
        );
    }
}
