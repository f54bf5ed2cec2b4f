use std::{
    fmt::Display,
    hash::Hash,
    sync::Weak,
};

use tokio::sync::mpsc::{error::TrySendError, Receiver, Sender};

use crate::Id;

use super::Hub;

pub type ChannelId = Id<Channel>;

/// The sending half of a live channel, as held by the [Hub].
#[derive(Debug)]
pub struct Channel {
    pub id: ChannelId,
    sender: Sender<String>,
}

/// Why a channel could not take a message.
#[derive(Debug, PartialEq, Eq)]
pub enum Undeliverable {
    /// The consumer is too far behind
    Lagging,
    /// The consumer is gone
    Closed,
}

/// The receiving half of a live channel, owned by whatever writes to the client.
/// When this is dropped, the channel leaves its room.
pub struct ChannelHandle<K>
where
    K: Eq + Hash + Clone + Display,
{
    id: ChannelId,
    key: K,
    receiver: Receiver<String>,
    hub: Weak<Hub<K>>,
}

impl Channel {
    pub(super) fn new(sender: Sender<String>) -> Self {
        Self {
            id: ChannelId::new(),
            sender,
        }
    }

    /// Queues a message without waiting.
    pub(super) fn deliver(&self, message: String) -> Result<(), Undeliverable> {
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => Undeliverable::Lagging,
            TrySendError::Closed(_) => Undeliverable::Closed,
        })
    }
}

impl<K> ChannelHandle<K>
where
    K: Eq + Hash + Clone + Display,
{
    pub(super) fn new(id: ChannelId, key: K, receiver: Receiver<String>, hub: Weak<Hub<K>>) -> Self {
        Self {
            id,
            key,
            receiver,
            hub,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// The room this channel belongs to
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Waits for the next message. Returns `None` once the hub dropped this channel.
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Returns a message if one is already queued.
    pub fn try_recv(&mut self) -> Option<String> {
        self.receiver.try_recv().ok()
    }
}

impl<K> Drop for ChannelHandle<K>
where
    K: Eq + Hash + Clone + Display,
{
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.leave(&self.key, self.id)
        }
    }
}
