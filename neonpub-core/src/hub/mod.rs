mod channel;

pub use channel::*;

use std::{
    fmt::Display,
    hash::Hash,
    sync::{Arc, Weak},
};

use dashmap::DashMap;
use log::debug;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

/// Live channels grouped by room, and the fan-out of messages to them.
///
/// A room is whatever `K` identifies. Messages sent to one room never reach
/// channels of another. Within a room, messages arrive in the order they were
/// broadcast, since delivery only queues into each channel and never waits.
pub struct Hub<K>
where
    K: Eq + Hash + Clone + Display,
{
    me: Weak<Self>,
    rooms: DashMap<K, Arc<Mutex<Vec<Channel>>>>,
    capacity: usize,
}

impl<K> Hub<K>
where
    K: Eq + Hash + Clone + Display,
{
    /// Creates a hub whose channels buffer up to `capacity` messages.
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            rooms: Default::default(),
            capacity: capacity.max(1),
        })
    }

    /// Opens a new channel in a room.
    pub fn join(&self, key: K) -> ChannelHandle<K> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let channel = Channel::new(sender);
        let id = channel.id;

        // The entry guard is held while pushing, so a concurrent cleanup
        // of the same room can't drop the channel list under us.
        self.rooms
            .entry(key.clone())
            .or_default()
            .lock()
            .push(channel);

        ChannelHandle::new(id, key, receiver, self.me.clone())
    }

    /// Removes a channel from a room, and the room itself once it's empty.
    pub fn leave(&self, key: &K, id: ChannelId) {
        if let Some(channels) = self.channels(key) {
            channels.lock().retain(|c| c.id != id);
        }

        self.rooms.remove_if(key, |_, channels| channels.lock().is_empty());
    }

    /// Serializes `event` once and hands it to every channel in the room.
    /// Returns how many channels received it.
    pub fn broadcast<E>(&self, key: &K, event: &E) -> Result<usize, serde_json::Error>
    where
        E: Serialize,
    {
        let message = serde_json::to_string(event)?;
        Ok(self.broadcast_text(key, message))
    }

    /// Hands an already serialized message to every channel in the room.
    /// Channels that can't take it are dropped from the room.
    pub fn broadcast_text(&self, key: &K, message: String) -> usize {
        let Some(channels) = self.channels(key) else {
            return 0;
        };

        let mut channels = channels.lock();

        channels.retain(|channel| match channel.deliver(message.clone()) {
            Ok(()) => true,
            Err(reason) => {
                debug!("Dropping channel {} in room {}: {:?}", channel.id, key, reason);
                false
            }
        });

        channels.len()
    }

    /// How many channels are open in a room
    pub fn channel_count(&self, key: &K) -> usize {
        self.channels(key).map(|c| c.lock().len()).unwrap_or(0)
    }

    /// How many rooms have at least one channel
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn channels(&self, key: &K) -> Option<Arc<Mutex<Vec<Channel>>>> {
        self.rooms.get(key).map(|c| c.clone())
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::Hub;

    #[test]
    fn broadcasts_stay_in_their_room() {
        let hub = Hub::<i32>::new(8);

        let mut first = hub.join(1);
        let mut second = hub.join(1);
        let mut elsewhere = hub.join(2);

        let delivered = hub.broadcast(&1, &json!({ "type": "queue_updated" })).unwrap();

        assert_eq!(delivered, 2);
        assert_eq!(first.try_recv().as_deref(), Some(r#"{"type":"queue_updated"}"#));
        assert_eq!(second.try_recv().as_deref(), Some(r#"{"type":"queue_updated"}"#));
        assert_eq!(elsewhere.try_recv(), None);
    }

    #[test]
    fn messages_keep_their_order() {
        let hub = Hub::<i32>::new(8);
        let mut channel = hub.join(1);

        for n in 0..5 {
            hub.broadcast_text(&1, n.to_string());
        }

        let received: Vec<_> = std::iter::from_fn(|| channel.try_recv()).collect();
        assert_eq!(received, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn dropped_handles_leave_the_room() {
        let hub = Hub::<i32>::new(8);

        let first = hub.join(1);
        let second = hub.join(1);
        assert_eq!(hub.channel_count(&1), 2);

        drop(first);
        assert_eq!(hub.channel_count(&1), 1);

        drop(second);
        assert_eq!(hub.channel_count(&1), 0);
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn lagging_channels_are_dropped_without_blocking_others() {
        let hub = Hub::<i32>::new(1);

        let _slow = hub.join(1);
        let mut fast = hub.join(1);

        assert_eq!(hub.broadcast_text(&1, "a".to_string()), 2);
        assert_eq!(fast.try_recv().as_deref(), Some("a"));

        // The slow channel never reads, so its single slot is still taken
        assert_eq!(hub.broadcast_text(&1, "b".to_string()), 1);
        assert_eq!(fast.try_recv().as_deref(), Some("b"));
        assert_eq!(hub.channel_count(&1), 1);
    }

    #[tokio::test]
    async fn pruned_channels_end_their_stream() {
        let hub = Hub::<i32>::new(1);
        let mut slow = hub.join(1);

        hub.broadcast_text(&1, "a".to_string());
        hub.broadcast_text(&1, "b".to_string());

        assert_eq!(slow.recv().await.as_deref(), Some("a"));
        assert_eq!(slow.recv().await, None);
    }
}
