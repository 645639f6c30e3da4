// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// In-process publish/subscribe relay keyed by producer id
//
// Each topic owns a broadcast channel. Every subscriber reads through its own
// cursor into a ring of `capacity` records: a subscriber that falls more than
// `capacity` records behind loses the oldest ones, while publishers and the
// other subscribers never wait on it.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

/// What a subscriber observes on its topic
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent<T> {
    Record(T),
    /// The subscriber fell behind and this many records were discarded
    Lagged(u64),
}

type TopicMap<T> = DashMap<String, broadcast::Sender<T>>;

pub struct Bus<T> {
    topics: Arc<TopicMap<T>>,
    capacity: usize,
}

impl<T> Clone for Bus<T> {
    fn clone(&self) -> Self {
        Self {
            topics: self.topics.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: Clone + Send + 'static> Bus<T> {
    /// `capacity` bounds each subscriber's backlog (rounded up to a power of two)
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Fire-and-forget publish; returns how many subscribers will see the record
    pub fn publish(&self, topic: &str, record: T) -> usize {
        match self.topics.get(topic) {
            Some(sender) => sender.send(record).unwrap_or(0),
            None => 0,
        }
    }

    /// Attach to `topic`, seeing only records published from now on
    pub fn subscribe(&self, topic: &str) -> Subscription<T> {
        let receiver = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        debug!(topic = %topic, "Bus subscription attached");

        Subscription {
            topic: topic.to_string(),
            receiver: Some(receiver),
            topics: self.topics.clone(),
        }
    }

    /// Detach a subscription; dropping the handle has the same effect
    pub fn unsubscribe(&self, subscription: Subscription<T>) {
        drop(subscription);
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Number of topics with at least one live subscription
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

/// Live attachment to one topic, detached when dropped
pub struct Subscription<T> {
    topic: String,
    receiver: Option<broadcast::Receiver<T>>,
    topics: Arc<TopicMap<T>>,
}

impl<T: Clone> Subscription<T> {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next event; `None` once the topic is gone
    pub async fn recv(&mut self) -> Option<BusEvent<T>> {
        let receiver = self.receiver.as_mut()?;
        match receiver.recv().await {
            Ok(record) => Some(BusEvent::Record(record)),
            Err(RecvError::Lagged(skipped)) => Some(BusEvent::Lagged(skipped)),
            Err(RecvError::Closed) => None,
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        // Release our cursor first so the count below excludes it
        drop(self.receiver.take());
        self.topics
            .remove_if(&self.topic, |_, sender| sender.receiver_count() == 0);
        debug!(topic = %self.topic, "Bus subscription detached");
    }
}
