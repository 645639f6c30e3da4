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

// Subscription relays: forward one bus topic onto one outbound stream
//
// Lifecycle: Attached -> Relaying -> (ClientClosed | SendFailed) -> Detached.
// The bus subscription is owned by the relay task, so it is detached on every
// exit path when the task returns.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bus::{BusEvent, Subscription};

/// Why a relay stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayExit {
    /// Subscriber dropped or cancelled the stream
    ClientClosed,
    /// Writing to the outbound stream failed mid-send
    SendFailed,
    /// The topic went away underneath the subscription
    TopicClosed,
}

/// How bus records and lag notices become outbound messages
pub struct RelayCodec<T, M> {
    pub encode: fn(T) -> M,
    pub lagged: fn(u64) -> M,
}

pub type RelayStream<M> = ReceiverStream<Result<M, Status>>;

/// Start relaying `subscription` and return the outbound stream
pub fn spawn_relay<T, M>(
    subscription: Subscription<T>,
    queue: usize,
    codec: RelayCodec<T, M>,
) -> (RelayStream<M>, JoinHandle<RelayExit>)
where
    T: Clone + Send + 'static,
    M: Send + 'static,
{
    let (tx, rx) = mpsc::channel(queue.max(1));
    let handle = tokio::spawn(relay(subscription, tx, codec));
    (ReceiverStream::new(rx), handle)
}

async fn relay<T, M>(
    mut subscription: Subscription<T>,
    tx: mpsc::Sender<Result<M, Status>>,
    codec: RelayCodec<T, M>,
) -> RelayExit
where
    T: Clone + Send + 'static,
    M: Send + 'static,
{
    let session = Uuid::new_v4();
    let topic = subscription.topic().to_string();
    info!(%session, topic = %topic, "Subscription relaying");

    let mut forwarded: u64 = 0;
    let exit = loop {
        let message = tokio::select! {
            _ = tx.closed() => break RelayExit::ClientClosed,
            event = subscription.recv() => match event {
                Some(BusEvent::Record(record)) => (codec.encode)(record),
                Some(BusEvent::Lagged(skipped)) => {
                    warn!(%session, topic = %topic, skipped, "Subscriber lagging, records dropped");
                    (codec.lagged)(skipped)
                }
                None => break RelayExit::TopicClosed,
            },
        };

        if tx.send(Ok(message)).await.is_err() {
            break RelayExit::SendFailed;
        }
        forwarded += 1;
    };

    drop(subscription);
    info!(%session, topic = %topic, forwarded, exit = ?exit, "Subscription detached");
    exit
}

/// Lag notice carried in the record's error field
pub fn lag_message(skipped: u64) -> String {
    format!("subscriber too slow: {} records dropped", skipped)
}
