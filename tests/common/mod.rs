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

// Shared helpers for integration tests
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vision_edge_gateway::{
    CloudEgressPublisher, CloudTransport, GatewayError, GatewayResult, GatewayState, Registry,
};

/// In-memory transport recording every publish
pub struct MockTransport {
    name: String,
    pub published: Mutex<Vec<(String, Vec<u8>)>>,
    pub fail: AtomicBool,
    pub delay: Option<Duration>,
}

impl MockTransport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            published: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            delay: None,
        }
    }

    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(name)
        }
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl CloudTransport for MockTransport {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> GatewayResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::transport(&self.name, "broker unavailable"));
        }

        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn backend_type(&self) -> &str {
        "mock"
    }
}

/// Gateway state with the given transports attached
pub async fn gateway_state(
    transports: Vec<Arc<MockTransport>>,
    subscriber_buffer: usize,
) -> Arc<GatewayState> {
    let registry = Arc::new(Registry::new());
    let mut egress = CloudEgressPublisher::new(registry.clone(), Duration::from_secs(2));
    for transport in transports {
        egress.attach(transport).await;
    }
    Arc::new(GatewayState::new(registry, egress, subscriber_buffer, 16))
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F: FnMut() -> bool>(mut condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
