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

// Routes analytics payloads to the cloud backend named in each record

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{GatewayError, GatewayResult};
use crate::registry::{Category, Registry};
use crate::transport::CloudTransport;

pub struct CloudEgressPublisher {
    registry: Arc<Registry>,
    backends: HashMap<String, Arc<dyn CloudTransport>>,
    publish_timeout: Duration,
}

impl CloudEgressPublisher {
    pub fn new(registry: Arc<Registry>, publish_timeout: Duration) -> Self {
        Self {
            registry,
            backends: HashMap::new(),
            publish_timeout,
        }
    }

    /// Make an initialized transport reachable under its backend name
    pub async fn attach(&mut self, transport: Arc<dyn CloudTransport>) {
        let name = transport.name().to_string();
        self.registry.add_if_absent(Category::Cloud, &name).await;
        info!(
            backend = %name,
            backend_type = transport.backend_type(),
            "Cloud backend attached"
        );
        self.backends.insert(name, transport);
    }

    /// Publish `payload` on `topic` through backend `backend_name`
    ///
    /// Unknown backends fail without side effects; transport failures and
    /// timeouts are returned so the caller can skip the record and go on.
    pub async fn publish(
        &self,
        backend_name: &str,
        topic: &str,
        payload: Vec<u8>,
    ) -> GatewayResult<()> {
        if !self.registry.contains(Category::Cloud, backend_name).await {
            return Err(GatewayError::UnknownBackend(backend_name.to_string()));
        }
        let transport = self
            .backends
            .get(backend_name)
            .ok_or_else(|| GatewayError::UnknownBackend(backend_name.to_string()))?;

        debug!(backend = %backend_name, topic = %topic, bytes = payload.len(), "Cloud publish");

        match tokio::time::timeout(self.publish_timeout, transport.publish(topic, payload)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                backend: backend_name.to_string(),
                timeout: self.publish_timeout,
            }),
        }
    }
}
