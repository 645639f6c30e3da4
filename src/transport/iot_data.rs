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

// Cloud SDK transport: IoT data-plane publish over an SDK-managed session

use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_iotdataplane::config::Region;
use aws_sdk_iotdataplane::error::DisplayErrorContext;
use aws_sdk_iotdataplane::primitives::Blob;
use aws_sdk_iotdataplane::Client;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use super::backend::CloudTransport;
use crate::config::IotDataConfig;
use crate::error::{GatewayError, GatewayResult};

/// Publishes through the SDK client; credentials and connection reuse are
/// handled by the SDK session
pub struct IotDataTransport {
    name: String,
    config: IotDataConfig,
    client: OnceCell<Client>,
    publish_lock: Mutex<()>,
}

impl IotDataTransport {
    pub fn new(name: &str, config: IotDataConfig) -> GatewayResult<Self> {
        if config.region.is_empty() || config.endpoint.is_empty() {
            return Err(GatewayError::StartupFatal(format!(
                "backend '{}': iot_data.region and iot_data.endpoint are required",
                name
            )));
        }

        info!(
            backend = %name,
            region = %config.region,
            endpoint = %config.endpoint,
            "Initializing IoT data-plane transport"
        );

        Ok(Self {
            name: name.to_string(),
            config,
            client: OnceCell::new(),
            publish_lock: Mutex::new(()),
        })
    }

    async fn build_client(&self) -> Client {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.config.region.clone()))
            .load()
            .await;

        let client_config = aws_sdk_iotdataplane::config::Builder::from(&sdk_config)
            .endpoint_url(self.config.endpoint.clone())
            .build();

        Client::from_conf(client_config)
    }
}

#[async_trait]
impl CloudTransport for IotDataTransport {
    async fn initialize(&self) -> Result<()> {
        self.client
            .get_or_init(|| self.build_client())
            .await;
        info!(backend = %self.name, "IoT data-plane session ready");
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> GatewayResult<()> {
        let client = self
            .client
            .get()
            .ok_or_else(|| GatewayError::transport(&self.name, "session not initialized"))?;

        let _guard = self.publish_lock.lock().await;

        debug!(backend = %self.name, topic = %topic, bytes = payload.len(), "Publishing");

        client
            .publish()
            .topic(topic)
            .qos(self.config.qos)
            .payload(Blob::new(payload))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| GatewayError::transport(&self.name, DisplayErrorContext(e)))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.client.initialized())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn backend_type(&self) -> &str {
        "iot_data"
    }
}
