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

// Transport factory: one constructor for every configured cloud backend

use super::backend::CloudTransport;
use super::iot_data::IotDataTransport;
use super::mqtt::MqttTransport;
use crate::config::{CloudBackendConfig, TransportConfig};
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct TransportFactory;

impl TransportFactory {
    /// Create the transport described by a backend entry
    ///
    /// Reads any credential material (trust root, signing key) up front, so a
    /// missing or malformed file is reported here rather than at first publish.
    pub fn create(config: &CloudBackendConfig) -> Result<Arc<dyn CloudTransport>> {
        match &config.transport {
            TransportConfig::IotData { iot_data } => {
                let transport = IotDataTransport::new(&config.name, iot_data.clone())
                    .with_context(|| format!("Failed to set up backend '{}'", config.name))?;
                Ok(Arc::new(transport))
            }

            TransportConfig::Mqtt { mqtt } => {
                let transport = MqttTransport::new(&config.name, mqtt.clone())
                    .with_context(|| format!("Failed to set up backend '{}'", config.name))?;
                Ok(Arc::new(transport))
            }
        }
    }
}
