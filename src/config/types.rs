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

// Configuration types for the vision edge gateway

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub clouds: CloudsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Outbound queue per subscription stream, between the relay task and tonic
    #[serde(default = "default_stream_queue")]
    pub stream_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            stream_queue: default_stream_queue(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfig {
    /// Records a subscriber may fall behind before the oldest are dropped
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudsConfig {
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_seconds: u64,

    #[serde(default)]
    pub backends: Vec<CloudBackendConfig>,
}

impl Default for CloudsConfig {
    fn default() -> Self {
        Self {
            publish_timeout_seconds: default_publish_timeout(),
            backends: Vec::new(),
        }
    }
}

impl CloudsConfig {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_seconds)
    }
}

/// One cloud backend: the name producers put in `cloud_provider` plus
/// the transport used to reach it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudBackendConfig {
    pub name: String,

    #[serde(flatten)]
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TransportConfig {
    IotData {
        #[serde(rename = "iot_data")]
        iot_data: IotDataConfig,
    },
    Mqtt {
        #[serde(rename = "mqtt")]
        mqtt: MqttConfig,
    },
}

impl TransportConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::IotData { .. } => "iot_data",
            TransportConfig::Mqtt { .. } => "mqtt",
        }
    }

    pub fn as_mqtt(&self) -> Option<&MqttConfig> {
        match self {
            TransportConfig::Mqtt { mqtt } => Some(mqtt),
            _ => None,
        }
    }
}

/// Cloud SDK managed session (IoT data-plane publish)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IotDataConfig {
    pub region: String,
    pub endpoint: String,

    #[serde(default = "default_iot_qos")]
    pub qos: i32,
}

/// TLS MQTT session authenticated with a signed token as password
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MqttConfig {
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    pub client_id: String,

    #[serde(default = "default_mqtt_username")]
    pub username: String,

    /// Fixed publish topic; the analytics name is used when absent
    #[serde(default)]
    pub topic: Option<String>,

    /// PEM bundle the broker certificate must chain to
    pub trust_root_path: String,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    pub token: TokenConfig,
}

impl MqttConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// `aud` claim, the cloud project id
    pub audience: String,
    pub private_key_path: String,

    #[serde(default = "default_token_algorithm")]
    pub algorithm: String, // "RS256" or "ES256"

    #[serde(default = "default_token_ttl")]
    pub ttl_seconds: u64,

    /// Renew this long before `exp`
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String, // "text", "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String { "0.0.0.0:50051".to_string() }
fn default_stream_queue() -> usize { 32 }
fn default_subscriber_buffer() -> usize { 64 }
fn default_publish_timeout() -> u64 { 10 }
fn default_iot_qos() -> i32 { 1 }
fn default_mqtt_port() -> u16 { 8883 }
fn default_mqtt_username() -> String { "unused".to_string() }
fn default_keep_alive() -> u64 { 60 }
fn default_connect_timeout() -> u64 { 30 }
fn default_token_algorithm() -> String { "RS256".to_string() }
fn default_token_ttl() -> u64 { 86400 }
fn default_refresh_margin() -> u64 { 3600 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }
