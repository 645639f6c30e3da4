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

// Vision edge gateway
//
// Bridges edge producers to consumers:
// - Cameras and inference applications upload record streams over gRPC
// - Internal subscribers receive a live copy of any producer's stream
// - Analytics records are relayed to authenticated cloud brokers chosen per record
// - Management calls list and prune the producer and backend registry

pub mod bus;
pub mod config;
pub mod egress;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod registry;
pub mod transport;

// Re-export main types
pub use bus::{Bus, BusEvent, Subscription};
pub use config::{load_config, load_config_with_env, GatewayConfig};
pub use egress::CloudEgressPublisher;
pub use error::{GatewayError, GatewayResult};
pub use gateway::{serve, GatewayState, VisionEdgeService};
pub use protocol::{AnalyticsRecord, CloudPayload, ImageRecord, Record, VisionRecord};
pub use registry::{Category, Registry};
pub use transport::{CloudTransport, TransportFactory};

// Generated gRPC definitions
pub mod proto {
    tonic::include_proto!("vei.v1");
}
