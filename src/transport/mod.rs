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

// Cloud transport module
//
// Trait-based abstraction over the authenticated connections used to reach
// cloud message brokers. Two flavors exist:
// - iot_data: SDK-managed session, publishes over the IoT data-plane API
// - mqtt: TLS session validated against a fixed trust root, authenticated
//   with a time-boxed signed token that is renewed before it expires

pub mod backend;
pub mod factory;
pub mod iot_data;
pub mod mqtt;
pub mod token;

pub use backend::CloudTransport;
pub use factory::TransportFactory;
pub use iot_data::IotDataTransport;
pub use mqtt::MqttTransport;
pub use token::{SignedToken, TokenClaims, TokenMinter};
