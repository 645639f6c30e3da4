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

// Cloud transport trait: one long-lived authenticated connection per backend

use anyhow::Result;
use async_trait::async_trait;

use crate::error::GatewayResult;

/// Authenticated, long-lived connection to one cloud message broker
///
/// Implementations serialize their own publishes; callers may share one
/// instance across every analytics session that targets the backend.
#[async_trait]
pub trait CloudTransport: Send + Sync {
    /// Establish the connection. Called once at startup; an error here
    /// means the process cannot serve this backend and must not start.
    async fn initialize(&self) -> Result<()>;

    /// Publish `payload` on `topic`
    ///
    /// # Arguments
    /// * `topic` - Broker topic, normally the analytics application name
    /// * `payload` - Serialized analytics body
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> GatewayResult<()>;

    /// Health check
    async fn health_check(&self) -> Result<bool>;

    /// Backend name as clients address it
    fn name(&self) -> &str;

    /// Transport flavor identifier
    fn backend_type(&self) -> &str;
}
