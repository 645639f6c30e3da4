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

// Error taxonomy shared by the gateway, bus and cloud transports

use std::time::Duration;
use thiserror::Error;
use tonic::Status;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Management operation on an entity the registry does not know
    #[error("{kind} '{id}' does not exist")]
    NotFound { kind: &'static str, id: String },

    /// Record unusable on its own, e.g. missing its producer id
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Analytics record names a cloud backend that is not configured
    #[error("cloud backend '{0}' is not configured")]
    UnknownBackend(String),

    /// Publish to a cloud backend failed
    #[error("publish to '{backend}' failed: {message}")]
    Transport { backend: String, message: String },

    /// Publish to a cloud backend exceeded its deadline
    #[error("publish to '{backend}' timed out after {timeout:?}")]
    Timeout { backend: String, timeout: Duration },

    /// Client closed the stream or the RPC transport failed
    #[error("stream terminated: {0}")]
    StreamTerminated(String),

    /// Trust root, signing key or initial connection unusable
    #[error("startup failure: {0}")]
    StartupFatal(String),
}

impl GatewayError {
    pub fn transport(backend: impl Into<String>, err: impl std::fmt::Display) -> Self {
        GatewayError::Transport {
            backend: backend.into(),
            message: err.to_string(),
        }
    }

    /// True for failures that only affect the current record
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GatewayError::NotFound { .. }
                | GatewayError::InvalidRecord(_)
                | GatewayError::UnknownBackend(_)
                | GatewayError::Transport { .. }
                | GatewayError::Timeout { .. }
        )
    }
}

impl From<GatewayError> for Status {
    fn from(err: GatewayError) -> Self {
        let message = err.to_string();
        match err {
            GatewayError::NotFound { .. } => Status::not_found(message),
            GatewayError::InvalidRecord(_) | GatewayError::UnknownBackend(_) => {
                Status::invalid_argument(message)
            }
            GatewayError::Transport { .. } | GatewayError::Timeout { .. } => {
                Status::unavailable(message)
            }
            GatewayError::StreamTerminated(_) => Status::cancelled(message),
            GatewayError::StartupFatal(_) => Status::internal(message),
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
