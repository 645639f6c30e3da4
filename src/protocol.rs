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

// Typed records flowing through the gateway, decoded from the wire messages

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::proto;

/// Envelope shared by every record shape
#[derive(Debug, Clone, PartialEq)]
pub struct Record<P> {
    pub payload: P,
    pub timestamp: String,
}

/// Camera frame; `Bytes` keeps fan-out to many subscribers copy-free
pub type ImageRecord = Record<Bytes>;

/// Ordered textual results of an inference application
pub type VisionRecord = Record<Vec<String>>;

/// Analytics record bound for a cloud backend
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsRecord {
    pub analytics_name: String,
    pub cloud_provider: String,
    pub record: VisionRecord,
}

/// JSON body published to cloud brokers
///
/// Field names match what existing cloud-side consumers parse:
/// `{"AnalyticalOutput": [...], "Timestamp": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CloudPayload {
    pub analytical_output: Vec<String>,
    pub timestamp: String,
}

impl CloudPayload {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl From<&VisionRecord> for CloudPayload {
    fn from(record: &VisionRecord) -> Self {
        Self {
            analytical_output: record.payload.clone(),
            timestamp: record.timestamp.clone(),
        }
    }
}

impl proto::PublishImageRequest {
    /// Split into the producer id and the record published under it
    pub fn into_record(self) -> (String, ImageRecord) {
        (
            self.camera_id,
            Record {
                payload: Bytes::from(self.image),
                timestamp: self.timestamp,
            },
        )
    }
}

impl proto::PublishVisionRequest {
    pub fn into_record(self) -> (String, VisionRecord) {
        (
            self.vision_app_name,
            Record {
                payload: self.vision_output,
                timestamp: self.timestamp,
            },
        )
    }
}

impl From<proto::PublishCloudRequest> for AnalyticsRecord {
    fn from(req: proto::PublishCloudRequest) -> Self {
        Self {
            analytics_name: req.analytics_name,
            cloud_provider: req.cloud_provider,
            record: Record {
                payload: req.analytical_output,
                timestamp: req.timestamp,
            },
        }
    }
}

impl From<ImageRecord> for proto::ImageData {
    fn from(record: ImageRecord) -> Self {
        Self {
            image: record.payload.to_vec(),
            timestamp: record.timestamp,
            error: String::new(),
        }
    }
}

impl From<VisionRecord> for proto::VisionOutput {
    fn from(record: VisionRecord) -> Self {
        Self {
            vision_output: record.payload,
            timestamp: record.timestamp,
            error: String::new(),
        }
    }
}
