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

// Ingest sessions: one loop per streaming upload
//
// Each loop receives one record per iteration, registers its producer and
// routes it. A failing record is counted in the session report and the loop
// keeps going; only an error from the stream itself ends the session early.

use futures::{Stream, StreamExt};
use tonic::Status;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::GatewayState;
use crate::bus::Bus;
use crate::error::GatewayError;
use crate::proto;
use crate::protocol::{AnalyticsRecord, CloudPayload, Record};
use crate::registry::Category;

/// Running tally of an ingest session, returned as its trailing status
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestReport {
    pub received: u64,
    pub failed: u64,
    pub last_error: Option<String>,
}

impl IngestReport {
    fn accepted(&mut self) {
        self.received += 1;
    }

    fn rejected(&mut self, err: &GatewayError) {
        self.received += 1;
        self.failed += 1;
        self.last_error = Some(err.to_string());
    }

    pub fn into_response(self) -> proto::ErrorResponse {
        let error_msg = match self.last_error {
            Some(last) if self.failed > 1 => {
                format!("{} of {} records failed; last: {}", self.failed, self.received, last)
            }
            Some(last) => last,
            None => String::new(),
        };

        proto::ErrorResponse {
            error_msg,
            records_received: self.received,
            records_failed: self.failed,
        }
    }
}

/// Shared loop for uploads that land on the bus
async fn ingest_to_bus<S, Req, P>(
    mut stream: S,
    state: &GatewayState,
    category: Category,
    bus: &Bus<Record<P>>,
    decode: fn(Req) -> (String, Record<P>),
) -> Result<IngestReport, Status>
where
    S: Stream<Item = Result<Req, Status>> + Unpin,
    P: Clone + Send + 'static,
{
    let session = Uuid::new_v4();
    info!(%session, category = %category, "Ingest session opened");

    let mut report = IngestReport::default();

    while let Some(next) = stream.next().await {
        let request = match next {
            Ok(request) => request,
            Err(status) => {
                warn!(%session, error = %status, "Ingest stream terminated");
                return Err(GatewayError::StreamTerminated(status.message().to_string()).into());
            }
        };

        let (producer_id, record) = decode(request);
        if producer_id.is_empty() {
            let err = GatewayError::InvalidRecord(format!("{} id is empty", category));
            warn!(%session, "Dropping record without producer id");
            report.rejected(&err);
            continue;
        }

        state.registry.add_if_absent(category, &producer_id).await;
        let delivered = bus.publish(&producer_id, record);
        report.accepted();

        debug!(%session, topic = %producer_id, delivered, "Record published");
    }

    info!(
        %session,
        received = report.received,
        failed = report.failed,
        "Ingest session closed"
    );
    Ok(report)
}

/// Camera frames to the image bus
pub async fn ingest_images<S>(stream: S, state: &GatewayState) -> Result<IngestReport, Status>
where
    S: Stream<Item = Result<proto::PublishImageRequest, Status>> + Unpin,
{
    ingest_to_bus(
        stream,
        state,
        Category::Camera,
        &state.images,
        proto::PublishImageRequest::into_record,
    )
    .await
}

/// Inference results to the vision bus
pub async fn ingest_vision<S>(stream: S, state: &GatewayState) -> Result<IngestReport, Status>
where
    S: Stream<Item = Result<proto::PublishVisionRequest, Status>> + Unpin,
{
    ingest_to_bus(
        stream,
        state,
        Category::Application,
        &state.visions,
        proto::PublishVisionRequest::into_record,
    )
    .await
}

/// Analytics records to the cloud backend each one names
pub async fn ingest_analytics<S>(mut stream: S, state: &GatewayState) -> Result<IngestReport, Status>
where
    S: Stream<Item = Result<proto::PublishCloudRequest, Status>> + Unpin,
{
    let session = Uuid::new_v4();
    info!(%session, "Cloud ingest session opened");

    let mut report = IngestReport::default();

    while let Some(next) = stream.next().await {
        let request = match next {
            Ok(request) => request,
            Err(status) => {
                warn!(%session, error = %status, "Cloud ingest stream terminated");
                return Err(GatewayError::StreamTerminated(status.message().to_string()).into());
            }
        };

        let analytics = AnalyticsRecord::from(request);
        if analytics.analytics_name.is_empty() {
            let err = GatewayError::InvalidRecord("analytics name is empty".to_string());
            warn!(%session, "Dropping analytics record without a name");
            report.rejected(&err);
            continue;
        }

        state
            .registry
            .add_if_absent(Category::Application, &analytics.analytics_name)
            .await;

        match publish_analytics(state, &analytics).await {
            Ok(()) => {
                report.accepted();
                debug!(
                    %session,
                    backend = %analytics.cloud_provider,
                    topic = %analytics.analytics_name,
                    "Analytics forwarded"
                );
            }
            Err(err) => {
                if err.is_recoverable() {
                    warn!(
                        %session,
                        backend = %analytics.cloud_provider,
                        topic = %analytics.analytics_name,
                        error = %err,
                        "Analytics record dropped"
                    );
                } else {
                    error!(
                        %session,
                        backend = %analytics.cloud_provider,
                        error = %err,
                        "Analytics record dropped on unexpected failure"
                    );
                }
                report.rejected(&err);
            }
        }
    }

    info!(
        %session,
        received = report.received,
        failed = report.failed,
        "Cloud ingest session closed"
    );
    Ok(report)
}

async fn publish_analytics(
    state: &GatewayState,
    analytics: &AnalyticsRecord,
) -> Result<(), GatewayError> {
    let payload = CloudPayload::from(&analytics.record)
        .to_json()
        .map_err(|e| GatewayError::transport(&analytics.cloud_provider, e))?;

    state
        .egress
        .publish(&analytics.cloud_provider, &analytics.analytics_name, payload)
        .await
}
