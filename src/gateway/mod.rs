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

// gRPC front door: ingest, subscription and management calls

pub mod ingest;
pub mod relay;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tonic::{Request, Response, Status, Streaming};
use tracing::info;

use crate::bus::Bus;
use crate::egress::CloudEgressPublisher;
use crate::proto::{self, vision_edge_server::VisionEdge, vision_edge_server::VisionEdgeServer};
use crate::protocol::{ImageRecord, VisionRecord};
use crate::registry::{Category, Registry};
use relay::{lag_message, spawn_relay, RelayCodec, RelayStream};

/// Process-wide state shared by every session
pub struct GatewayState {
    pub registry: Arc<Registry>,
    pub images: Bus<ImageRecord>,
    pub visions: Bus<VisionRecord>,
    pub egress: CloudEgressPublisher,
    /// Outbound queue length of each subscription stream
    pub stream_queue: usize,
}

impl GatewayState {
    pub fn new(
        registry: Arc<Registry>,
        egress: CloudEgressPublisher,
        subscriber_buffer: usize,
        stream_queue: usize,
    ) -> Self {
        Self {
            registry,
            images: Bus::new(subscriber_buffer),
            visions: Bus::new(subscriber_buffer),
            egress,
            stream_queue,
        }
    }
}

/// Service implementation handed to tonic
#[derive(Clone)]
pub struct VisionEdgeService {
    state: Arc<GatewayState>,
}

impl VisionEdgeService {
    pub fn new(state: Arc<GatewayState>) -> Self {
        Self { state }
    }

    pub fn into_server(self) -> VisionEdgeServer<Self> {
        VisionEdgeServer::new(self)
    }
}

fn image_codec() -> RelayCodec<ImageRecord, proto::ImageData> {
    RelayCodec {
        encode: proto::ImageData::from,
        lagged: |skipped| proto::ImageData {
            image: Vec::new(),
            timestamp: String::new(),
            error: lag_message(skipped),
        },
    }
}

fn vision_codec() -> RelayCodec<VisionRecord, proto::VisionOutput> {
    RelayCodec {
        encode: proto::VisionOutput::from,
        lagged: |skipped| proto::VisionOutput {
            vision_output: Vec::new(),
            timestamp: String::new(),
            error: lag_message(skipped),
        },
    }
}

fn require_id(id: &str, field: &str) -> Result<(), Status> {
    if id.is_empty() {
        return Err(Status::invalid_argument(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[tonic::async_trait]
impl VisionEdge for VisionEdgeService {
    async fn publish_image(
        &self,
        request: Request<Streaming<proto::PublishImageRequest>>,
    ) -> Result<Response<proto::ErrorResponse>, Status> {
        let report = ingest::ingest_images(request.into_inner(), &self.state).await?;
        Ok(Response::new(report.into_response()))
    }

    type SubscribeImageStream = RelayStream<proto::ImageData>;

    async fn subscribe_image(
        &self,
        request: Request<proto::SubImageParams>,
    ) -> Result<Response<Self::SubscribeImageStream>, Status> {
        let camera_id = request.into_inner().camera_id;
        require_id(&camera_id, "camera_id")?;

        let subscription = self.state.images.subscribe(&camera_id);
        let (stream, _relay) = spawn_relay(subscription, self.state.stream_queue, image_codec());
        Ok(Response::new(stream))
    }

    async fn publish_vision_output(
        &self,
        request: Request<Streaming<proto::PublishVisionRequest>>,
    ) -> Result<Response<proto::ErrorResponse>, Status> {
        let report = ingest::ingest_vision(request.into_inner(), &self.state).await?;
        Ok(Response::new(report.into_response()))
    }

    type SubscribeVisionOutputStream = RelayStream<proto::VisionOutput>;

    async fn subscribe_vision_output(
        &self,
        request: Request<proto::SubVisionParams>,
    ) -> Result<Response<Self::SubscribeVisionOutputStream>, Status> {
        let app_name = request.into_inner().vision_app_name;
        require_id(&app_name, "vision_app_name")?;

        let subscription = self.state.visions.subscribe(&app_name);
        let (stream, _relay) = spawn_relay(subscription, self.state.stream_queue, vision_codec());
        Ok(Response::new(stream))
    }

    async fn publish_to_cloud(
        &self,
        request: Request<Streaming<proto::PublishCloudRequest>>,
    ) -> Result<Response<proto::ErrorResponse>, Status> {
        let report = ingest::ingest_analytics(request.into_inner(), &self.state).await?;
        Ok(Response::new(report.into_response()))
    }

    async fn delete_camera(
        &self,
        request: Request<proto::CameraId>,
    ) -> Result<Response<proto::ErrorResponse>, Status> {
        let camera_id = request.into_inner().camera_id;
        self.state
            .registry
            .remove(Category::Camera, &camera_id)
            .await?;
        Ok(Response::new(proto::ErrorResponse::default()))
    }

    async fn list_cameras(
        &self,
        _request: Request<proto::ListRequest>,
    ) -> Result<Response<proto::Cameras>, Status> {
        let available_cams = self.state.registry.list(Category::Camera).await;
        Ok(Response::new(proto::Cameras { available_cams }))
    }

    async fn list_applications(
        &self,
        _request: Request<proto::ListRequest>,
    ) -> Result<Response<proto::Applications>, Status> {
        let avail_apps = self.state.registry.list(Category::Application).await;
        Ok(Response::new(proto::Applications { avail_apps }))
    }

    async fn list_clouds(
        &self,
        _request: Request<proto::ListRequest>,
    ) -> Result<Response<proto::Clouds>, Status> {
        let avail_clouds = self.state.registry.list(Category::Cloud).await;
        Ok(Response::new(proto::Clouds { avail_clouds }))
    }
}

/// Serve the gateway on `addr` until `shutdown` resolves
pub async fn serve<F>(
    state: Arc<GatewayState>,
    addr: SocketAddr,
    shutdown: F,
) -> Result<(), tonic::transport::Error>
where
    F: Future<Output = ()> + Send,
{
    info!("gRPC gateway listening on {}", addr);

    Server::builder()
        .add_service(VisionEdgeService::new(state).into_server())
        .serve_with_shutdown(addr, shutdown)
        .await
}
