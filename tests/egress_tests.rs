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

// Cloud egress tests

mod common;

use common::MockTransport;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use vision_edge_gateway::{Category, CloudEgressPublisher, GatewayError, Registry};

async fn publisher_with(
    transports: Vec<Arc<MockTransport>>,
    timeout: Duration,
) -> (Arc<Registry>, CloudEgressPublisher) {
    let registry = Arc::new(Registry::new());
    let mut egress = CloudEgressPublisher::new(registry.clone(), timeout);
    for transport in transports {
        egress.attach(transport).await;
    }
    (registry, egress)
}

#[tokio::test]
async fn test_attach_registers_cloud() {
    let gcp = Arc::new(MockTransport::new("GCP"));
    let aws = Arc::new(MockTransport::new("AWS"));
    let (registry, egress) = publisher_with(vec![gcp, aws], Duration::from_secs(1)).await;

    assert_eq!(
        registry.list(Category::Cloud).await,
        vec!["GCP".to_string(), "AWS".to_string()]
    );
    egress.publish("AWS", "t", vec![]).await.unwrap();
}

#[tokio::test]
async fn test_publish_routes_to_named_backend() {
    let gcp = Arc::new(MockTransport::new("GCP"));
    let aws = Arc::new(MockTransport::new("AWS"));
    let (_, egress) =
        publisher_with(vec![gcp.clone(), aws.clone()], Duration::from_secs(1)).await;

    egress
        .publish("AWS", "people", b"{}".to_vec())
        .await
        .unwrap();

    assert_eq!(aws.published(), vec![("people".to_string(), b"{}".to_vec())]);
    assert!(gcp.published().is_empty());
}

#[tokio::test]
async fn test_unknown_backend_has_no_side_effects() {
    let gcp = Arc::new(MockTransport::new("GCP"));
    let (registry, egress) = publisher_with(vec![gcp.clone()], Duration::from_secs(1)).await;

    let err = egress
        .publish("AZURE", "people", b"{}".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::UnknownBackend(ref name) if name == "AZURE"));
    assert!(gcp.published().is_empty());
    assert_eq!(registry.list(Category::Cloud).await, vec!["GCP".to_string()]);
}

#[tokio::test]
async fn test_removed_cloud_is_unknown() {
    let gcp = Arc::new(MockTransport::new("GCP"));
    let (registry, egress) = publisher_with(vec![gcp.clone()], Duration::from_secs(1)).await;

    registry.remove(Category::Cloud, "GCP").await.unwrap();

    let err = egress.publish("GCP", "t", vec![]).await.unwrap_err();
    assert!(matches!(err, GatewayError::UnknownBackend(_)));
    assert!(gcp.published().is_empty());
}

#[tokio::test]
async fn test_transport_error_is_returned() {
    let gcp = Arc::new(MockTransport::new("GCP"));
    gcp.fail.store(true, Ordering::SeqCst);
    let (_, egress) = publisher_with(vec![gcp], Duration::from_secs(1)).await;

    let err = egress.publish("GCP", "t", vec![1]).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport { .. }));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let slow = Arc::new(MockTransport::with_delay("GCP", Duration::from_secs(5)));
    let (_, egress) = publisher_with(vec![slow.clone()], Duration::from_millis(50)).await;

    let err = egress.publish("GCP", "t", vec![1]).await.unwrap_err();
    assert!(matches!(err, GatewayError::Timeout { .. }));
    assert!(slow.published().is_empty());
}
