use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use vision_edge_gateway::proto::vision_edge_client::VisionEdgeClient;
use vision_edge_gateway::proto::{PublishCloudRequest, SubImageParams};

/// Analytics consumer: watches one camera and forwards a per-frame summary
/// to a cloud backend through the gateway
#[derive(Parser, Debug)]
struct Args {
    /// Gateway address
    #[arg(long, default_value = "http://localhost:50051")]
    addr: String,

    #[arg(long, default_value = "camera1")]
    camera: String,

    /// Cloud backend name as listed by the gateway
    #[arg(long, default_value = "AWS")]
    cloud: String,

    /// Analytics name (cloud topic); defaults to the camera id
    #[arg(long)]
    analytics_name: Option<String>,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let analytics_name = args.analytics_name.clone().unwrap_or_else(|| args.camera.clone());

    let mut client = VisionEdgeClient::connect(args.addr.clone()).await?;
    println!("Connected to {}", args.addr);

    let (tx, rx) = mpsc::channel(16);
    let mut uploader = client.clone();
    let upload =
        tokio::spawn(async move { uploader.publish_to_cloud(ReceiverStream::new(rx)).await });

    let mut frames = client
        .subscribe_image(SubImageParams {
            camera_id: args.camera.clone(),
        })
        .await?
        .into_inner();
    println!(
        "Watching '{}', forwarding to '{}' on topic '{}'\n",
        args.camera, args.cloud, analytics_name
    );

    let mut seen: u64 = 0;
    while let Some(frame) = frames.message().await? {
        if !frame.error.is_empty() {
            println!("Gateway notice: {}", frame.error);
            continue;
        }

        seen += 1;
        let summary = serde_json::json!({
            "object": "frame",
            "bytes": frame.image.len(),
        });
        let request = PublishCloudRequest {
            analytics_name: analytics_name.clone(),
            analytical_output: vec![summary.to_string()],
            timestamp: frame.timestamp.clone(),
            cloud_provider: args.cloud.clone(),
        };
        if tx.send(request).await.is_err() {
            break;
        }
        println!("Forwarded frame {} ({})", seen, frame.timestamp);

        if args.max_frames.is_some_and(|max| seen >= max) {
            break;
        }
    }

    drop(tx);
    let response = upload.await??.into_inner();

    println!(
        "\n✓ Forwarded {} records, {} failed",
        response.records_received, response.records_failed
    );
    if !response.error_msg.is_empty() {
        println!("Gateway reported: {}", response.error_msg);
    }

    Ok(())
}
