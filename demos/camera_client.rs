use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use vision_edge_gateway::proto::vision_edge_client::VisionEdgeClient;
use vision_edge_gateway::proto::PublishImageRequest;

/// Camera producer: streams frames for one camera id to the gateway
#[derive(Parser, Debug)]
struct Args {
    /// Gateway address
    #[arg(long, default_value = "http://localhost:50051")]
    addr: String,

    #[arg(long, default_value = "camera1")]
    camera: String,

    /// Number of frames to send
    #[arg(long, default_value_t = 10)]
    frames: u32,

    /// Delay between frames
    #[arg(long, default_value_t = 1500)]
    interval_ms: u64,

    /// Encoded image to send as every frame; synthetic bytes when absent
    #[arg(long)]
    image: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let image = match &args.image {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read image {:?}", path))?,
        None => vec![0xFF, 0xD8, 0xFF, 0xE0],
    };

    let mut client = VisionEdgeClient::connect(args.addr.clone()).await?;
    println!("Connected to {}", args.addr);
    println!("Streaming {} frames as '{}'\n", args.frames, args.camera);

    let (tx, rx) = mpsc::channel(8);
    let camera = args.camera.clone();
    let frames = args.frames;
    let interval = Duration::from_millis(args.interval_ms);

    tokio::spawn(async move {
        for i in 0..frames {
            let mut frame = image.clone();
            frame.extend_from_slice(&i.to_be_bytes());

            let timestamp = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
            let request = PublishImageRequest {
                camera_id: camera.clone(),
                image: frame,
                timestamp: timestamp.to_string(),
            };
            if tx.send(request).await.is_err() {
                break;
            }
            println!("Sent frame {} at {}", i + 1, timestamp);
            tokio::time::sleep(interval).await;
        }
    });

    let response = client
        .publish_image(ReceiverStream::new(rx))
        .await?
        .into_inner();

    println!(
        "\n✓ Gateway accepted {} of {} frames",
        response.records_received - response.records_failed,
        response.records_received
    );
    if !response.error_msg.is_empty() {
        println!("Gateway reported: {}", response.error_msg);
    }

    Ok(())
}
