//! Photo thumbnail worker binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use photoq_media::{HttpFetcher, ThumbnailGenerator};
use photoq_queue::PhotoQueue;
use photoq_store::PhotoStore;
use photoq_worker::{PhotoProcessor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting photoq-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    for dir in [&config.work_dir, &config.thumbs_dir] {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            error!("Failed to create directory {}: {}", dir.display(), e);
            std::process::exit(1);
        }
    }

    let store = match PhotoStore::from_env().await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to connect to store: {}", e);
            std::process::exit(1);
        }
    };

    let queue = match PhotoQueue::from_env().await {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to connect to queue: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = queue.declare().await {
        error!("Failed to declare queue: {}", e);
        std::process::exit(1);
    }

    let processor = PhotoProcessor::new(store, HttpFetcher::new(), ThumbnailGenerator, config);

    // Shutdown signal stops the consume loop between deliveries
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    // A transport failure that exhausts the retry bound lands here; exit
    // non-zero so the supervisor restarts the consumer.
    if let Err(e) = queue
        .consume(shutdown_rx, |photo_id| processor.handle_delivery(photo_id))
        .await
    {
        error!("Consumer stopped with fatal transport error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("photoq=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
