//! Docstream listener CLI
//!
//! Seeds a handful of room notifications into the in-memory backend, then
//! listens on a collection and prints every incoming change until Ctrl-C
//! (or `--run-for-secs` elapses).

use chrono::Utc;
use clap::Parser;
use docstream_core::prelude::*;
use docstream_core::MemoryStore;
use docstream_listener::{Listener, ListenerOptions, PrintHandler};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "docstream-listener")]
#[command(about = "Live change listener demo for docstream")]
#[command(version)]
struct Args {
    /// Identity env file path
    #[arg(short, long, env = "DOCSTREAM_ENV_FILE", default_value = ".env")]
    env_file: PathBuf,

    /// Collection to listen on
    #[arg(long, env = "DOCSTREAM_COLLECTION", default_value = "rooms/1/notifications")]
    collection: String,

    /// Restrict to these RoomId values (comma-separated)
    #[arg(long, env = "DOCSTREAM_ROOM_IDS")]
    room_ids: Option<String>,

    /// Stop after this many seconds (runs until Ctrl-C when unset)
    #[arg(long, env = "DOCSTREAM_RUN_FOR_SECS")]
    run_for_secs: Option<u64>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting docstream-listener");

    let identity = Identity::load(Some(&args.env_file))?;
    info!(project_id = %identity.project_id, "resolved identity");

    let store = Arc::new(MemoryStore::new());
    store.start().await?;
    store.health_check().await?;

    seed_demo_notifications(store.as_ref()).await?;

    let path = CollectionPath::parse(&args.collection)?;
    let mut query = Query::new(path);
    if let Some(rooms) = &args.room_ids {
        let ids: Vec<String> = rooms.split(',').map(|s| s.trim().to_string()).collect();
        query = query.with_filter(Filter::in_set("RoomId", ids)?);
    }

    let options = ListenerOptions {
        max_lifetime: args.run_for_secs.map(Duration::from_secs),
        ..Default::default()
    };
    let listener = Listener::with_options(store.clone() as Arc<dyn DocumentStore>, options);
    let handle = listener.start(query, Arc::new(PrintHandler::new()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
        _ = handle.join() => info!(state = %handle.state(), "listener finished"),
    }

    handle.stop().await;
    store.stop().await?;
    info!("docstream-listener stopped");
    Ok(())
}

/// Put a few notifications in place so the initial snapshot has content
async fn seed_demo_notifications(store: &MemoryStore) -> Result<()> {
    let path = CollectionPath::parse("rooms/1/notifications")?;
    let now = Utc::now();

    let mut batch = WriteBatch::new();
    for (id, sender, minutes_ago) in [
        ("n1", "alice", 30_i64),
        ("n2", "bob", 10),
        ("n3", "carol", 1),
    ] {
        batch.set_with_id(
            path.clone(),
            id,
            Document::new()
                .with("RoomId", "1")
                .with("Sender", sender)
                .with("SendTime", now - chrono::Duration::minutes(minutes_ago)),
        );
    }

    let seeded = store.commit(batch).await?;
    info!(seeded, collection = %path, "seeded demo notifications");
    Ok(())
}
