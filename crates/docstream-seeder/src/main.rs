//! Docstream seeder CLI
//!
//! Seeds the sample reference data (cities, room notifications) into the
//! in-memory backend and reads it back, demonstrating single-document sets
//! and atomic batch commits.

use chrono::Utc;
use clap::Parser;
use docstream_core::prelude::*;
use docstream_core::MemoryStore;
use docstream_seeder::{SeedRecord, Seeder};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "docstream-seeder")]
#[command(about = "Reference-data seeding demo for docstream")]
#[command(version)]
struct Args {
    /// Identity env file path
    #[arg(short, long, env = "DOCSTREAM_ENV_FILE", default_value = ".env")]
    env_file: PathBuf,

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

    info!(version = env!("CARGO_PKG_VERSION"), "Starting docstream-seeder");

    let identity = Identity::load(Some(&args.env_file))?;
    info!(project_id = %identity.project_id, "resolved identity");

    let store = Arc::new(MemoryStore::new());
    store.start().await?;
    store.health_check().await?;

    let seeder = Seeder::new(store.clone() as Arc<dyn DocumentStore>);

    seed_cities(&seeder).await?;
    let seeded = seeder.seed(notification_records()?).await?;
    info!(seeded, "seeded room notifications");

    // Read one room back to show the data landed.
    let query = Query::new(CollectionPath::parse("rooms/1/notifications")?);
    for (id, document) in store.fetch(&query).await? {
        println!("{} data: {}", id, document);
    }

    store.stop().await?;
    info!("docstream-seeder stopped");
    Ok(())
}

/// Cities are written one document at a time with fixed identifiers
async fn seed_cities(seeder: &Seeder) -> Result<()> {
    let cities = CollectionPath::parse("cities")?;
    let rows: [(&str, Document); 5] = [
        (
            "SF",
            Document::new()
                .with("name", "San Francisco")
                .with("state", "CA")
                .with("country", "USA")
                .with("capital", false)
                .with("population", 860_000_i64),
        ),
        (
            "LA",
            Document::new()
                .with("name", "Los Angeles")
                .with("state", "CA")
                .with("country", "USA")
                .with("capital", false)
                .with("population", 3_900_000_i64),
        ),
        (
            "DC",
            Document::new()
                .with("name", "Washington D.C.")
                .with("country", "USA")
                .with("capital", true)
                .with("population", 680_000_i64),
        ),
        (
            "TOK",
            Document::new()
                .with("name", "Tokyo")
                .with("country", "Japan")
                .with("capital", true)
                .with("population", 9_000_000_i64)
                .with("regions", vec!["kanto".to_string()]),
        ),
        (
            "BJ",
            Document::new()
                .with("name", "Beijing")
                .with("country", "China")
                .with("capital", true)
                .with("population", 21_500_000_i64),
        ),
    ];

    for (id, document) in rows {
        seeder.put(&cities, id, document).await?;
    }
    info!(count = 5, "seeded cities");
    Ok(())
}

/// Room notifications are committed as one atomic batch with
/// store-assigned identifiers
fn notification_records() -> Result<Vec<SeedRecord>> {
    let now = Utc::now();
    let rooms: [(&str, &[(&str, i64)]); 3] = [
        ("1", &[("alice", 600), ("bob", 10), ("carol", 0)]),
        ("3", &[("dave", 60), ("erin", 30), ("frank", 1)]),
        ("6", &[("grace", 10), ("heidi", 9), ("ivan", 0)]),
    ];

    let mut records = Vec::new();
    for (room, senders) in rooms {
        let path = CollectionPath::parse(format!("rooms/{}/notifications", room))?;
        for (sender, minutes_ago) in senders {
            records.push(SeedRecord::new(
                path.clone(),
                Document::new()
                    .with("RoomId", room)
                    .with("Sender", *sender)
                    .with("SendTime", now - chrono::Duration::minutes(*minutes_ago)),
            ));
        }
    }
    Ok(records)
}
