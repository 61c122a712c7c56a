// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! linevault CLI.
//!
//! # Usage
//!
//! ```bash
//! # Replay a capture log into the event store and drain the buffer
//! linevault --db events.db ingest capture.log
//!
//! # Replay under RED admission
//! linevault --db events.db --strategy red ingest burst.log
//!
//! # Inspect the store
//! linevault --db events.db stats
//! linevault --db events.db query --source capture --type stream
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use linevault::{BufferStrategy, CaptureConfig, CaptureManager, EventStore, SqliteEventStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "linevault")]
#[command(about = "Durable capture-and-ingest for line-oriented event streams", long_about = None)]
#[command(version)]
struct Args {
    /// Database path (SQLite file)
    #[arg(short, long, default_value = "linevault.db")]
    db: String,

    /// Overflow buffer file path
    #[arg(short, long, default_value = "capture_buffer.dat")]
    buffer: PathBuf,

    /// Buffering strategy (fifo or red)
    #[arg(short, long, default_value = "fifo")]
    strategy: BufferStrategy,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a log file into the event store and drain the buffer
    Ingest {
        /// Source log file
        log: PathBuf,
    },
    /// Show store statistics
    Stats,
    /// Query events by source, type and time range
    Query {
        /// Source tag
        #[arg(long, default_value = "capture")]
        source: String,

        /// Type tag
        #[arg(long = "type", default_value = "stream")]
        kind: String,

        /// Range start (Unix nanoseconds)
        #[arg(long, default_value_t = 0)]
        start: u64,

        /// Range end (Unix nanoseconds)
        #[arg(long, default_value_t = u64::MAX)]
        end: u64,
    },
    /// Delete all stored events
    Clear {
        /// Confirm deletion
        #[arg(long)]
        confirm: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .init();

    let store = Arc::new(SqliteEventStore::new(&args.db)?);

    match args.command {
        Commands::Ingest { log } => run_ingest(store, args.buffer, args.strategy, log).await,
        Commands::Stats => {
            println!("Total events stored: {}", store.count()?);
            Ok(())
        }
        Commands::Query {
            source,
            kind,
            start,
            end,
        } => {
            let events = store.query(&source, &kind, start, end)?;
            println!("{} events:", events.len());
            for event in &events {
                println!(
                    "  id={} ts={} {}",
                    event.id, event.timestamp_ns, event.payload
                );
            }
            Ok(())
        }
        Commands::Clear { confirm } => {
            if confirm {
                store.clear()?;
                println!("All events cleared.");
            } else {
                println!("Use --confirm to actually delete events.");
            }
            Ok(())
        }
    }
}

async fn run_ingest(
    store: Arc<SqliteEventStore>,
    buffer: PathBuf,
    strategy: BufferStrategy,
    log: PathBuf,
) -> Result<()> {
    let config = CaptureConfig::builder().buffer_path(buffer).build();
    let manager = CaptureManager::new(store, config);

    manager.start(&log, strategy).await?;
    tracing::info!("capture started from {}", log.display());

    // Wait for the source to be fully replayed and the buffer drained.
    loop {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let status = manager.status();
        if status.source_done && status.buffer_len == 0 {
            break;
        }
    }
    manager.stop().await;

    let status = manager.status();
    println!("Ingested: {}", status.ingested);
    println!("Errors: {}", status.error_count);
    println!("Dropped: {}", status.dropped);
    println!("Rate: {:.2} events/s", status.ingest_rate_eps);
    if !status.last_error.is_empty() {
        println!("Last error: {}", status.last_error);
    }
    Ok(())
}
