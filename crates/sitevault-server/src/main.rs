//! SiteVault Server
//!
//! HTTP API for configuration backup, migration, and database snapshots.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use sitevault::schedule::{FileScheduleStore, SnapshotScheduler};
use sitevault::snapshot::{
    CommandTemplate, FileSnapshotStore, SnapshotService, SnapshotServiceConfig,
};
use sitevault::store::MemoryStore;
use sitevault_server::{router, AppState};

#[derive(Parser)]
#[command(name = "sitevault-server")]
#[command(about = "Configuration backup and snapshot server for SiteVault")]
struct Args {
    /// Directory for snapshot artifacts and persisted state
    #[arg(long, default_value = "./data")]
    data_dir: String,

    /// Shell command that dumps the database to {archive}
    #[arg(long, default_value = "mongodump --archive={archive} --gzip")]
    dump_command: String,

    /// Shell command that restores the database from {archive}
    #[arg(long, default_value = "mongorestore --archive={archive} --gzip --drop")]
    restore_command: String,

    /// Timeout in seconds for a single dump/restore invocation
    #[arg(long, default_value = "600")]
    command_timeout: u64,

    /// Identifier stamped into exported archives
    #[arg(long, default_value = "sitevault")]
    source_identifier: String,

    /// Port to listen on
    #[arg(short, long, default_value = "4000")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sitevault_server=info".parse()?)
                .add_directive("sitevault=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let data_dir = std::path::PathBuf::from(&args.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let store = Arc::new(MemoryStore::new());

    let snapshot_store =
        Arc::new(FileSnapshotStore::open(data_dir.join("snapshots.json"))?);
    let mut snapshot_config = SnapshotServiceConfig::new(
        data_dir.join("snapshots"),
        CommandTemplate::new("sh", ["-c", args.dump_command.as_str()]),
        CommandTemplate::new("sh", ["-c", args.restore_command.as_str()]),
    );
    snapshot_config.timeout = Duration::from_secs(args.command_timeout);
    let snapshots = Arc::new(SnapshotService::new(snapshot_config, snapshot_store));

    let schedule_store = Arc::new(FileScheduleStore::new(data_dir.join("schedule.json")));
    let scheduler = SnapshotScheduler::new(snapshots.clone(), schedule_store.clone());
    if let Err(err) = scheduler.start() {
        warn!(%err, "could not load the backup schedule; automatic backups are off");
    }

    let state = Arc::new(AppState {
        store,
        snapshots,
        scheduler,
        schedule_store,
        source_identifier: args.source_identifier,
    });
    let app = router(state);

    let addr = format!("{}:{}", args.host, args.port);
    info!("SiteVault API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
