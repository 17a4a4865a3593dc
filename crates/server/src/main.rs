// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lodged: hosts a SQLite-backed lodge backend for network clients.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lodge_net::NetServer;
use lodge_store::SqliteBackend;

#[derive(Parser)]
#[command(name = "lodged", about = "Hotel planning backend server", version)]
struct Args {
    /// Path to the SQLite database file (created if absent)
    #[arg(long, default_value = "lodge.db")]
    db: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8081")]
    listen: SocketAddr,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LODGE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let backend = Arc::new(SqliteBackend::open(&args.db)?);
    let server = NetServer::start(backend, args.listen)?;
    info!(db = %args.db.display(), addr = %server.local_addr(), "lodged is up");

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(tokio::signal::ctrl_c())?;

    info!("shutting down");
    server.stop_and_join();
    Ok(())
}
