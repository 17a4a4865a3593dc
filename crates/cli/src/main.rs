// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lodge: command-line companion for the lodge server.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod testdata;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, ensure, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};

use lodge_core::{Entity, Hotel, Operation, Reservation};
use lodge_net::NetClientBackend;
use lodge_store::{Backend, BackendExt, SqliteBackend, VecObserver};
use lodge_wire::DEFAULT_PORT;

#[derive(Parser)]
#[command(name = "lodge", about = "Hotel planning command line tool", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill a local database with deterministic sample data
    Seed {
        /// Path to the SQLite database file (created if absent)
        #[arg(long, default_value = "lodge.db")]
        db: PathBuf,

        /// Number of sample hotels
        #[arg(long, default_value_t = 2)]
        hotels: usize,
    },

    /// List hotels and reservations from a running server
    List {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Erase all data on a running server
    Erase {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

fn main() -> anyhow::Result<()> {
    match Cli::parse().command {
        Command::Seed { db, hotels } => seed(&db, hotels),
        Command::List { host, port } => list(&host, port),
        Command::Erase { host, port } => erase(&host, port),
    }
}

fn seed(db: &std::path::Path, hotel_count: usize) -> anyhow::Result<()> {
    let backend = SqliteBackend::open(db)
        .with_context(|| format!("cannot open database {}", db.display()))?;

    let results = backend.queue_operation(Operation::EraseAllData, None).results();
    ensure!(results.iter().all(|result| result.is_successful()), "erasing old data failed");

    // Store hotels one by one; the result payload carries the assigned ids,
    // which the reservations need for their room references.
    let mut stored_hotels = Vec::new();
    for hotel in testdata::sample_hotels(hotel_count) {
        let results =
            backend.queue_operation(Operation::StoreNew(Entity::Hotel(hotel)), None).results();
        match results.first() {
            Some(result) if result.is_successful() => {
                let hotel: Hotel = serde_json::from_value(result.payload.clone())
                    .context("malformed store result")?;
                stored_hotels.push(hotel);
            }
            other => bail!("storing a hotel failed: {other:?}"),
        }
    }

    let base = Utc::now().date_naive();
    let operations: Vec<Operation> = testdata::sample_reservations(&stored_hotels, base)
        .into_iter()
        .map(|reservation| Operation::StoreNew(Entity::Reservation(reservation)))
        .collect();
    let reservation_count = operations.len();
    let results = backend.queue_operations(operations, None).results();
    ensure!(
        results.len() == reservation_count && results.iter().all(|result| result.is_successful()),
        "storing reservations failed: {results:?}"
    );

    println!(
        "seeded {} with {} hotels and {} reservations",
        db.display(),
        stored_hotels.len(),
        reservation_count
    );
    Ok(())
}

fn list(host: &str, port: u16) -> anyhow::Result<()> {
    let client = NetClientBackend::connect(host, port);

    let hotels = VecObserver::<Hotel>::shared();
    let hotel_handle = client.create_stream_typed::<Hotel>(hotels.clone());
    let reservations = VecObserver::<Reservation>::shared();
    let reservation_handle = client.create_stream_typed::<Reservation>(reservations.clone());

    drain_until(&client, || hotel_handle.is_initialized() && reservation_handle.is_initialized())?;

    let hotels = hotels.lock();
    let reservations = reservations.lock();
    println!("{} hotel(s), {} reservation(s)", hotels.items().len(), reservations.items().len());
    for hotel in hotels.items() {
        println!("#{} {} (rev {})", hotel.id, hotel.name, hotel.revision);
        for room in &hotel.rooms {
            let occupant_count = reservations
                .items()
                .iter()
                .filter(|reservation| {
                    reservation.atoms.iter().any(|atom| atom.room_id == room.id)
                })
                .count();
            println!("  [{}] {}: {} reservation(s)", room.category, room.name, occupant_count);
        }
    }
    for reservation in reservations.items() {
        if let Some((from, to)) = reservation.date_range() {
            println!(
                "#{} {} {:?} {}..{} ({} adult(s), {} child(ren))",
                reservation.id,
                reservation.description,
                reservation.status,
                from,
                to,
                reservation.adults,
                reservation.children
            );
        }
    }
    Ok(())
}

fn erase(host: &str, port: u16) -> anyhow::Result<()> {
    let client = NetClientBackend::connect(host, port);
    let results = client.queue_operation(Operation::EraseAllData, None).results();
    ensure!(results.iter().all(|result| result.is_successful()), "erase failed: {results:?}");
    println!("all data erased");
    Ok(())
}

/// Pump the client change queue until `done`, with a timeout guarding
/// against an unreachable server.
fn drain_until(client: &NetClientBackend, mut done: impl FnMut() -> bool) -> anyhow::Result<()> {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        client.change_queue().apply_all_changes();
        ensure!(Instant::now() < deadline, "timed out waiting for the server");
        std::thread::sleep(Duration::from_millis(5));
    }
    Ok(())
}
