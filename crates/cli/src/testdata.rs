// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic sample data for seeding a database.

use chrono::{Duration, NaiveDate};

use lodge_core::{Hotel, Reservation, ReservationStatus};

const HOTEL_NAMES: &[&str] =
    &["Hotel Aurora", "Hotel Borealis", "Hotel Cardamom", "Hotel Dune", "Hotel Ember"];

const GUEST_NAMES: &[&str] = &[
    "Alvarez", "Brand", "Chen", "Dupont", "Eriksen", "Fontaine", "Garcia", "Hansen",
];

const STATUSES: &[ReservationStatus] = &[
    ReservationStatus::New,
    ReservationStatus::Confirmed,
    ReservationStatus::CheckedIn,
];

/// Hotels with a standard and a deluxe category and four rooms each.
pub fn sample_hotels(count: usize) -> Vec<Hotel> {
    (0..count)
        .map(|index| {
            let name = HOTEL_NAMES[index % HOTEL_NAMES.len()];
            let mut hotel = Hotel::new(name)
                .with_category("std", "Standard")
                .with_category("dlx", "Deluxe");
            for room in 1..=4 {
                let category = if room == 4 { "dlx" } else { "std" };
                hotel = hotel.with_room(&format!("1{room:02}"), category);
            }
            hotel
        })
        .collect()
}

/// Two back-to-back stays per room, starting around `base`. Stays never
/// overlap on a room, so the whole set stores cleanly.
pub fn sample_reservations(hotels: &[Hotel], base: NaiveDate) -> Vec<Reservation> {
    let mut reservations = Vec::new();
    let mut guest = 0usize;

    for hotel in hotels {
        for (index, room) in hotel.rooms.iter().enumerate() {
            let mut from = base + Duration::days(index as i64);
            for stay in 0..2 {
                let nights = 2 + ((index + stay) % 4) as i64;
                let to = from + Duration::days(nights);
                let reservation = Reservation::new(
                    format!("{} ({})", GUEST_NAMES[guest % GUEST_NAMES.len()], hotel.name),
                    room.id,
                    from,
                    to,
                )
                .with_status(STATUSES[guest % STATUSES.len()])
                .with_occupancy(1 + (guest % 2) as u32, (guest % 3) as u32);
                reservations.push(reservation);
                guest += 1;
                from = to + Duration::days(1);
            }
        }
    }
    reservations
}
