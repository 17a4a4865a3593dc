// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQL layer: schema, loads, stores, and revision-guarded updates.
//!
//! The connection lives on the backend worker thread and never leaves it.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, Transaction};
use tracing::warn;

use lodge_core::{Hotel, HotelRoom, Reservation, ReservationAtom, ReservationStatus, RoomCategory};

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS h_hotel (
    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    revision INTEGER NOT NULL DEFAULT 1,
    name TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS h_room_category (
    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    hotel_id INTEGER NOT NULL,
    short_code TEXT NOT NULL,
    name TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS h_room (
    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    hotel_id INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    name TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS h_reservation (
    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    revision INTEGER NOT NULL DEFAULT 1,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    adults INTEGER NOT NULL,
    children INTEGER NOT NULL);
CREATE TABLE IF NOT EXISTS h_reservation_atom (
    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    reservation_id INTEGER NOT NULL,
    room_id INTEGER NOT NULL,
    date_from TEXT NOT NULL,
    date_to TEXT NOT NULL);
";

fn status_to_str(status: ReservationStatus) -> &'static str {
    match status {
        ReservationStatus::Unknown => "unknown",
        ReservationStatus::Temporary => "temporary",
        ReservationStatus::New => "new",
        ReservationStatus::Confirmed => "confirmed",
        ReservationStatus::CheckedIn => "checked_in",
        ReservationStatus::CheckedOut => "checked_out",
        ReservationStatus::Archived => "archived",
    }
}

fn status_from_str(text: &str) -> ReservationStatus {
    match text {
        "unknown" => ReservationStatus::Unknown,
        "temporary" => ReservationStatus::Temporary,
        "new" => ReservationStatus::New,
        "confirmed" => ReservationStatus::Confirmed,
        "checked_in" => ReservationStatus::CheckedIn,
        "checked_out" => ReservationStatus::CheckedOut,
        "archived" => ReservationStatus::Archived,
        other => {
            warn!(status = other, "unknown reservation status in database");
            ReservationStatus::Unknown
        }
    }
}

pub(crate) struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn transaction(&self) -> Result<Transaction<'_>, rusqlite::Error> {
        self.conn.unchecked_transaction()
    }

    /// Drop and recreate the whole schema.
    pub fn delete_all(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "DROP TABLE IF EXISTS h_reservation_atom;
             DROP TABLE IF EXISTS h_reservation;
             DROP TABLE IF EXISTS h_room;
             DROP TABLE IF EXISTS h_room_category;
             DROP TABLE IF EXISTS h_hotel;",
        )?;
        self.conn.execute_batch(SCHEMA)
    }

    pub fn load_hotels(&self) -> Result<Vec<Hotel>, rusqlite::Error> {
        let mut hotels = {
            let mut statement = self
                .conn
                .prepare_cached("SELECT id, revision, name FROM h_hotel ORDER BY id")?;
            let rows = statement.query_map([], |row| {
                Ok(Hotel {
                    id: row.get(0)?,
                    revision: row.get(1)?,
                    name: row.get(2)?,
                    categories: Vec::new(),
                    rooms: Vec::new(),
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        for hotel in &mut hotels {
            self.load_hotel_children(hotel)?;
        }
        Ok(hotels)
    }

    pub fn load_hotel(&self, id: i64) -> Result<Option<Hotel>, rusqlite::Error> {
        let mut statement = self
            .conn
            .prepare_cached("SELECT id, revision, name FROM h_hotel WHERE id = ?1")?;
        let mut rows = statement.query_map(params![id], |row| {
            Ok(Hotel {
                id: row.get(0)?,
                revision: row.get(1)?,
                name: row.get(2)?,
                categories: Vec::new(),
                rooms: Vec::new(),
            })
        })?;
        let Some(hotel) = rows.next().transpose()? else {
            return Ok(None);
        };
        drop(rows);
        let mut hotel = hotel;
        self.load_hotel_children(&mut hotel)?;
        Ok(Some(hotel))
    }

    fn load_hotel_children(&self, hotel: &mut Hotel) -> Result<(), rusqlite::Error> {
        let mut categories = self.conn.prepare_cached(
            "SELECT id, short_code, name FROM h_room_category WHERE hotel_id = ?1 ORDER BY id",
        )?;
        hotel.categories = categories
            .query_map(params![hotel.id], |row| {
                Ok(RoomCategory {
                    id: row.get(0)?,
                    revision: 0,
                    short_code: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rooms = self.conn.prepare_cached(
            "SELECT r.id, c.short_code, r.name FROM h_room r \
             JOIN h_room_category c ON r.category_id = c.id \
             WHERE r.hotel_id = ?1 ORDER BY r.id",
        )?;
        hotel.rooms = rooms
            .query_map(params![hotel.id], |row| {
                Ok(HotelRoom { id: row.get(0)?, revision: 0, category: row.get(1)?, name: row.get(2)? })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(())
    }

    /// Insert a hotel with its categories and rooms, assigning ids and
    /// setting revision 1.
    pub fn store_new_hotel(&self, hotel: &mut Hotel) -> Result<(), rusqlite::Error> {
        self.conn
            .prepare_cached("INSERT INTO h_hotel (name) VALUES (?1)")?
            .execute(params![hotel.name])?;
        hotel.id = self.conn.last_insert_rowid();
        hotel.revision = 1;

        for category in &mut hotel.categories {
            self.conn
                .prepare_cached(
                    "INSERT INTO h_room_category (hotel_id, short_code, name) VALUES (?1, ?2, ?3)",
                )?
                .execute(params![hotel.id, category.short_code, category.name])?;
            category.id = self.conn.last_insert_rowid();
        }

        let category_ids = category_id_map(&hotel.categories);
        for room in &mut hotel.rooms {
            let Some(category_id) = category_ids.get(&room.category) else {
                warn!(room = room.name, category = room.category, "room references unknown category");
                continue;
            };
            self.conn
                .prepare_cached(
                    "INSERT INTO h_room (hotel_id, category_id, name) VALUES (?1, ?2, ?3)",
                )?
                .execute(params![hotel.id, category_id, room.name])?;
            room.id = self.conn.last_insert_rowid();
        }
        Ok(())
    }

    /// Revision-guarded whole-object replacement.
    ///
    /// Returns false (leaving the hotel untouched) on a revision mismatch.
    /// Nested categories and rooms are synced by id: matching rows are
    /// updated, id-0 entries inserted, missing rows deleted.
    pub fn update_hotel(&self, hotel: &mut Hotel) -> Result<bool, rusqlite::Error> {
        let changed = self
            .conn
            .prepare_cached(
                "UPDATE h_hotel SET name = ?1, revision = revision + 1 \
                 WHERE id = ?2 AND revision = ?3",
            )?
            .execute(params![hotel.name, hotel.id, hotel.revision])?;
        if changed == 0 {
            return Ok(false);
        }
        hotel.revision += 1;
        self.sync_categories(hotel)?;
        self.sync_rooms(hotel)?;
        Ok(true)
    }

    fn sync_categories(&self, hotel: &mut Hotel) -> Result<(), rusqlite::Error> {
        let existing: Vec<i64> = self
            .conn
            .prepare_cached("SELECT id FROM h_room_category WHERE hotel_id = ?1")?
            .query_map(params![hotel.id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        for category in &mut hotel.categories {
            if category.id != 0 && existing.contains(&category.id) {
                self.conn
                    .prepare_cached(
                        "UPDATE h_room_category SET short_code = ?1, name = ?2 \
                         WHERE id = ?3 AND hotel_id = ?4",
                    )?
                    .execute(params![category.short_code, category.name, category.id, hotel.id])?;
            } else {
                self.conn
                    .prepare_cached(
                        "INSERT INTO h_room_category (hotel_id, short_code, name) \
                         VALUES (?1, ?2, ?3)",
                    )?
                    .execute(params![hotel.id, category.short_code, category.name])?;
                category.id = self.conn.last_insert_rowid();
            }
        }

        for id in existing {
            if !hotel.categories.iter().any(|category| category.id == id) {
                self.conn
                    .prepare_cached("DELETE FROM h_room_category WHERE id = ?1")?
                    .execute(params![id])?;
            }
        }
        Ok(())
    }

    fn sync_rooms(&self, hotel: &mut Hotel) -> Result<(), rusqlite::Error> {
        let existing: Vec<i64> = self
            .conn
            .prepare_cached("SELECT id FROM h_room WHERE hotel_id = ?1")?
            .query_map(params![hotel.id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let category_ids = category_id_map(&hotel.categories);
        for room in &mut hotel.rooms {
            let Some(category_id) = category_ids.get(&room.category) else {
                warn!(room = room.name, category = room.category, "room references unknown category");
                continue;
            };
            if room.id != 0 && existing.contains(&room.id) {
                self.conn
                    .prepare_cached(
                        "UPDATE h_room SET category_id = ?1, name = ?2 \
                         WHERE id = ?3 AND hotel_id = ?4",
                    )?
                    .execute(params![category_id, room.name, room.id, hotel.id])?;
            } else {
                self.conn
                    .prepare_cached(
                        "INSERT INTO h_room (hotel_id, category_id, name) VALUES (?1, ?2, ?3)",
                    )?
                    .execute(params![hotel.id, category_id, room.name])?;
                room.id = self.conn.last_insert_rowid();
            }
        }

        for id in existing {
            if !hotel.rooms.iter().any(|room| room.id == id) {
                self.conn
                    .prepare_cached("DELETE FROM h_room WHERE id = ?1")?
                    .execute(params![id])?;
            }
        }
        Ok(())
    }

    pub fn delete_hotel(&self, id: i64) -> Result<(), rusqlite::Error> {
        self.conn
            .prepare_cached("DELETE FROM h_room WHERE hotel_id = ?1")?
            .execute(params![id])?;
        self.conn
            .prepare_cached("DELETE FROM h_room_category WHERE hotel_id = ?1")?
            .execute(params![id])?;
        self.conn.prepare_cached("DELETE FROM h_hotel WHERE id = ?1")?.execute(params![id])?;
        Ok(())
    }

    pub fn load_reservations(&self) -> Result<Vec<Reservation>, rusqlite::Error> {
        let mut statement = self.conn.prepare_cached(
            "SELECT r.id, r.revision, r.description, r.status, r.adults, r.children, \
                    a.id, a.room_id, a.date_from, a.date_to \
             FROM h_reservation r JOIN h_reservation_atom a ON a.reservation_id = r.id \
             ORDER BY r.id, a.date_from",
        )?;
        let rows = statement.query_map([], reservation_row)?;

        let mut reservations: Vec<Reservation> = Vec::new();
        for row in rows {
            let (reservation, atom) = row?;
            match reservations.last_mut() {
                Some(current) if current.id == reservation.id => current.atoms.push(atom),
                _ => {
                    let mut reservation = reservation;
                    reservation.atoms.push(atom);
                    reservations.push(reservation);
                }
            }
        }
        Ok(reservations)
    }

    pub fn load_reservation(&self, id: i64) -> Result<Option<Reservation>, rusqlite::Error> {
        let mut statement = self.conn.prepare_cached(
            "SELECT r.id, r.revision, r.description, r.status, r.adults, r.children, \
                    a.id, a.room_id, a.date_from, a.date_to \
             FROM h_reservation r JOIN h_reservation_atom a ON a.reservation_id = r.id \
             WHERE r.id = ?1 ORDER BY a.date_from",
        )?;
        let rows = statement.query_map(params![id], reservation_row)?;

        let mut result: Option<Reservation> = None;
        for row in rows {
            let (reservation, atom) = row?;
            match &mut result {
                Some(current) => current.atoms.push(atom),
                None => {
                    let mut reservation = reservation;
                    reservation.atoms.push(atom);
                    result = Some(reservation);
                }
            }
        }
        Ok(result)
    }

    /// Insert a reservation with its atoms, assigning ids and setting
    /// revision 1.
    pub fn store_new_reservation(&self, reservation: &mut Reservation) -> Result<(), rusqlite::Error> {
        self.conn
            .prepare_cached(
                "INSERT INTO h_reservation (description, status, adults, children) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![
                reservation.description,
                status_to_str(reservation.status),
                i64::from(reservation.adults),
                i64::from(reservation.children),
            ])?;
        reservation.id = self.conn.last_insert_rowid();
        reservation.revision = 1;
        self.insert_atoms(reservation)
    }

    /// Revision-guarded whole-object replacement; the atom set is replaced
    /// wholesale. Returns false on a revision mismatch.
    pub fn update_reservation(&self, reservation: &mut Reservation) -> Result<bool, rusqlite::Error> {
        let changed = self
            .conn
            .prepare_cached(
                "UPDATE h_reservation SET description = ?1, status = ?2, adults = ?3, \
                 children = ?4, revision = revision + 1 WHERE id = ?5 AND revision = ?6",
            )?
            .execute(params![
                reservation.description,
                status_to_str(reservation.status),
                i64::from(reservation.adults),
                i64::from(reservation.children),
                reservation.id,
                reservation.revision,
            ])?;
        if changed == 0 {
            return Ok(false);
        }
        reservation.revision += 1;
        self.conn
            .prepare_cached("DELETE FROM h_reservation_atom WHERE reservation_id = ?1")?
            .execute(params![reservation.id])?;
        self.insert_atoms(reservation)?;
        Ok(true)
    }

    fn insert_atoms(&self, reservation: &mut Reservation) -> Result<(), rusqlite::Error> {
        for atom in &mut reservation.atoms {
            self.conn
                .prepare_cached(
                    "INSERT INTO h_reservation_atom (reservation_id, room_id, date_from, date_to) \
                     VALUES (?1, ?2, ?3, ?4)",
                )?
                .execute(params![reservation.id, atom.room_id, atom.from, atom.to])?;
            atom.id = self.conn.last_insert_rowid();
        }
        Ok(())
    }

    pub fn delete_reservation(&self, id: i64) -> Result<(), rusqlite::Error> {
        self.conn
            .prepare_cached("DELETE FROM h_reservation_atom WHERE reservation_id = ?1")?
            .execute(params![id])?;
        self.conn
            .prepare_cached("DELETE FROM h_reservation WHERE id = ?1")?
            .execute(params![id])?;
        Ok(())
    }

    pub fn room_exists(&self, room_id: i64) -> Result<bool, rusqlite::Error> {
        let count: i64 = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM h_room WHERE id = ?1")?
            .query_row(params![room_id], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// True if any stored atom overlaps `[from, to)` on the given room,
    /// optionally excluding one reservation's own atoms.
    pub fn has_overlap(
        &self,
        room_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        exclude_reservation: Option<i64>,
    ) -> Result<bool, rusqlite::Error> {
        let count: i64 = self
            .conn
            .prepare_cached(
                "SELECT COUNT(*) FROM h_reservation_atom \
                 WHERE room_id = ?1 AND date_from < ?2 AND date_to > ?3 \
                 AND (?4 IS NULL OR reservation_id <> ?4)",
            )?
            .query_row(params![room_id, to, from, exclude_reservation], |row| row.get(0))?;
        Ok(count > 0)
    }
}

fn category_id_map(categories: &[RoomCategory]) -> HashMap<String, i64> {
    categories
        .iter()
        .map(|category| (category.short_code.clone(), category.id))
        .collect()
}

type ReservationRow = (Reservation, ReservationAtom);

fn reservation_row(row: &rusqlite::Row<'_>) -> Result<ReservationRow, rusqlite::Error> {
    let status: String = row.get(3)?;
    let adults: i64 = row.get(4)?;
    let children: i64 = row.get(5)?;
    let reservation = Reservation {
        id: row.get(0)?,
        revision: row.get(1)?,
        description: row.get(2)?,
        status: status_from_str(&status),
        adults: u32::try_from(adults).unwrap_or_default(),
        children: u32::try_from(children).unwrap_or_default(),
        atoms: Vec::new(),
    };
    let atom = ReservationAtom {
        id: row.get(6)?,
        revision: 0,
        room_id: row.get(7)?,
        from: row.get(8)?,
        to: row.get(9)?,
    };
    Ok((reservation, atom))
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
