// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::NaiveDate;
use serde_json::json;

use super::*;
use crate::{Hotel, Person, Reservation, ReservationStatus};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_hotel() -> Hotel {
    Hotel::new("Seaside").with_category("std", "Standard").with_room("101", "std")
}

fn sample_reservation() -> Reservation {
    Reservation::new("Smith", 4, date(2017, 1, 1), date(2017, 1, 11))
        .with_status(ReservationStatus::New)
}

#[test]
fn erase_all_data_envelope() {
    let value = serde_json::to_value(Operation::EraseAllData).unwrap();
    assert_eq!(json!({ "op": "erase_all_data" }), value);
}

#[test]
fn store_envelope_tags_the_entity_kind() {
    let operation = Operation::StoreNew(Entity::Hotel(sample_hotel()));
    let value = serde_json::to_value(&operation).unwrap();
    assert_eq!("store", value["op"]);
    assert_eq!("hotel", value["t"]);
    assert_eq!("Seaside", value["o"]["name"]);
}

#[test]
fn delete_envelope_carries_a_bare_id() {
    let operation = Operation::Delete(EntityKind::Reservation, 42);
    let value = serde_json::to_value(&operation).unwrap();
    assert_eq!(json!({ "op": "delete", "t": "reservation", "o": 42 }), value);
}

#[test]
fn every_operation_variant_round_trips() {
    let operations = vec![
        Operation::EraseAllData,
        Operation::StoreNew(Entity::Hotel(sample_hotel())),
        Operation::StoreNew(Entity::Reservation(sample_reservation())),
        Operation::StoreNew(Entity::Person(Person::new("Ada", "Lovelace"))),
        Operation::Update(Entity::Hotel(sample_hotel())),
        Operation::Update(Entity::Reservation(sample_reservation())),
        Operation::Delete(EntityKind::Hotel, 7),
        Operation::Delete(EntityKind::Reservation, 9),
        Operation::Delete(EntityKind::Person, 11),
    ];

    for operation in operations {
        let json = serde_json::to_string(&operation).unwrap();
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(operation, back, "round trip failed for {json}");
    }
}

#[test]
fn unknown_op_is_rejected() {
    let result: Result<Operation, _> = serde_json::from_value(json!({ "op": "defragment" }));
    assert!(result.is_err());
}

#[test]
fn store_without_entity_is_rejected() {
    let result: Result<Operation, _> = serde_json::from_value(json!({ "op": "store", "t": "hotel" }));
    assert!(result.is_err());
}

#[test]
fn task_result_status_wire_encoding() {
    assert_eq!(0, TaskResultStatus::Successful.to_wire());
    assert_eq!(1, TaskResultStatus::Error.to_wire());
    assert_eq!(Some(TaskResultStatus::Successful), TaskResultStatus::from_wire(0));
    assert_eq!(Some(TaskResultStatus::Error), TaskResultStatus::from_wire(1));
    assert_eq!(None, TaskResultStatus::from_wire(2));
}

#[test]
fn error_results_carry_a_message_payload() {
    let result = TaskResult::error("version conflict");
    assert!(!result.is_successful());
    assert_eq!("version conflict", result.payload["message"]);
}
