//! Shared test fixtures for the app layer.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use ulid::Ulid;

use crate::domain::{Meeting, Reminder, Task, TimeResolver};
use crate::impls::{InMemoryEntityStore, Snapshot};
use crate::ports::FixedClock;

pub fn resolver() -> TimeResolver {
    TimeResolver::from_zone_str("+02:00").unwrap()
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn store_at(snapshot: Snapshot, now: DateTime<Utc>) -> (Arc<InMemoryEntityStore>, FixedClock) {
    let clock = FixedClock::new(now);
    let store = InMemoryEntityStore::new(snapshot, Arc::new(clock.clone()));
    (Arc::new(store), clock)
}

fn with_identity(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.entry("id").or_insert_with(|| json!(Ulid::new().to_string()));
        map.entry("title").or_insert_with(|| json!("Untitled"));
    }
    value
}

pub fn task(value: Value) -> Task {
    serde_json::from_value(with_identity(value)).unwrap()
}

pub fn meeting(value: Value) -> Meeting {
    serde_json::from_value(with_identity(value)).unwrap()
}

pub fn reminder(value: Value) -> Reminder {
    serde_json::from_value(with_identity(value)).unwrap()
}
