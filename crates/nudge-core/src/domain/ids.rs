//! Entity identifiers (strongly-typed IDs).
//!
//! # 不透明な文字列 ID + Phantom type
//! ホスト側のエンティティストアが払い出す ID の形式はストア次第なので、
//! 中身は素の文字列として扱います。`Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` はマーカー型（PhantomData）としてコンパイル時の型安全性だけを提供します。
//!
//! - ReminderId と TaskId は混同できない
//! - JSON 上は素の文字列（`serde(transparent)`）
//! - エンジン自身が作る ID（次回リマインダー、送信レコード）は `IdGenerator` が払い出す

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"reminder-", "task-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    /// ストアが知っている素の ID
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Standalone reminder のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reminder {}

impl IdMarker for Reminder {
    fn prefix() -> &'static str {
        "reminder-"
    }
}

/// Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Meeting のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Meeting {}

impl IdMarker for Meeting {
    fn prefix() -> &'static str {
        "meeting-"
    }
}

/// Outbound message のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Message {}

impl IdMarker for Message {
    fn prefix() -> &'static str {
        "message-"
    }
}

// ========================================
// Type Alias
// ========================================

/// Identifier of a standalone reminder record.
pub type ReminderId = Id<Reminder>;

/// Identifier of a task (owner of a legacy reminder and/or a reminder list).
pub type TaskId = Id<Task>;

/// Identifier of a meeting (owner of a reminder list).
pub type MeetingId = Id<Meeting>;

/// Identifier of a queued chat/SMS message record.
pub type MessageId = Id<Message>;

/// The entity that owns an occurrence's persisted state.
///
/// Commits are serialized per `EntityRef`, so it is also the grouping key for
/// the engine's workers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Reminder(ReminderId),
    Task(TaskId),
    Meeting(MeetingId),
}

impl EntityRef {
    /// Bare id string, as the hosted store and the UI know it.
    pub fn raw_id(&self) -> &str {
        match self {
            EntityRef::Reminder(id) => id.as_str(),
            EntityRef::Task(id) => id.as_str(),
            EntityRef::Meeting(id) => id.as_str(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Reminder(id) => id.fmt(f),
            EntityRef::Task(id) => id.fmt(f),
            EntityRef::Meeting(id) => id.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(ReminderId::new("a1").to_string(), "reminder-a1");
        assert_eq!(TaskId::new("a1").to_string(), "task-a1");
        assert_eq!(MeetingId::new("a1").to_string(), "meeting-a1");
        assert_eq!(MessageId::new("a1").to_string(), "message-a1");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TaskId::new("01HRZ8M3K9Q4V7X2B5N6P8T0WC");

        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::Value::String("01HRZ8M3K9Q4V7X2B5N6P8T0WC".to_string()));

        let back: TaskId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn store_ids_of_any_shape_are_accepted() {
        for raw in ["65f1a2b3c4d5e6f7a8b9c0d1", "42", "rec_9f8e-7d6c"] {
            let id: MeetingId = serde_json::from_value(serde_json::json!(raw)).unwrap();
            assert_eq!(id.as_str(), raw);
        }
    }

    #[test]
    fn entity_ref_raw_id_drops_prefix() {
        let owner = EntityRef::Meeting(MeetingId::new("65f1a2b3c4d5e6f7a8b9c0d1"));
        assert_eq!(owner.raw_id(), "65f1a2b3c4d5e6f7a8b9c0d1");
        assert_eq!(owner.to_string(), "meeting-65f1a2b3c4d5e6f7a8b9c0d1");
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<ReminderId>(), size_of::<String>());
    }
}
