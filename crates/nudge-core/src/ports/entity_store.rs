//! EntityStore port - ホスト側エンティティストア（正本）
//!
//! リマインダー・タスク・ミーティングの読み書きを抽象化します。
//!
//! # 設計原則
//! - 更新はフィールド単位の部分更新（Patch）
//! - 埋め込みリストは常にリスト全体を 1 フィールドとして書き戻す
//! - 実装はタイムアウトを持たなくてよい（呼び出し側が `bounded` で包む）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    EmbeddedReminder, Meeting, MeetingId, MeetingStatus, NewReminder, Reminder, ReminderId,
    ReminderStatus, Task, TaskId, TaskStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} not found")]
    NotFound { entity: String },

    #[error("store operation {op} timed out")]
    Timeout { op: String },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Partial update of a standalone reminder. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderPatch {
    pub status: Option<ReminderStatus>,
}

/// Partial update of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub reminder_sent: Option<bool>,
    /// Replaces the whole embedded list.
    pub reminders: Option<Vec<EmbeddedReminder>>,
}

/// Partial update of a meeting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingPatch {
    /// Replaces the whole embedded list.
    pub reminders: Option<Vec<EmbeddedReminder>>,
}

/// EntityStore はエンジンが読む・書くすべてのエンティティの窓口
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn list_reminders(&self, status: ReminderStatus) -> Result<Vec<Reminder>, StoreError>;

    async fn list_tasks(&self, statuses: &[TaskStatus]) -> Result<Vec<Task>, StoreError>;

    async fn list_meetings(&self, statuses: &[MeetingStatus]) -> Result<Vec<Meeting>, StoreError>;

    async fn get_reminder(&self, id: ReminderId) -> Result<Reminder, StoreError>;

    async fn get_task(&self, id: TaskId) -> Result<Task, StoreError>;

    async fn get_meeting(&self, id: MeetingId) -> Result<Meeting, StoreError>;

    async fn update_reminder(&self, id: ReminderId, patch: ReminderPatch) -> Result<(), StoreError>;

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<(), StoreError>;

    async fn update_meeting(&self, id: MeetingId, patch: MeetingPatch) -> Result<(), StoreError>;

    async fn create_reminder(&self, reminder: NewReminder) -> Result<Reminder, StoreError>;
}
