//! InMemoryEntityStore - 開発用・テスト用のエンティティストア
//!
//! # 学習ポイント
//! - tokio::sync::Mutex による排他制御（ロック跨ぎ await しない）
//! - JSON スナップショットからの復元と書き出し
//! - 障害注入（Faults）で部分失敗のテストを書く
//!
//! チャット / SMS の送信レコードもストア上のエンティティなので、
//! このストアが MessageOutbox も実装します。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::{
    Meeting, MeetingId, MeetingStatus, NewReminder, OutboundMessage, MessageStatus, Reminder,
    ReminderId, ReminderStatus, Task, TaskId, TaskStatus,
};
use crate::ports::{
    ChannelError, Clock, EntityStore, IdGenerator, MeetingPatch, MessageOutbox,
    NewOutboundMessage, ReminderPatch, StoreError, TaskPatch, UlidGenerator,
};

/// Whole-store contents, as read from and written to a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub messages: Vec<OutboundMessage>,
}

/// Injected failures, for exercising partial-failure paths.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub fail_list_reminders: bool,
    pub fail_list_tasks: bool,
    pub fail_list_meetings: bool,
    pub fail_updates: bool,
    pub fail_creates: bool,
    pub fail_enqueue_to: Vec<String>,
    /// Added before every call; pair with a short engine timeout.
    pub latency: Option<Duration>,
}

struct StoreState {
    snapshot: Snapshot,
    faults: Faults,
}

pub struct InMemoryEntityStore {
    state: Arc<Mutex<StoreState>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryEntityStore {
    pub fn new(snapshot: Snapshot, clock: Arc<dyn Clock>) -> Self {
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        Self {
            state: Arc::new(Mutex::new(StoreState {
                snapshot,
                faults: Faults::default(),
            })),
            clock,
            ids,
        }
    }

    pub async fn inject(&self, faults: Faults) {
        self.state.lock().await.faults = faults;
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.snapshot.clone()
    }

    /// Apply an out-of-band edit, as a concurrent UI user would.
    pub async fn edit<F: FnOnce(&mut Snapshot)>(&self, f: F) {
        f(&mut self.state.lock().await.snapshot);
    }

    async fn latency(&self) {
        let latency = self.state.lock().await.faults.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn check_update(&self) -> Result<(), StoreError> {
        self.latency().await;
        if self.state.lock().await.faults.fail_updates {
            return Err(StoreError::Backend("injected update failure".to_string()));
        }
        Ok(())
    }
}

fn not_found(entity: impl ToString) -> StoreError {
    StoreError::NotFound {
        entity: entity.to_string(),
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn list_reminders(&self, status: ReminderStatus) -> Result<Vec<Reminder>, StoreError> {
        self.latency().await;
        let state = self.state.lock().await;
        if state.faults.fail_list_reminders {
            return Err(StoreError::Backend("injected reminder read failure".to_string()));
        }
        Ok(state
            .snapshot
            .reminders
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }

    async fn list_tasks(&self, statuses: &[TaskStatus]) -> Result<Vec<Task>, StoreError> {
        self.latency().await;
        let state = self.state.lock().await;
        if state.faults.fail_list_tasks {
            return Err(StoreError::Backend("injected task read failure".to_string()));
        }
        Ok(state
            .snapshot
            .tasks
            .iter()
            .filter(|t| statuses.contains(&t.status))
            .cloned()
            .collect())
    }

    async fn list_meetings(&self, statuses: &[MeetingStatus]) -> Result<Vec<Meeting>, StoreError> {
        self.latency().await;
        let state = self.state.lock().await;
        if state.faults.fail_list_meetings {
            return Err(StoreError::Backend("injected meeting read failure".to_string()));
        }
        Ok(state
            .snapshot
            .meetings
            .iter()
            .filter(|m| statuses.contains(&m.status))
            .cloned()
            .collect())
    }

    async fn get_reminder(&self, id: ReminderId) -> Result<Reminder, StoreError> {
        self.latency().await;
        let state = self.state.lock().await;
        state
            .snapshot
            .reminders
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn get_task(&self, id: TaskId) -> Result<Task, StoreError> {
        self.latency().await;
        let state = self.state.lock().await;
        state
            .snapshot
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn get_meeting(&self, id: MeetingId) -> Result<Meeting, StoreError> {
        self.latency().await;
        let state = self.state.lock().await;
        state
            .snapshot
            .meetings
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn update_reminder(&self, id: ReminderId, patch: ReminderPatch) -> Result<(), StoreError> {
        self.check_update().await?;
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let reminder = state
            .snapshot
            .reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(id))?;
        if let Some(status) = patch.status {
            reminder.status = status;
        }
        reminder.updated_date = Some(now);
        Ok(())
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<(), StoreError> {
        self.check_update().await?;
        let mut state = self.state.lock().await;
        let task = state
            .snapshot
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found(id))?;
        if let Some(sent) = patch.reminder_sent {
            task.reminder_sent = sent;
        }
        if let Some(reminders) = patch.reminders {
            task.reminders = reminders;
        }
        Ok(())
    }

    async fn update_meeting(&self, id: MeetingId, patch: MeetingPatch) -> Result<(), StoreError> {
        self.check_update().await?;
        let mut state = self.state.lock().await;
        let meeting = state
            .snapshot
            .meetings
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| not_found(id))?;
        if let Some(reminders) = patch.reminders {
            meeting.reminders = reminders;
        }
        Ok(())
    }

    async fn create_reminder(&self, reminder: NewReminder) -> Result<Reminder, StoreError> {
        self.check_update().await?;
        if self.state.lock().await.faults.fail_creates {
            return Err(StoreError::Backend("injected create failure".to_string()));
        }
        let created = reminder.into_reminder(self.ids.generate_reminder_id(), self.clock.now());
        self.state.lock().await.snapshot.reminders.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl MessageOutbox for InMemoryEntityStore {
    async fn enqueue(&self, message: NewOutboundMessage) -> Result<OutboundMessage, ChannelError> {
        self.latency().await;
        let mut state = self.state.lock().await;
        if state.faults.fail_enqueue_to.contains(&message.to) {
            return Err(ChannelError::Transport(format!(
                "injected enqueue failure for {}",
                message.to
            )));
        }
        let record = OutboundMessage {
            id: self.ids.generate_message_id(),
            channel: message.channel,
            to: message.to,
            body: message.body,
            status: MessageStatus::Queued,
            source: message.source,
            created_date: self.clock.now(),
        };
        state.snapshot.messages.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EmbeddedReminder, MessageChannel};
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    fn store(snapshot: Snapshot) -> InMemoryEntityStore {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap());
        InMemoryEntityStore::new(snapshot, Arc::new(clock))
    }

    fn task(status: TaskStatus) -> Task {
        serde_json::from_value(serde_json::json!({
            "id": Ulid::new().to_string(),
            "title": "Call back",
            "status": status,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn lists_filter_by_status() {
        let open = task(TaskStatus::Todo);
        let done = task(TaskStatus::Completed);
        let store = store(Snapshot {
            tasks: vec![open.clone(), done],
            ..Default::default()
        });

        let listed = store.list_tasks(TaskStatus::OPEN).await.unwrap();
        assert_eq!(listed, vec![open]);
    }

    #[tokio::test]
    async fn task_patch_replaces_the_whole_list() {
        let t = task(TaskStatus::Todo);
        let id = t.id.clone();
        let store = store(Snapshot {
            tasks: vec![t],
            ..Default::default()
        });

        let entry = EmbeddedReminder {
            minutes_before: Some(10),
            email_sent: true,
            ..Default::default()
        };
        store
            .update_task(
                id.clone(),
                TaskPatch {
                    reminders: Some(vec![entry.clone()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let after = store.get_task(id).await.unwrap();
        assert_eq!(after.reminders, vec![entry]);
        assert!(!after.reminder_sent);
    }

    #[tokio::test]
    async fn missing_entity_is_not_found() {
        let store = store(Snapshot::default());
        let err = store
            .get_meeting(MeetingId::new(Ulid::new().to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn injected_faults_surface_as_errors() {
        let store = store(Snapshot::default());
        store
            .inject(Faults {
                fail_list_meetings: true,
                fail_enqueue_to: vec!["+15550100".to_string()],
                ..Default::default()
            })
            .await;

        assert!(store.list_meetings(MeetingStatus::ACTIVE).await.is_err());
        assert!(store.list_reminders(ReminderStatus::Pending).await.is_ok());

        let err = store
            .enqueue(NewOutboundMessage {
                channel: MessageChannel::Sms,
                to: "+15550100".to_string(),
                body: "hi".to_string(),
                source: "x".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Transport(_)));
    }

    #[tokio::test]
    async fn enqueue_records_a_queued_message() {
        let store = store(Snapshot::default());
        let record = store
            .enqueue(NewOutboundMessage {
                channel: MessageChannel::Whatsapp,
                to: "+15550101".to_string(),
                body: "hi".to_string(),
                source: "abc_0".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(record.status, MessageStatus::Queued);
        assert_eq!(store.snapshot().await.messages, vec![record]);
    }
}
