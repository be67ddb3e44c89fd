//! SourceAggregator - 3 種類のリマインダー源を 1 つの形にまとめる
//!
//! # 読み取り対象
//! 1. 単独リマインダー（status = pending）
//! 2. 未完了タスク（旧形式の単一フィールド + 埋め込みリスト）
//! 3. 予定 / 確定済みミーティング（埋め込みリスト）
//!
//! 各ソースの読み取りは独立しており、1 つが失敗しても他は続行します
//! （失敗したソースは空リスト扱い + sourceErrors に記録）。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use tracing::{debug, warn};

use super::bounded::bounded;
use crate::domain::{
    ChannelPlan, ChannelRequirement, CheckedCounts, EmbeddedReminder, Meeting, MeetingStatus,
    Origin, Recipients, Reminder, ReminderOccurrence, ReminderStatus, SkippedItem, SourceError,
    Task, TaskStatus, TimeError, TimeResolver,
};
use crate::ports::{EntityStore, StoreError};

/// Everything one aggregation pass found.
#[derive(Debug, Default)]
pub struct Collection {
    pub occurrences: Vec<ReminderOccurrence>,
    pub checked: CheckedCounts,
    pub skipped: Vec<SkippedItem>,
    pub source_errors: Vec<SourceError>,
}

impl Collection {
    fn skip(&mut self, origin: &Origin, title: &str, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(key = %origin.key(), %reason, "skipping reminder");
        self.skipped.push(SkippedItem {
            id: origin.key(),
            kind: origin.kind(),
            title: title.to_string(),
            reason,
            due_at: None,
            minutes_until_due: None,
        });
    }
}

/// Owner-level context shared by every entry of one embedded list.
struct ListOwner<'a> {
    title: &'a str,
    client_name: Option<&'a String>,
    creator: Option<&'a String>,
    /// The owner's reference date (task due date / meeting date), if any.
    reference: Result<Option<DateTime<Utc>>, TimeError>,
}

pub struct SourceAggregator {
    store: Arc<dyn EntityStore>,
    resolver: TimeResolver,
    reference_time: NaiveTime,
    io_timeout: Duration,
}

impl SourceAggregator {
    pub fn new(
        store: Arc<dyn EntityStore>,
        resolver: TimeResolver,
        reference_time: NaiveTime,
        io_timeout: Duration,
    ) -> Self {
        Self {
            store,
            resolver,
            reference_time,
            io_timeout,
        }
    }

    pub async fn collect(&self, now: DateTime<Utc>) -> Collection {
        let (reminders, tasks, meetings) = tokio::join!(
            self.read(
                "reminders",
                self.store.list_reminders(ReminderStatus::Pending)
            ),
            self.read("tasks", self.store.list_tasks(TaskStatus::OPEN)),
            self.read("meetings", self.store.list_meetings(MeetingStatus::ACTIVE)),
        );

        let mut collection = Collection::default();
        let reminders = collection.settle_read("reminders", reminders);
        let tasks = collection.settle_read("tasks", tasks);
        let meetings = collection.settle_read("meetings", meetings);

        collection.checked = CheckedCounts {
            tasks: tasks.len(),
            meetings: meetings.len(),
            reminders: reminders.len(),
        };

        for reminder in &reminders {
            self.standalone(reminder, &mut collection);
        }
        for task in &tasks {
            self.task_legacy(task, &mut collection);
            self.task_list(task, now, &mut collection);
        }
        for meeting in &meetings {
            self.meeting_list(meeting, now, &mut collection);
        }

        debug!(
            candidates = collection.occurrences.len(),
            skipped = collection.skipped.len(),
            "sources aggregated"
        );
        collection
    }

    async fn read<T>(
        &self,
        source: &str,
        call: impl Future<Output = Result<Vec<T>, StoreError>>,
    ) -> Result<Vec<T>, StoreError> {
        bounded(&format!("list_{source}"), self.io_timeout, call).await
    }

    fn standalone(&self, reminder: &Reminder, collection: &mut Collection) {
        let origin = Origin::Standalone {
            reminder_id: reminder.id.clone(),
            recurrence: reminder.recurrence.clone(),
        };
        let due_at = match self.resolver.resolve(&reminder.reminder_date) {
            Ok(due_at) => due_at,
            Err(err) => {
                collection.skip(&origin, &reminder.title, format!("reminder_date: {err}"));
                return;
            }
        };

        // 単独リマインダーは送信済みフラグを持たない（status で管理）
        let channels = ChannelPlan {
            email: ChannelRequirement::new(reminder.notify_email, false),
            chat: ChannelRequirement::new(reminder.notify_whatsapp, false),
            sms: ChannelRequirement::new(reminder.notify_sms, false),
            popup: ChannelRequirement::new(reminder.notify_popup, false),
        };

        collection.occurrences.push(ReminderOccurrence {
            origin,
            due_at,
            label: reminder.title.clone(),
            client_name: reminder.client_name.clone(),
            message: reminder.description.clone(),
            channels,
            recipients: Recipients {
                email: reminder.email_recipients.clone(),
                chat: reminder.whatsapp_recipients.clone(),
                sms: reminder.sms_recipients.clone(),
                creator: reminder.created_by.clone(),
            },
            ringtone: reminder.ringtone.clone(),
        });
    }

    /// 旧形式: タスク直下の reminder_* フィールド
    ///
    /// ポップアップは無し。リモートチャネルが 1 つも無ければスキップ。
    fn task_legacy(&self, task: &Task, collection: &mut Collection) {
        let Some(raw) = non_blank(task.reminder_date.as_deref()) else {
            return;
        };
        if task.reminder_sent {
            return;
        }

        let origin = Origin::TaskLegacy {
            task_id: task.id.clone(),
        };
        let channels = ChannelPlan {
            email: ChannelRequirement::new(task.reminder_notify_email, false),
            chat: ChannelRequirement::new(task.reminder_notify_whatsapp, false),
            sms: ChannelRequirement::new(task.reminder_notify_sms, false),
            popup: ChannelRequirement::default(),
        };
        if !channels.any_remote_requested() {
            collection.skip(&origin, &task.title, "no remote channel requested");
            return;
        }

        let due_at = match self.resolver.resolve(raw) {
            Ok(due_at) => due_at,
            Err(err) => {
                collection.skip(&origin, &task.title, format!("reminder_date: {err}"));
                return;
            }
        };

        collection.occurrences.push(ReminderOccurrence {
            origin,
            due_at,
            label: task.title.clone(),
            client_name: task.client_name.clone(),
            message: None,
            channels,
            recipients: Recipients {
                email: task.reminder_recipients.clone(),
                chat: task.reminder_phones.clone(),
                sms: task.reminder_phones.clone(),
                creator: task.created_by.clone(),
            },
            ringtone: None,
        });
    }

    fn task_list(&self, task: &Task, now: DateTime<Utc>, collection: &mut Collection) {
        if task.reminders.is_empty() {
            return;
        }
        let owner = ListOwner {
            title: &task.title,
            client_name: task.client_name.as_ref(),
            creator: task.created_by.as_ref(),
            reference: self.reference(task.due_date.as_deref(), self.reference_time),
        };
        for (index, entry) in task.reminders.iter().enumerate() {
            let origin = Origin::TaskList {
                task_id: task.id.clone(),
                index,
            };
            self.list_entry(origin, &owner, entry, now, collection);
        }
    }

    fn meeting_list(&self, meeting: &Meeting, now: DateTime<Utc>, collection: &mut Collection) {
        if meeting.reminders.is_empty() {
            return;
        }
        let time_of_day = non_blank(meeting.start_time.as_deref())
            .and_then(parse_time_of_day)
            .unwrap_or(self.reference_time);
        let owner = ListOwner {
            title: &meeting.title,
            client_name: meeting.client_name.as_ref(),
            creator: meeting.created_by.as_ref(),
            reference: self.reference(meeting.meeting_date.as_deref(), time_of_day),
        };
        for (index, entry) in meeting.reminders.iter().enumerate() {
            let origin = Origin::MeetingList {
                meeting_id: meeting.id.clone(),
                index,
            };
            self.list_entry(origin, &owner, entry, now, collection);
        }
    }

    fn reference(
        &self,
        raw: Option<&str>,
        time_of_day: NaiveTime,
    ) -> Result<Option<DateTime<Utc>>, TimeError> {
        non_blank(raw)
            .map(|raw| self.resolver.resolve_with_default_time(raw, time_of_day))
            .transpose()
    }

    fn list_entry(
        &self,
        origin: Origin,
        owner: &ListOwner<'_>,
        entry: &EmbeddedReminder,
        now: DateTime<Utc>,
        collection: &mut Collection,
    ) {
        let channels = ChannelPlan {
            email: ChannelRequirement::new(entry.notify_email, entry.email_sent),
            chat: ChannelRequirement::new(entry.notify_whatsapp, entry.whatsapp_sent),
            sms: ChannelRequirement::new(entry.notify_sms, entry.sms_sent),
            popup: ChannelRequirement::new(entry.notify_popup, entry.popup_shown),
        };
        if !channels.any_requested() || channels.is_fully_resolved() {
            return;
        }
        if entry.sent && !channels.popup_outstanding() {
            return;
        }

        let due_at = match self.entry_due(entry, &owner.reference) {
            Ok(due_at) => due_at,
            Err(reason) => {
                collection.skip(&origin, owner.title, reason);
                return;
            }
        };

        // リモートは全部済み: ポップアップが残っていて期限を過ぎている時だけ拾う
        if !channels.any_remote_outstanding() && due_at > now {
            return;
        }

        collection.occurrences.push(ReminderOccurrence {
            origin,
            due_at,
            label: owner.title.to_string(),
            client_name: owner.client_name.cloned(),
            message: entry.message.clone(),
            channels,
            recipients: Recipients {
                email: entry.email_recipients.clone(),
                chat: entry.whatsapp_recipients.clone(),
                sms: entry.sms_recipients.clone(),
                creator: owner.creator.cloned(),
            },
            ringtone: entry.ringtone.clone(),
        });
    }

    /// Explicit time wins; otherwise the owner's reference date minus `minutes_before`.
    fn entry_due(
        &self,
        entry: &EmbeddedReminder,
        reference: &Result<Option<DateTime<Utc>>, TimeError>,
    ) -> Result<DateTime<Utc>, String> {
        if let Some(raw) = non_blank(entry.reminder_date.as_deref()) {
            return self
                .resolver
                .resolve(raw)
                .map_err(|err| format!("reminder_date: {err}"));
        }
        let reference = match reference {
            Ok(Some(reference)) => *reference,
            Ok(None) => return Err("no reminder time and no reference date".to_string()),
            Err(err) => return Err(format!("reference date: {err}")),
        };
        let before = entry.minutes_before.unwrap_or(0);
        TimeDelta::try_minutes(before)
            .and_then(|delta| reference.checked_sub_signed(delta))
            .ok_or_else(|| format!("minutes_before out of range: {before}"))
    }
}

impl Collection {
    fn settle_read<T>(&mut self, source: &str, read: Result<Vec<T>, StoreError>) -> Vec<T> {
        match read {
            Ok(items) => items,
            Err(err) => {
                warn!(source, error = %err, "reminder source unavailable, treating as empty");
                self.source_errors.push(SourceError {
                    source: source.to_string(),
                    error: err.to_string(),
                });
                Vec::new()
            }
        }
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}
