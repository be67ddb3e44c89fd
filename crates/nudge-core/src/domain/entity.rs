//! Persisted entity shapes, as exchanged with the hosted entity store.
//!
//! These mirror the store's records field by field (snake_case, lenient
//! defaults). Nothing downstream of the aggregator reads them directly; see
//! `domain::occurrence` for the uniform shape the engine reasons about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{MeetingId, MessageId, ReminderId, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    #[default]
    Pending,
    Sent,
    Dismissed,
}

/// A standalone reminder record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw timestamp string; may or may not carry a zone.
    pub reminder_date: String,
    #[serde(default)]
    pub status: ReminderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    #[serde(default)]
    pub notify_email: bool,
    #[serde(default)]
    pub notify_whatsapp: bool,
    #[serde(default)]
    pub notify_sms: bool,
    #[serde(default)]
    pub notify_popup: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email_recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub whatsapp_recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sms_recipients: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ringtone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<DateTime<Utc>>,
}

/// Field set of a reminder about to be created. Identity and timestamps are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReminder {
    pub title: String,
    pub description: Option<String>,
    pub reminder_date: String,
    pub status: ReminderStatus,
    pub client_name: Option<String>,
    pub created_by: Option<String>,
    pub notify_email: bool,
    pub notify_whatsapp: bool,
    pub notify_sms: bool,
    pub notify_popup: bool,
    pub email_recipients: Vec<String>,
    pub whatsapp_recipients: Vec<String>,
    pub sms_recipients: Vec<String>,
    pub ringtone: Option<String>,
    pub recurrence: Option<Recurrence>,
}

impl NewReminder {
    /// Copy every user-facing field of `source`, leaving identity behind.
    pub fn copied_from(source: &Reminder) -> Self {
        Self {
            title: source.title.clone(),
            description: source.description.clone(),
            reminder_date: source.reminder_date.clone(),
            status: ReminderStatus::Pending,
            client_name: source.client_name.clone(),
            created_by: source.created_by.clone(),
            notify_email: source.notify_email,
            notify_whatsapp: source.notify_whatsapp,
            notify_sms: source.notify_sms,
            notify_popup: source.notify_popup,
            email_recipients: source.email_recipients.clone(),
            whatsapp_recipients: source.whatsapp_recipients.clone(),
            sms_recipients: source.sms_recipients.clone(),
            ringtone: source.ringtone.clone(),
            recurrence: source.recurrence.clone(),
        }
    }

    pub fn into_reminder(
        self,
        id: ReminderId,
        now: DateTime<Utc>,
    ) -> Reminder {
        Reminder {
            id,
            title: self.title,
            description: self.description,
            reminder_date: self.reminder_date,
            status: self.status,
            client_name: self.client_name,
            created_by: self.created_by,
            notify_email: self.notify_email,
            notify_whatsapp: self.notify_whatsapp,
            notify_sms: self.notify_sms,
            notify_popup: self.notify_popup,
            email_recipients: self.email_recipients,
            whatsapp_recipients: self.whatsapp_recipients,
            sms_recipients: self.sms_recipients,
            ringtone: self.ringtone,
            recurrence: self.recurrence,
            created_date: Some(now),
            updated_date: Some(now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Regeneration rule of a standalone reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    #[serde(default)]
    pub enabled: bool,
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Raw date or timestamp. A date-only value covers that whole local day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

fn default_interval() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Waiting,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Every status except `completed`.
    pub const OPEN: &'static [TaskStatus] = &[
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Waiting,
        TaskStatus::Cancelled,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    /// Raw due date; often a calendar date with no time of day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    // Legacy single-reminder fields (deprecated shape).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_date: Option<String>,
    #[serde(default)]
    pub reminder_sent: bool,
    #[serde(default)]
    pub reminder_notify_email: bool,
    #[serde(default)]
    pub reminder_notify_whatsapp: bool,
    #[serde(default)]
    pub reminder_notify_sms: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reminder_recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reminder_phones: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reminders: Vec<EmbeddedReminder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    /// Meetings whose reminders are still live.
    pub const ACTIVE: &'static [MeetingStatus] = &[MeetingStatus::Scheduled, MeetingStatus::Confirmed];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub title: String,
    #[serde(default)]
    pub status: MeetingStatus,
    /// Raw meeting date; either a full timestamp or a calendar date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_date: Option<String>,
    /// `HH:MM`, combined with a date-only `meeting_date`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reminders: Vec<EmbeddedReminder>,
}

/// One entry of a task's or meeting's reminder list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedReminder {
    /// Explicit absolute time. Takes precedence over `minutes_before`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes_before: Option<i64>,

    #[serde(default)]
    pub notify_email: bool,
    #[serde(default)]
    pub notify_whatsapp: bool,
    #[serde(default)]
    pub notify_sms: bool,
    #[serde(default)]
    pub notify_popup: bool,

    #[serde(default)]
    pub email_sent: bool,
    #[serde(default)]
    pub whatsapp_sent: bool,
    #[serde(default)]
    pub sms_sent: bool,
    /// Set by the UI once the popup was displayed.
    #[serde(default)]
    pub popup_shown: bool,
    #[serde(default)]
    pub sent: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email_recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub whatsapp_recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sms_recipients: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ringtone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageChannel {
    Whatsapp,
    Sms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    #[default]
    Queued,
    Delivered,
    Failed,
}

/// An outbound chat/SMS record, picked up by an external delivery worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: MessageId,
    pub channel: MessageChannel,
    pub to: String,
    pub body: String,
    #[serde(default)]
    pub status: MessageStatus,
    /// Occurrence key the message was produced for.
    pub source: String,
    pub created_date: DateTime<Utc>,
}
