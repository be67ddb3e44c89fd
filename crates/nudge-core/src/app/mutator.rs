//! StateMutator - 送信結果をストアに書き戻す
//!
//! # 書き戻しの規則
//! - 単独リマインダー: status → sent、繰り返しなら次回分を新規作成
//! - 旧形式タスクリマインダー: reminder_sent = true
//! - 埋め込みリスト: 所有エンティティを読み直し、成功したチャネルの *_sent を立てて
//!   リスト全体を 1 フィールドとして書き戻す
//!
//! `sent` はリモートチャネルが全部片付き、かつポップアップが残っていない時だけ立てます。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use super::bounded::bounded;
use crate::domain::{
    ChannelOutcome, EmbeddedReminder, MeetingId, NewReminder, NextOccurrence,
    NudgeError, Origin, Recurrence, ReminderId, ReminderOccurrence, ReminderStatus, TaskId,
    TimeResolver,
};
use crate::ports::{EntityStore, MeetingPatch, ReminderPatch, StoreError, TaskPatch};

/// What a commit wrote.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Commit {
    /// The occurrence needs nothing more on any channel.
    pub resolved: bool,
    /// Pending successor created for a recurring reminder.
    pub successor: Option<ReminderId>,
}

pub struct StateMutator {
    store: Arc<dyn EntityStore>,
    resolver: TimeResolver,
    io_timeout: Duration,
}

impl StateMutator {
    pub fn new(store: Arc<dyn EntityStore>, resolver: TimeResolver, io_timeout: Duration) -> Self {
        Self {
            store,
            resolver,
            io_timeout,
        }
    }

    pub async fn commit(
        &self,
        occurrence: &ReminderOccurrence,
        outcome: &ChannelOutcome,
    ) -> Result<Commit, NudgeError> {
        match &occurrence.origin {
            Origin::Standalone {
                reminder_id,
                recurrence,
            } => {
                self.commit_standalone(reminder_id, recurrence.as_ref(), occurrence)
                    .await
            }
            Origin::TaskLegacy { task_id } => self.commit_legacy(task_id, occurrence, outcome).await,
            Origin::TaskList { task_id, index } => {
                self.commit_task_entry(task_id, *index, occurrence, outcome)
                    .await
            }
            Origin::MeetingList { meeting_id, index } => {
                self.commit_meeting_entry(meeting_id, *index, occurrence, outcome)
                    .await
            }
        }
    }

    async fn commit_standalone(
        &self,
        id: &ReminderId,
        recurrence: Option<&Recurrence>,
        occurrence: &ReminderOccurrence,
    ) -> Result<Commit, NudgeError> {
        bounded(
            "update_reminder",
            self.io_timeout,
            self.store.update_reminder(
                id.clone(),
                ReminderPatch {
                    status: Some(ReminderStatus::Sent),
                },
            ),
        )
        .await?;

        let next = match recurrence {
            Some(recurrence) => recurrence.next_after(occurrence.due_at, &self.resolver),
            None => NextOccurrence::NotRecurring,
        };
        let successor = match next {
            NextOccurrence::At(next) => {
                let created = self.create_successor(id, next).await.map_err(|source| {
                    error!(reminder = %id, next = %next, error = %source, "next occurrence not created");
                    NudgeError::SuccessorNotCreated {
                        reminder: id.as_str().to_string(),
                        source,
                    }
                })?;
                info!(reminder = %id, successor = %created, next = %next, "recurring reminder scheduled");
                Some(created)
            }
            NextOccurrence::PastEnd => {
                info!(reminder = %id, "recurrence ended");
                None
            }
            NextOccurrence::NotRecurring => None,
        };

        Ok(Commit {
            resolved: true,
            successor,
        })
    }

    async fn create_successor(
        &self,
        id: &ReminderId,
        next: DateTime<Utc>,
    ) -> Result<ReminderId, StoreError> {
        let source = bounded("get_reminder", self.io_timeout, self.store.get_reminder(id.clone())).await?;
        let mut draft = NewReminder::copied_from(&source);
        draft.reminder_date = next.to_rfc3339();
        let created = bounded(
            "create_reminder",
            self.io_timeout,
            self.store.create_reminder(draft),
        )
        .await?;
        Ok(created.id)
    }

    async fn commit_legacy(
        &self,
        id: &TaskId,
        occurrence: &ReminderOccurrence,
        outcome: &ChannelOutcome,
    ) -> Result<Commit, NudgeError> {
        if !outcome.any_remote_attempted() {
            debug!(key = %occurrence.key(), "no send attempted, legacy reminder left pending");
            return Ok(Commit::default());
        }

        bounded(
            "update_task",
            self.io_timeout,
            self.store.update_task(
                id.clone(),
                TaskPatch {
                    reminder_sent: Some(true),
                    reminders: None,
                },
            ),
        )
        .await?;
        Ok(Commit {
            resolved: true,
            successor: None,
        })
    }

    async fn commit_task_entry(
        &self,
        id: &TaskId,
        index: usize,
        occurrence: &ReminderOccurrence,
        outcome: &ChannelOutcome,
    ) -> Result<Commit, NudgeError> {
        let task = bounded("get_task", self.io_timeout, self.store.get_task(id.clone())).await?;
        let mut reminders = task.reminders;
        let (changed, resolved) = apply_to_list(&mut reminders, index, occurrence, outcome)?;
        if changed {
            bounded(
                "update_task",
                self.io_timeout,
                self.store.update_task(
                    id.clone(),
                    TaskPatch {
                        reminder_sent: None,
                        reminders: Some(reminders),
                    },
                ),
            )
            .await?;
        }
        Ok(Commit {
            resolved,
            successor: None,
        })
    }

    async fn commit_meeting_entry(
        &self,
        id: &MeetingId,
        index: usize,
        occurrence: &ReminderOccurrence,
        outcome: &ChannelOutcome,
    ) -> Result<Commit, NudgeError> {
        let meeting = bounded("get_meeting", self.io_timeout, self.store.get_meeting(id.clone())).await?;
        let mut reminders = meeting.reminders;
        let (changed, resolved) = apply_to_list(&mut reminders, index, occurrence, outcome)?;
        if changed {
            bounded(
                "update_meeting",
                self.io_timeout,
                self.store.update_meeting(
                    id.clone(),
                    MeetingPatch {
                        reminders: Some(reminders),
                    },
                ),
            )
            .await?;
        }
        Ok(Commit {
            resolved,
            successor: None,
        })
    }
}

/// Apply `outcome` to the freshly read entry at `index`.
/// Returns `(changed, resolved)`.
fn apply_to_list(
    reminders: &mut [EmbeddedReminder],
    index: usize,
    occurrence: &ReminderOccurrence,
    outcome: &ChannelOutcome,
) -> Result<(bool, bool), NudgeError> {
    let entry = reminders
        .get_mut(index)
        .ok_or_else(|| NudgeError::StaleOccurrence {
            key: occurrence.key(),
        })?;
    let changed = apply_outcome(entry, outcome);
    debug!(key = %occurrence.key(), changed, sent = entry.sent, "entry updated");
    Ok((changed, entry.sent))
}

/// Set the sent flag of every requested channel this run settled, then `sent`
/// if nothing is left outstanding. Returns whether anything changed.
pub fn apply_outcome(entry: &mut EmbeddedReminder, outcome: &ChannelOutcome) -> bool {
    let before = entry.clone();

    if entry.notify_email && outcome.email.settles() {
        entry.email_sent = true;
    }
    if entry.notify_whatsapp && outcome.chat.settles() {
        entry.whatsapp_sent = true;
    }
    if entry.notify_sms && outcome.sms.settles() {
        entry.sms_sent = true;
    }

    let remote_done = (!entry.notify_email || entry.email_sent)
        && (!entry.notify_whatsapp || entry.whatsapp_sent)
        && (!entry.notify_sms || entry.sms_sent);
    let popup_done = !entry.notify_popup || entry.popup_shown;
    if remote_done && popup_done {
        entry.sent = true;
    }

    *entry != before
}
