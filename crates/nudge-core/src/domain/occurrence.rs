//! ReminderOccurrence: the uniform shape every reminder source is folded into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::Recurrence;
use super::ids::{EntityRef, MeetingId, ReminderId, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Standalone,
    TaskLegacy,
    TaskList,
    MeetingList,
}

/// Where an occurrence came from, and therefore where its state is written back.
///
/// The index only exists on list variants and the recurrence only on the
/// standalone variant, so the invalid combinations are unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Standalone {
        reminder_id: ReminderId,
        recurrence: Option<Recurrence>,
    },
    TaskLegacy {
        task_id: TaskId,
    },
    TaskList {
        task_id: TaskId,
        index: usize,
    },
    MeetingList {
        meeting_id: MeetingId,
        index: usize,
    },
}

impl Origin {
    pub fn kind(&self) -> SourceKind {
        match self {
            Origin::Standalone { .. } => SourceKind::Standalone,
            Origin::TaskLegacy { .. } => SourceKind::TaskLegacy,
            Origin::TaskList { .. } => SourceKind::TaskList,
            Origin::MeetingList { .. } => SourceKind::MeetingList,
        }
    }

    pub fn owner(&self) -> EntityRef {
        match self {
            Origin::Standalone { reminder_id, .. } => EntityRef::Reminder(reminder_id.clone()),
            Origin::TaskLegacy { task_id } | Origin::TaskList { task_id, .. } => {
                EntityRef::Task(task_id.clone())
            }
            Origin::MeetingList { meeting_id, .. } => EntityRef::Meeting(meeting_id.clone()),
        }
    }

    /// Position within the owner's embedded list, valid for this run only.
    pub fn index(&self) -> Option<usize> {
        match self {
            Origin::TaskList { index, .. } | Origin::MeetingList { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn recurrence(&self) -> Option<&Recurrence> {
        match self {
            Origin::Standalone { recurrence, .. } => recurrence.as_ref(),
            _ => None,
        }
    }

    /// Stable key for reporting: the owner's id, suffixed with the list index.
    pub fn key(&self) -> String {
        let owner = self.owner();
        let owner = owner.raw_id();
        match self {
            Origin::TaskLegacy { .. } => format!("{owner}_legacy"),
            _ => match self.index() {
                Some(index) => format!("{owner}_{index}"),
                None => owner.to_string(),
            },
        }
    }

    /// Popup `type` as the UI knows it.
    pub fn popup_type(&self) -> &'static str {
        match self.kind() {
            SourceKind::Standalone => "reminder",
            SourceKind::TaskLegacy | SourceKind::TaskList => "task",
            SourceKind::MeetingList => "meeting",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(index) => write!(f, "{}#{}", self.owner(), index),
            None => write!(f, "{}", self.owner()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    /// WhatsApp-style chat message queue.
    Chat,
    Sms,
    Popup,
}

impl Channel {
    pub const REMOTE: [Channel; 3] = [Channel::Email, Channel::Chat, Channel::Sms];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Channel::Email => "email",
            Channel::Chat => "chat",
            Channel::Sms => "sms",
            Channel::Popup => "popup",
        };
        f.write_str(s)
    }
}

/// `(requested, already_sent)` for one channel. For the popup channel
/// `already_sent` means "already shown".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRequirement {
    pub requested: bool,
    pub already_sent: bool,
}

impl ChannelRequirement {
    pub fn new(requested: bool, already_sent: bool) -> Self {
        Self {
            requested,
            already_sent,
        }
    }

    /// Requested and not yet delivered.
    pub fn is_outstanding(self) -> bool {
        self.requested && !self.already_sent
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPlan {
    pub email: ChannelRequirement,
    pub chat: ChannelRequirement,
    pub sms: ChannelRequirement,
    pub popup: ChannelRequirement,
}

impl ChannelPlan {
    pub fn get(&self, channel: Channel) -> ChannelRequirement {
        match channel {
            Channel::Email => self.email,
            Channel::Chat => self.chat,
            Channel::Sms => self.sms,
            Channel::Popup => self.popup,
        }
    }

    pub fn any_requested(&self) -> bool {
        self.email.requested || self.chat.requested || self.sms.requested || self.popup.requested
    }

    pub fn any_remote_requested(&self) -> bool {
        Channel::REMOTE.iter().any(|c| self.get(*c).requested)
    }

    pub fn any_remote_outstanding(&self) -> bool {
        Channel::REMOTE.iter().any(|c| self.get(*c).is_outstanding())
    }

    pub fn popup_outstanding(&self) -> bool {
        self.popup.is_outstanding()
    }

    /// Every requested channel delivered, or only an already-shown popup left.
    pub fn is_fully_resolved(&self) -> bool {
        !self.any_remote_outstanding() && !self.popup_outstanding()
    }
}

/// Explicit recipients per remote channel, as stored (not yet validated).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipients {
    pub email: Vec<String>,
    pub chat: Vec<String>,
    pub sms: Vec<String>,
    /// Owner's creator; the email fallback when `email` is empty.
    pub creator: Option<String>,
}

/// One due-or-pending reminder instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderOccurrence {
    pub origin: Origin,
    pub due_at: DateTime<Utc>,
    /// Human-readable subject (the owner's title).
    pub label: String,
    pub client_name: Option<String>,
    pub message: Option<String>,
    pub channels: ChannelPlan,
    pub recipients: Recipients,
    pub ringtone: Option<String>,
}

impl ReminderOccurrence {
    pub fn key(&self) -> String {
        self.origin.key()
    }

    pub fn owner(&self) -> EntityRef {
        self.origin.owner()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}
