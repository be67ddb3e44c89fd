//! Outcome model: what happened to one occurrence on each channel, and the
//! per-item result line reported back to the caller.

use serde::{Deserialize, Serialize};

use super::occurrence::{Channel, SourceKind};

/// Result of one channel for one occurrence.
///
/// - idle: not requested, or already delivered on an earlier run
/// - unreachable: requested but no acceptable recipient exists
/// - attempted: at least one send was tried; `succeeded` if any recipient got it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelResult {
    pub attempted: bool,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delivered_to: Vec<String>,
    #[serde(skip)]
    unreachable: bool,
}

impl ChannelResult {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            error: Some("no valid recipients".to_string()),
            unreachable: true,
            ..Self::default()
        }
    }

    /// Popup payload handed to the caller.
    pub fn surfaced() -> Self {
        Self {
            attempted: true,
            succeeded: true,
            ..Self::default()
        }
    }

    /// Fold per-recipient attempts into one channel result.
    pub fn from_attempts<E: std::fmt::Display>(attempts: Vec<(String, Result<(), E>)>) -> Self {
        if attempts.is_empty() {
            return Self::unreachable();
        }
        let mut delivered_to = Vec::new();
        let mut failures = Vec::new();
        for (recipient, result) in attempts {
            match result {
                Ok(()) => delivered_to.push(recipient),
                Err(err) => failures.push(format!("{recipient}: {err}")),
            }
        }
        Self {
            attempted: true,
            succeeded: !delivered_to.is_empty(),
            error: (!failures.is_empty()).then(|| failures.join("; ")),
            delivered_to,
            unreachable: false,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        self.unreachable
    }

    /// Whether the channel's sent flag may be set after this run.
    ///
    /// Only a delivery settles a channel; an unreachable one stays outstanding.
    pub fn settles(&self) -> bool {
        self.succeeded
    }

    pub fn has_failed(&self) -> bool {
        self.attempted && !self.succeeded
    }
}

/// Per-channel results for one occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOutcome {
    pub email: ChannelResult,
    pub chat: ChannelResult,
    pub sms: ChannelResult,
    pub popup: ChannelResult,
}

impl ChannelOutcome {
    pub fn get(&self, channel: Channel) -> &ChannelResult {
        match channel {
            Channel::Email => &self.email,
            Channel::Chat => &self.chat,
            Channel::Sms => &self.sms,
            Channel::Popup => &self.popup,
        }
    }

    pub fn any_remote_attempted(&self) -> bool {
        Channel::REMOTE.iter().any(|c| self.get(*c).attempted)
    }

    pub fn any_remote_succeeded(&self) -> bool {
        Channel::REMOTE.iter().any(|c| self.get(*c).succeeded)
    }

    pub fn any_remote_failed(&self) -> bool {
        Channel::REMOTE.iter().any(|c| self.get(*c).has_failed())
    }

    /// Everyone who received something on a remote channel.
    pub fn delivered_to(&self) -> Vec<String> {
        Channel::REMOTE
            .iter()
            .flat_map(|c| self.get(*c).delivered_to.iter().cloned())
            .collect()
    }

    /// `"email: a@x: timeout; chat: ..."` or `None` when nothing failed.
    pub fn error_summary(&self) -> Option<String> {
        let parts: Vec<String> = Channel::REMOTE
            .iter()
            .filter_map(|c| {
                let result = self.get(*c);
                if result.is_unreachable() {
                    return None;
                }
                result.error.as_ref().map(|e| format!("{c}: {e}"))
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join(" | "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Sent,
    Failed,
    Skipped,
}

/// One line of the run's `results` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<ChannelOutcome>,
}

impl ItemOutcome {
    pub fn skipped(id: String, kind: SourceKind, reason: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            status: ItemStatus::Skipped,
            recipients: Vec::new(),
            error: None,
            reason: Some(reason.into()),
            channels: None,
        }
    }

    pub fn failed(id: String, kind: SourceKind, error: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            status: ItemStatus::Failed,
            recipients: Vec::new(),
            error: Some(error.into()),
            reason: None,
            channels: None,
        }
    }
}

/// In-app popup handed back to the caller; not persisted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupPayload {
    pub id: String,
    #[serde(rename = "entityId")]
    pub entity_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub client_name: Option<String>,
    pub message: String,
    pub ringtone: String,
    #[serde(rename = "reminderIndex")]
    pub reminder_index: Option<usize>,
}
