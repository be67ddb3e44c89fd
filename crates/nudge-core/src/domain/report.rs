//! Run report: the single value a run hands back to its caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::occurrence::SourceKind;
use super::outcome::{ItemOutcome, PopupPayload};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckedCounts {
    pub tasks: usize,
    pub meetings: usize,
    pub reminders: usize,
}

/// An occurrence looked at but not processed this run (diagnostic only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub title: String,
    pub reason: String,
    #[serde(rename = "dueAt", default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(rename = "minutesUntilDue", default, skip_serializing_if = "Option::is_none")]
    pub minutes_until_due: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub source: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    #[serde(rename = "serverTime")]
    pub server_time: DateTime<Utc>,
    pub checked: CheckedCounts,
    pub skipped: Vec<SkippedItem>,
    #[serde(rename = "sourceErrors", default, skip_serializing_if = "Vec::is_empty")]
    pub source_errors: Vec<SourceError>,
    #[serde(rename = "foundDue")]
    pub found_due: usize,
    pub summary: String,
}

/// Response body of a completed run (possibly with per-item failures).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(rename = "debugInfo")]
    pub debug_info: DebugInfo,
    pub success: bool,
    pub processed: usize,
    pub results: Vec<ItemOutcome>,
    pub popups: Vec<PopupPayload>,
}

/// Response body of a run that could not complete at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub success: bool,
    pub error: String,
}

impl ErrorReport {
    pub fn new(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: error.to_string(),
        }
    }
}
