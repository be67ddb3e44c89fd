//! DueEvaluator - 期限到来の判定（I/O なし）

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::{ReminderOccurrence, SkippedItem};

#[derive(Debug, Default)]
pub struct Partition {
    /// Due occurrences, oldest first.
    pub due: Vec<ReminderOccurrence>,
    /// Not yet due but inside the lookahead window; diagnostics only.
    pub upcoming: Vec<SkippedItem>,
}

#[derive(Debug, Clone, Copy)]
pub struct DueEvaluator {
    lookahead: TimeDelta,
}

impl DueEvaluator {
    pub fn new(lookahead: TimeDelta) -> Self {
        Self { lookahead }
    }

    /// Due iff `due_at <= now`.
    pub fn partition(&self, occurrences: Vec<ReminderOccurrence>, now: DateTime<Utc>) -> Partition {
        let horizon = now.checked_add_signed(self.lookahead).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut partition = Partition::default();

        for occurrence in occurrences {
            if occurrence.is_due(now) {
                partition.due.push(occurrence);
            } else if occurrence.due_at <= horizon {
                partition.upcoming.push(SkippedItem {
                    id: occurrence.key(),
                    kind: occurrence.origin.kind(),
                    title: occurrence.label.clone(),
                    reason: "not yet due".to_string(),
                    due_at: Some(occurrence.due_at),
                    minutes_until_due: Some((occurrence.due_at - now).num_minutes()),
                });
            }
        }

        partition.due.sort_by_key(|o| o.due_at);
        partition.upcoming.sort_by_key(|s| s.due_at);
        partition
    }
}
