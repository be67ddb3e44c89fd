//! RunReporter - 1 回の実行結果（診断情報 + 項目ごとの結果 + ポップアップ）を組み立てる

use chrono::{DateTime, Utc};
use tracing::info;

use super::dispatcher::Dispatch;
use super::mutator::Commit;
use crate::domain::{
    CheckedCounts, DebugInfo, ItemOutcome, ItemStatus, NudgeError, PopupPayload,
    ReminderOccurrence, RunReport, SkippedItem, SourceError,
};

pub struct RunReporter {
    server_time: DateTime<Utc>,
    checked: CheckedCounts,
    skipped: Vec<SkippedItem>,
    source_errors: Vec<SourceError>,
    found_due: usize,
    results: Vec<ItemOutcome>,
    popups: Vec<PopupPayload>,
}

impl RunReporter {
    pub fn new(server_time: DateTime<Utc>) -> Self {
        Self {
            server_time,
            checked: CheckedCounts::default(),
            skipped: Vec::new(),
            source_errors: Vec::new(),
            found_due: 0,
            results: Vec::new(),
            popups: Vec::new(),
        }
    }

    pub fn sources(
        &mut self,
        checked: CheckedCounts,
        skipped: Vec<SkippedItem>,
        source_errors: Vec<SourceError>,
    ) {
        self.checked = checked;
        self.skipped.extend(skipped);
        self.source_errors = source_errors;
    }

    pub fn upcoming(&mut self, upcoming: Vec<SkippedItem>) {
        self.skipped.extend(upcoming);
    }

    pub fn found_due(&mut self, count: usize) {
        self.found_due = count;
    }

    pub fn record(&mut self, item: ItemOutcome, popup: Option<PopupPayload>) {
        self.results.push(item);
        self.popups.extend(popup);
    }

    pub fn finish(self) -> RunReport {
        let summary = summary(self.found_due, &self.results, self.popups.len());
        info!(
            %summary,
            sources_failed = self.source_errors.len(),
            "reminder run finished"
        );

        RunReport {
            debug_info: DebugInfo {
                server_time: self.server_time,
                checked: self.checked,
                skipped: self.skipped,
                source_errors: self.source_errors,
                found_due: self.found_due,
                summary,
            },
            success: true,
            processed: self.results.len(),
            results: self.results,
            popups: self.popups,
        }
    }
}

/// `"N due, S sent, F failed, K skipped, P popups"`
pub fn summary(found_due: usize, results: &[ItemOutcome], popups: usize) -> String {
    let count = |status: ItemStatus| results.iter().filter(|r| r.status == status).count();
    format!(
        "{found_due} due, {} sent, {} failed, {} skipped, {popups} popups",
        count(ItemStatus::Sent),
        count(ItemStatus::Failed),
        count(ItemStatus::Skipped),
    )
}

/// Classify one processed occurrence.
///
/// - sent: something reached someone (a remote recipient or a popup)
/// - failed: the commit failed, or every attempt failed
/// - skipped: nothing could be attempted
pub fn item_outcome(
    occurrence: &ReminderOccurrence,
    dispatch: &Dispatch,
    commit: &Result<Commit, NudgeError>,
) -> ItemOutcome {
    let outcome = &dispatch.outcome;
    let id = occurrence.key();
    let kind = occurrence.origin.kind();

    let mut item = if let Err(err) = commit {
        ItemOutcome::failed(id, kind, format!("commit failed: {err}"))
    } else if outcome.any_remote_succeeded() || outcome.popup.succeeded {
        ItemOutcome {
            id,
            kind,
            status: ItemStatus::Sent,
            recipients: Vec::new(),
            error: outcome.error_summary(),
            reason: None,
            channels: None,
        }
    } else if outcome.any_remote_failed() {
        let error = outcome
            .error_summary()
            .unwrap_or_else(|| "all deliveries failed".to_string());
        ItemOutcome::failed(id, kind, error)
    } else if occurrence.channels.any_remote_outstanding() {
        ItemOutcome::skipped(id, kind, "no valid recipients")
    } else {
        ItemOutcome::skipped(id, kind, "no channels requested")
    };

    item.recipients = outcome.delivered_to();
    item.channels = Some(outcome.clone());
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fixtures::utc;
    use crate::domain::{
        ChannelOutcome, ChannelPlan, ChannelRequirement, ChannelResult, Origin, Recipients,
        ReminderId, SourceKind, TaskId,
    };
    use crate::ports::StoreError;
    use ulid::Ulid;

    fn occurrence(channels: ChannelPlan) -> ReminderOccurrence {
        ReminderOccurrence {
            origin: Origin::TaskList {
                task_id: TaskId::new(Ulid::new().to_string()),
                index: 0,
            },
            due_at: utc(2024, 3, 10, 7, 0),
            label: "Send quote".to_string(),
            client_name: None,
            message: None,
            channels,
            recipients: Recipients::default(),
            ringtone: None,
        }
    }

    fn dispatch(outcome: ChannelOutcome) -> Dispatch {
        Dispatch {
            outcome,
            popup: None,
        }
    }

    fn email_plan() -> ChannelPlan {
        ChannelPlan {
            email: ChannelRequirement::new(true, false),
            ..Default::default()
        }
    }

    #[test]
    fn partial_success_is_sent_with_error_detail() {
        let outcome = ChannelOutcome {
            email: ChannelResult::from_attempts(vec![
                ("a@example.com".to_string(), Ok(())),
                ("b@example.com".to_string(), Err("bounced".to_string())),
            ]),
            ..Default::default()
        };
        let item = item_outcome(&occurrence(email_plan()), &dispatch(outcome), &Ok(Commit::default()));

        assert_eq!(item.status, ItemStatus::Sent);
        assert_eq!(item.recipients, vec!["a@example.com".to_string()]);
        assert!(item.error.unwrap().contains("bounced"));
    }

    #[test]
    fn all_failed_is_failed() {
        let outcome = ChannelOutcome {
            email: ChannelResult::from_attempts(vec![(
                "a@example.com".to_string(),
                Err("timeout".to_string()),
            )]),
            ..Default::default()
        };
        let item = item_outcome(&occurrence(email_plan()), &dispatch(outcome), &Ok(Commit::default()));
        assert_eq!(item.status, ItemStatus::Failed);
        assert_eq!(item.error.as_deref(), Some("email: a@example.com: timeout"));
    }

    #[test]
    fn unreachable_is_skipped() {
        let outcome = ChannelOutcome {
            email: ChannelResult::unreachable(),
            ..Default::default()
        };
        let item = item_outcome(&occurrence(email_plan()), &dispatch(outcome), &Ok(Commit::default()));
        assert_eq!(item.status, ItemStatus::Skipped);
        assert_eq!(item.reason.as_deref(), Some("no valid recipients"));
    }

    #[test]
    fn commit_failure_wins_over_delivery() {
        let outcome = ChannelOutcome {
            email: ChannelResult::from_attempts::<String>(vec![("a@example.com".to_string(), Ok(()))]),
            ..Default::default()
        };
        let commit = Err(NudgeError::Store(StoreError::Backend("down".to_string())));
        let item = item_outcome(&occurrence(email_plan()), &dispatch(outcome), &commit);

        assert_eq!(item.status, ItemStatus::Failed);
        assert!(item.error.unwrap().starts_with("commit failed"));
        // delivery still reported, so nobody mistakes it for unsent
        assert_eq!(item.recipients, vec!["a@example.com".to_string()]);
    }

    #[test]
    fn report_counts_and_summary() {
        let mut reporter = RunReporter::new(utc(2024, 3, 10, 12, 0));
        reporter.sources(
            CheckedCounts {
                tasks: 2,
                meetings: 1,
                reminders: 3,
            },
            Vec::new(),
            Vec::new(),
        );
        reporter.found_due(3);
        let id = ReminderId::new(Ulid::new().to_string()).to_string();
        reporter.record(ItemOutcome::skipped(id.clone(), SourceKind::Standalone, "x"), None);
        reporter.record(ItemOutcome::failed(id.clone(), SourceKind::Standalone, "y"), None);
        reporter.record(
            ItemOutcome {
                status: ItemStatus::Sent,
                ..ItemOutcome::skipped(id.clone(), SourceKind::Standalone, "")
            },
            Some(PopupPayload {
                id: id.clone(),
                entity_id: id,
                kind: "reminder".to_string(),
                title: "t".to_string(),
                client_name: None,
                message: "m".to_string(),
                ringtone: "default".to_string(),
                reminder_index: None,
            }),
        );

        let report = reporter.finish();
        assert!(report.success);
        assert_eq!(report.processed, 3);
        assert_eq!(report.popups.len(), 1);
        assert_eq!(
            report.debug_info.summary,
            "3 due, 1 sent, 1 failed, 1 skipped, 1 popups"
        );
    }
}
