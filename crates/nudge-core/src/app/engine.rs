//! ReminderEngine - 1 回の実行（pass）を回す
//!
//! # フロー
//! 1. SourceAggregator::collect() で候補を集める
//! 2. DueEvaluator::partition() で期限到来分を選ぶ
//! 3. 所有エンティティごとにグループ化し、グループ単位で並列実行
//!    （同じエンティティへの書き込みはグループ内で直列）
//! 4. ChannelDispatcher::dispatch() → StateMutator::commit()
//! 5. RunReporter で結果をまとめる
//!
//! # 同時実行
//! - JoinSet + Semaphore（max_concurrent_entities）でグループ数を制限
//! - 同じエンジンで run() が重なったら RunInProgress を返す（プロセス内のみ）

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::aggregator::SourceAggregator;
use super::dispatcher::ChannelDispatcher;
use super::evaluator::DueEvaluator;
use super::mutator::StateMutator;
use super::reporter::{RunReporter, item_outcome};
use crate::domain::{
    EntityRef, ErrorKind, ItemOutcome, NudgeError, PopupPayload, ReminderOccurrence, RunReport,
};
use crate::ports::Clock;

/// Occurrences of one owning entity, with their position in due order.
type Group = Vec<(usize, ReminderOccurrence)>;

struct Processed {
    position: usize,
    item: ItemOutcome,
    popup: Option<PopupPayload>,
}

pub struct ReminderEngine {
    aggregator: SourceAggregator,
    evaluator: DueEvaluator,
    dispatcher: Arc<ChannelDispatcher>,
    mutator: Arc<StateMutator>,
    clock: Arc<dyn Clock>,
    max_concurrent_entities: usize,
    run_guard: Mutex<()>,
}

impl ReminderEngine {
    pub(crate) fn from_parts(
        aggregator: SourceAggregator,
        evaluator: DueEvaluator,
        dispatcher: ChannelDispatcher,
        mutator: StateMutator,
        clock: Arc<dyn Clock>,
        max_concurrent_entities: usize,
    ) -> Self {
        Self {
            aggregator,
            evaluator,
            dispatcher: Arc::new(dispatcher),
            mutator: Arc::new(mutator),
            clock,
            max_concurrent_entities: max_concurrent_entities.max(1),
            run_guard: Mutex::new(()),
        }
    }

    /// One full pass. Per-item problems are reported inside the `RunReport`;
    /// only a failure of the pass itself is an `Err`.
    pub async fn run(&self) -> Result<RunReport, NudgeError> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| NudgeError::RunInProgress)?;

        let now = self.clock.now();
        let mut reporter = RunReporter::new(now);

        let collection = self.aggregator.collect(now).await;
        reporter.sources(collection.checked, collection.skipped, collection.source_errors);

        let partition = self.evaluator.partition(collection.occurrences, now);
        reporter.upcoming(partition.upcoming);
        reporter.found_due(partition.due.len());
        info!(due = partition.due.len(), "processing due reminders");

        let mut processed = self.process(partition.due).await?;
        processed.sort_by_key(|p| p.position);
        for p in processed {
            reporter.record(p.item, p.popup);
        }

        Ok(reporter.finish())
    }

    async fn process(&self, due: Vec<ReminderOccurrence>) -> Result<Vec<Processed>, NudgeError> {
        let total = due.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_entities));
        let mut set = JoinSet::new();
        let mut spawned: HashMap<tokio::task::Id, Vec<(usize, ReminderOccurrence)>> = HashMap::new();

        for group in group_by_owner(due) {
            let semaphore = Arc::clone(&semaphore);
            let dispatcher = Arc::clone(&self.dispatcher);
            let mutator = Arc::clone(&self.mutator);
            let work = group.clone();
            let handle = set.spawn(async move {
                // 閉じないセマフォなので acquire は失敗しない
                let _permit = semaphore.acquire_owned().await.ok();
                let mut out = Vec::with_capacity(work.len());
                for (position, occurrence) in work {
                    let dispatch = dispatcher.dispatch(&occurrence).await;
                    let commit = mutator.commit(&occurrence, &dispatch.outcome).await;
                    if let Err(err) = &commit {
                        match err.kind() {
                            ErrorKind::Transient => {
                                warn!(key = %occurrence.key(), error = %err, "commit failed, next run retries")
                            }
                            ErrorKind::Permanent | ErrorKind::Infrastructure => {
                                error!(key = %occurrence.key(), error = %err, kind = ?err.kind(), "commit failed")
                            }
                        }
                    }
                    out.push(Processed {
                        position,
                        item: item_outcome(&occurrence, &dispatch, &commit),
                        popup: dispatch.popup,
                    });
                }
                out
            });
            spawned.insert(handle.id(), group);
        }

        let mut processed = Vec::with_capacity(total);
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_, items)) => processed.extend(items),
                Err(err) => {
                    // パニックしたグループは失敗として報告し、他は続行
                    error!(error = %err, "reminder worker panicked");
                    let Some(group) = spawned.remove(&err.id()) else {
                        return Err(NudgeError::Worker(err.to_string()));
                    };
                    processed.extend(group.into_iter().map(|(position, occurrence)| Processed {
                        position,
                        item: ItemOutcome::failed(
                            occurrence.key(),
                            occurrence.origin.kind(),
                            format!("worker failed: {err}"),
                        ),
                        popup: None,
                    }));
                }
            }
        }
        Ok(processed)
    }
}

/// Group by owning entity, keeping first-appearance order.
fn group_by_owner(due: Vec<ReminderOccurrence>) -> Vec<Group> {
    let mut index: HashMap<EntityRef, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for (position, occurrence) in due.into_iter().enumerate() {
        let slot = *index.entry(occurrence.owner()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push((position, occurrence));
    }
    groups
}
