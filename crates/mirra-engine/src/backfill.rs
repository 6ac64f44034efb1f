// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resumable historical backfill.
//!
//! A backfill walks a source channel's history backward to the sync
//! cursor, then processes the collected messages in ascending id order
//! so replies always land after the messages they point at. The cursor
//! advances after every examined item and never moves backward, which
//! makes an interrupted backfill resumable: the next invocation starts
//! where the last one stopped, and the mapping table keeps re-examined
//! messages from being sent twice.
//!
//! `BackfillRunner` keeps one continuous polling task per (source,
//! target) pair, cancellable via `CancellationToken`. Cancellation only
//! lands at await points, so a message mid-replication is never torn.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mirra_core::{BackfillStats, MirraError};
use mirra_storage::queries;

use crate::replicate::ReplicateOutcome;
use crate::Engine;

impl Engine {
    /// Replicate the source channel's history into the target, resuming
    /// from the sync cursor (or from `start_id` when that is further
    /// along). Returns counters for the examined range.
    pub async fn backfill(
        &self,
        source_chat: i64,
        target_chat: i64,
        start_id: Option<i64>,
    ) -> Result<BackfillStats, MirraError> {
        let cursor = queries::cursors::get_cursor(&self.db, source_chat, target_chat).await?;
        let floor = cursor.max(start_id.map(|s| s - 1).unwrap_or(0));
        info!(
            source = source_chat,
            target = target_chat,
            floor,
            "starting backfill"
        );

        let pending = self.collect_above(source_chat, floor).await?;
        let mut stats = BackfillStats::default();

        // `pending` arrives strictly descending; process oldest first.
        for record in pending.into_iter().rev() {
            stats.processed += 1;
            match self.replicate_message(target_chat, &record).await {
                Ok(ReplicateOutcome::Cloned { .. }) => {
                    stats.cloned += 1;
                    self.advance_cursor(source_chat, target_chat, record.id).await?;
                    if self.config.pacing_delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.pacing_delay_ms)).await;
                    }
                }
                Ok(ReplicateOutcome::Existing { .. }) => {
                    stats.skipped += 1;
                    self.advance_cursor(source_chat, target_chat, record.id).await?;
                }
                Ok(ReplicateOutcome::Skipped(reason)) => {
                    debug!(msg = record.id, ?reason, "backfill skip");
                    stats.skipped += 1;
                    self.advance_cursor(source_chat, target_chat, record.id).await?;
                }
                // Losing a mapping write would break idempotence; abort.
                Err(e @ MirraError::Storage { .. }) => return Err(e),
                Err(e) => {
                    warn!(
                        source = source_chat,
                        msg = record.id,
                        target = target_chat,
                        error = %e,
                        "backfill item failed"
                    );
                    stats.failed += 1;
                    self.advance_cursor(source_chat, target_chat, record.id).await?;
                }
            }
        }

        info!(
            source = source_chat,
            target = target_chat,
            processed = stats.processed,
            cloned = stats.cloned,
            skipped = stats.skipped,
            failed = stats.failed,
            "backfill finished"
        );
        Ok(stats)
    }

    /// Page history newest-first, collecting every message with an id
    /// above `floor`, keeping at most `scan_cap` of the oldest. The
    /// returned window is strictly descending by id and contiguous with
    /// `floor`, so a capped invocation advances the cursor only over
    /// examined messages and the next invocation picks up right above it.
    async fn collect_above(
        &self,
        source_chat: i64,
        floor: i64,
    ) -> Result<VecDeque<mirra_core::MessageRecord>, MirraError> {
        let mut pending: VecDeque<mirra_core::MessageRecord> = VecDeque::new();
        let mut capped = false;
        let mut before: Option<i64> = None;

        'paging: loop {
            let page = self
                .transport
                .fetch_history_page(source_chat, before, self.config.batch_size)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            before = Some(last.id);

            for record in page {
                if record.id <= floor {
                    break 'paging;
                }
                // Records arrive newest first; over the cap, evict the
                // newest so the kept window stays anchored at the floor.
                pending.push_back(record);
                if pending.len() as u64 > self.config.scan_cap {
                    pending.pop_front();
                    capped = true;
                }
            }
        }

        if capped {
            warn!(
                source = source_chat,
                cap = self.config.scan_cap,
                "scan cap reached, backfilling the oldest window; rerun to continue"
            );
        }
        Ok(pending)
    }
}

struct PairTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Registry of continuous backfill tasks, one per (source, target) pair.
pub struct BackfillRunner {
    engine: Arc<Engine>,
    tasks: Mutex<HashMap<(i64, i64), PairTask>>,
}

impl BackfillRunner {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn a continuous backfill loop for the pair. No-op (returns
    /// false) when a live task for the pair already exists.
    pub async fn start_continuous(&self, source_chat: i64, target_chat: i64) -> bool {
        let mut tasks = self.tasks.lock().await;
        if let Some(task) = tasks.get(&(source_chat, target_chat))
            && !task.handle.is_finished()
        {
            return false;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let engine = self.engine.clone();
        let handle = tokio::spawn(async move {
            loop {
                let result = tokio::select! {
                    _ = token.cancelled() => break,
                    r = engine.backfill(source_chat, target_chat, None) => r,
                };
                let wait = match result {
                    Ok(stats) => {
                        debug!(
                            source = source_chat,
                            target = target_chat,
                            cloned = stats.cloned,
                            "continuous backfill cycle done"
                        );
                        Duration::from_secs(engine.config().poll_interval_secs)
                    }
                    Err(e) => {
                        warn!(
                            source = source_chat,
                            target = target_chat,
                            error = %e,
                            "continuous backfill cycle failed"
                        );
                        Duration::from_secs(engine.config().error_backoff_secs)
                    }
                };
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        });

        tasks.insert((source_chat, target_chat), PairTask { cancel, handle });
        info!(source = source_chat, target = target_chat, "continuous backfill started");
        true
    }

    /// Cancel the pair's task and wait for it to wind down. Returns
    /// whether a task existed.
    pub async fn stop(&self, source_chat: i64, target_chat: i64) -> bool {
        let task = self.tasks.lock().await.remove(&(source_chat, target_chat));
        match task {
            Some(task) => {
                task.cancel.cancel();
                let _ = task.handle.await;
                info!(source = source_chat, target = target_chat, "continuous backfill stopped");
                true
            }
            None => false,
        }
    }

    /// Cancel every running task.
    pub async fn stop_all(&self) {
        let tasks: Vec<_> = {
            let mut map = self.tasks.lock().await;
            map.drain().collect()
        };
        for ((source, target), task) in tasks {
            task.cancel.cancel();
            let _ = task.handle.await;
            debug!(source, target, "continuous backfill stopped");
        }
    }

    /// Pairs with a live continuous task.
    pub async fn active_pairs(&self) -> Vec<(i64, i64)> {
        self.tasks
            .lock()
            .await
            .iter()
            .filter(|(_, task)| !task.handle.is_finished())
            .map(|(pair, _)| *pair)
            .collect()
    }
}
