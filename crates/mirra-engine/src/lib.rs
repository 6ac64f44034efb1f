// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Mirra replication engine.
//!
//! Ties the transport boundary, the mapping store, and the rule document
//! together into three surfaces:
//!
//! - [`replicate`]: transcribe one source message into a target channel,
//!   idempotently, preserving replies, formatting, and media groups;
//! - [`listener`]: react to live message events with rule fan-out;
//! - [`backfill`]: resumable historical scans with pacing and a
//!   continuous polling mode.
//!
//! All state shared between the listener and backfill tasks lives in the
//! database; the in-process caches (dispatched media groups, resolved
//! handles) are advisory only and safe to lose on restart.

pub mod backfill;
pub mod links;
pub mod listener;
pub mod replicate;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use mirra_config::{ReplicationConfig, RuleStore};
use mirra_core::{ChannelRef, ChatTransport, MirraError};
use mirra_storage::{Database, queries};

pub use backfill::BackfillRunner;
pub use replicate::{ReplicateOutcome, SkipReason};

/// The replication engine for one transport session.
pub struct Engine {
    transport: Arc<dyn ChatTransport>,
    db: Arc<Database>,
    rules: RuleStore,
    config: ReplicationConfig,
    /// Media groups already dispatched by this process, keyed
    /// `{source}_{group_id}_{target}`. Prevents double group sends when
    /// several members arrive close together.
    group_cache: Mutex<HashSet<String>>,
    /// Resolved handle → chat id cache.
    resolve_cache: Mutex<HashMap<String, i64>>,
}

impl Engine {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        db: Arc<Database>,
        rules: RuleStore,
        config: ReplicationConfig,
    ) -> Self {
        Self {
            transport,
            db,
            rules,
            config,
            group_cache: Mutex::new(HashSet::new()),
            resolve_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    /// Resolve a channel reference to a numeric chat id, caching handle
    /// lookups for the lifetime of the engine.
    pub async fn resolve(&self, channel: &ChannelRef) -> Result<i64, MirraError> {
        match channel {
            ChannelRef::Id(id) => Ok(*id),
            ChannelRef::Handle(handle) => {
                if let Some(id) = self.resolve_cache.lock().await.get(handle) {
                    return Ok(*id);
                }
                let info = self.transport.resolve_channel(channel).await?;
                self.resolve_cache
                    .lock()
                    .await
                    .insert(handle.clone(), info.id);
                Ok(info.id)
            }
        }
    }

    /// Advance the sync cursor for a pair, forward only. Writes behind
    /// the current cursor are ignored so the cursor never regresses.
    pub(crate) async fn advance_cursor(
        &self,
        source_chat: i64,
        target_chat: i64,
        msg_id: i64,
    ) -> Result<(), MirraError> {
        let current = queries::cursors::get_cursor(&self.db, source_chat, target_chat).await?;
        if msg_id > current {
            queries::cursors::set_cursor(&self.db, source_chat, target_chat, msg_id).await?;
        }
        Ok(())
    }
}
