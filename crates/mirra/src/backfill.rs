// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mirra backfill` command implementation.
//!
//! One-shot history replication for a single (source, target) pair,
//! independent of the configured rules. Resumes from the saved cursor
//! unless `--from` pins an explicit starting message id.

use std::sync::Arc;

use mirra_config::{MirraConfig, RuleStore};
use mirra_core::{normalize, MirraError};
use mirra_engine::Engine;
use mirra_storage::Database;

use crate::transport::build_transport;

/// Run the `mirra backfill` command.
pub async fn run_backfill(
    config: &MirraConfig,
    source: &str,
    target: &str,
    from: Option<i64>,
) -> Result<(), MirraError> {
    let transport = build_transport(config)?;
    let db = Arc::new(Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?);
    let rules = RuleStore::new(&config.replication.rules_path);
    let engine = Engine::new(transport, db.clone(), rules, config.replication.clone());

    let source_id = engine.resolve(&normalize(source)).await?;
    let target_id = engine.resolve(&normalize(target)).await?;

    let stats = engine.backfill(source_id, target_id, from).await?;
    println!(
        "backfill {source_id} -> {target_id}: processed {}, cloned {}, skipped {}, failed {}",
        stats.processed, stats.cloned, stats.skipped, stats.failed
    );

    db.close().await?;
    Ok(())
}
