// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mirra serve` command implementation.
//!
//! Connects the transport session, opens storage, and runs the
//! replication engine until interrupted: the transport delivers live
//! events into the engine's listener, while one continuous backfill
//! task per enabled rule sweeps history on the poll interval.

use std::sync::Arc;

use tracing::{info, warn};

use mirra_config::{MirraConfig, RuleStore};
use mirra_core::MirraError;
use mirra_engine::{BackfillRunner, Engine};
use mirra_storage::Database;

use crate::transport::build_transport;

/// Run the `mirra serve` command.
pub async fn run_serve(config: &MirraConfig) -> Result<(), MirraError> {
    let transport = build_transport(config)?;
    let db = Arc::new(Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?);
    let rules = RuleStore::new(&config.replication.rules_path);
    let engine = Arc::new(Engine::new(
        transport,
        db.clone(),
        rules,
        config.replication.clone(),
    ));

    if !engine.rules().is_enabled() {
        warn!("replication is globally disabled; serving with no active rules");
    }

    let runner = BackfillRunner::new(engine.clone());
    for rule in engine.rules().rules().iter().filter(|r| r.enabled) {
        let source = match engine.resolve(&rule.source).await {
            Ok(id) => id,
            Err(e) => {
                warn!(source = %rule.source, error = %e, "cannot resolve rule source, skipping");
                continue;
            }
        };
        let target = match engine.resolve(&rule.target).await {
            Ok(id) => id,
            Err(e) => {
                warn!(target = %rule.target, error = %e, "cannot resolve rule target, skipping");
                continue;
            }
        };
        runner.start_continuous(source, target).await;
    }

    info!(
        pairs = runner.active_pairs().await.len(),
        "mirra serving; press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| MirraError::Internal(format!("signal handler failed: {e}")))?;

    info!("shutting down");
    runner.stop_all().await;
    db.close().await?;
    Ok(())
}
