// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mirra status` command implementation.
//!
//! Reads per-pair replication statistics straight from storage, so it
//! works whether or not an agent is running. Rules whose endpoints are
//! unresolved handles are listed without counters, since resolution
//! needs a transport session.

use serde::Serialize;

use mirra_config::{MirraConfig, RuleStore};
use mirra_core::{ChannelRef, MirraError};
use mirra_storage::{queries, Database};

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
struct PairStatus {
    source: String,
    target: String,
    enabled: bool,
    cloned_count: Option<u64>,
    last_cloned_at: Option<String>,
    last_synced_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    replication_enabled: bool,
    pairs: Vec<PairStatus>,
}

/// Run the `mirra status` command.
pub async fn run_status(config: &MirraConfig, json: bool) -> Result<(), MirraError> {
    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    let store = RuleStore::new(&config.replication.rules_path);
    let doc = store.load();

    let mut pairs = Vec::with_capacity(doc.rules.len());
    for rule in &doc.rules {
        let stats = match (&rule.source, &rule.target) {
            (ChannelRef::Id(source), ChannelRef::Id(target)) => {
                Some(queries::mappings::stats(&db, *source, *target).await?)
            }
            _ => None,
        };
        pairs.push(PairStatus {
            source: rule.source.to_string(),
            target: rule.target.to_string(),
            enabled: rule.enabled,
            cloned_count: stats.as_ref().map(|s| s.cloned_count),
            last_cloned_at: stats.as_ref().and_then(|s| s.last_cloned_at.clone()),
            last_synced_id: stats.as_ref().map(|s| s.last_synced_id),
        });
    }
    db.close().await?;

    let report = StatusReport {
        replication_enabled: doc.enabled,
        pairs,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .map_err(|e| MirraError::Internal(format!("cannot serialize status: {e}")))?
        );
        return Ok(());
    }

    println!(
        "replication: {}",
        if report.replication_enabled { "enabled" } else { "disabled" }
    );
    if report.pairs.is_empty() {
        println!("no rules configured");
    }
    for pair in &report.pairs {
        match pair.cloned_count {
            Some(count) => println!(
                "  {} -> {} [{}] cloned {} (cursor {}, last {})",
                pair.source,
                pair.target,
                if pair.enabled { "on" } else { "off" },
                count,
                pair.last_synced_id.unwrap_or(0),
                pair.last_cloned_at.as_deref().unwrap_or("never"),
            ),
            None => println!(
                "  {} -> {} [{}] (unresolved handle, no stats)",
                pair.source,
                pair.target,
                if pair.enabled { "on" } else { "off" },
            ),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirra_core::ChannelRef;
    use tempfile::tempdir;

    #[tokio::test]
    async fn status_runs_against_a_fresh_database() {
        let dir = tempdir().unwrap();
        let mut config = MirraConfig::default();
        config.storage.database_path = dir.path().join("m.db").to_str().unwrap().to_string();
        config.replication.rules_path = dir.path().join("rules.json").to_str().unwrap().to_string();

        let store = RuleStore::new(&config.replication.rules_path);
        store
            .add_rule(ChannelRef::Id(-1001), ChannelRef::Id(-1002))
            .unwrap();
        store
            .add_rule(ChannelRef::Handle("news".into()), ChannelRef::Id(-1002))
            .unwrap();

        run_status(&config, true).await.unwrap();
        run_status(&config, false).await.unwrap();
    }
}
