// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mirra rules` command implementation.
//!
//! Edits the runtime rule document directly; no transport session is
//! needed. A listener running in another process observes the edited
//! document on its next event, since the rule store reads from disk on
//! every lookup.

use clap::Subcommand;

use mirra_config::{MirraConfig, RuleStore};
use mirra_core::{normalize, ChannelRef, MirraError};
use mirra_storage::{queries, Database};

/// Actions on the replication rule document.
#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// Add a replication rule.
    Add { source: String, target: String },
    /// Remove a replication rule.
    Remove {
        source: String,
        target: String,
        /// Also delete the pair's stored mappings and cursor.
        #[arg(long)]
        purge: bool,
    },
    /// List all rules and the global switch.
    List,
    /// Enable replication globally, or one rule when a pair is given.
    Enable {
        source: Option<String>,
        target: Option<String>,
    },
    /// Disable replication globally, or one rule when a pair is given.
    Disable {
        source: Option<String>,
        target: Option<String>,
    },
}

/// Run the `mirra rules` command.
pub async fn run_rules(config: &MirraConfig, action: RulesAction) -> Result<(), MirraError> {
    let store = RuleStore::new(&config.replication.rules_path);

    match action {
        RulesAction::Add { source, target } => {
            let (source, target) = (normalize(&source), normalize(&target));
            if store.add_rule(source.clone(), target.clone())? {
                println!("added rule {source} -> {target}");
            } else {
                println!("rule {source} -> {target} already exists");
            }
        }
        RulesAction::Remove {
            source,
            target,
            purge,
        } => {
            let (source, target) = (normalize(&source), normalize(&target));
            if store.remove_rule(&source, &target)? {
                println!("removed rule {source} -> {target}");
            } else {
                println!("no rule {source} -> {target}");
            }
            if purge {
                purge_pair(config, &source, &target).await?;
            }
        }
        RulesAction::List => {
            let doc = store.load();
            println!(
                "replication: {}",
                if doc.enabled { "enabled" } else { "disabled" }
            );
            if doc.rules.is_empty() {
                println!("no rules configured");
            }
            for rule in &doc.rules {
                println!(
                    "  {} -> {} [{}]",
                    rule.source,
                    rule.target,
                    if rule.enabled { "on" } else { "off" }
                );
            }
        }
        RulesAction::Enable { source, target } => set_enabled(&store, source, target, true)?,
        RulesAction::Disable { source, target } => set_enabled(&store, source, target, false)?,
    }
    Ok(())
}

/// Delete the stored mappings and cursor for a removed rule. Only
/// resolved numeric pairs can be purged offline; handle endpoints need
/// a transport session to resolve, so they are left in place.
async fn purge_pair(
    config: &MirraConfig,
    source: &ChannelRef,
    target: &ChannelRef,
) -> Result<(), MirraError> {
    let (ChannelRef::Id(source_id), ChannelRef::Id(target_id)) = (source, target) else {
        println!("cannot purge {source} -> {target}: handle endpoints are not resolved offline");
        return Ok(());
    };
    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    let removed = queries::mappings::clear_pair(&db, *source_id, *target_id).await?;
    db.close().await?;
    println!("purged {removed} mappings for {source} -> {target}");
    Ok(())
}

fn set_enabled(
    store: &RuleStore,
    source: Option<String>,
    target: Option<String>,
    enabled: bool,
) -> Result<(), MirraError> {
    let state = if enabled { "enabled" } else { "disabled" };
    match (source, target) {
        (Some(source), Some(target)) => {
            let (source, target) = (normalize(&source), normalize(&target));
            if store.set_rule_enabled(&source, &target, enabled)? {
                println!("rule {source} -> {target} {state}");
            } else {
                println!("no rule {source} -> {target}");
            }
        }
        (None, None) => {
            store.set_enabled(enabled)?;
            println!("replication {state}");
        }
        _ => {
            return Err(MirraError::Config(
                "pass both a source and a target, or neither".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirra_config::MirraConfig;
    use tempfile::tempdir;

    fn config_with_rules(dir: &std::path::Path) -> MirraConfig {
        let mut config = MirraConfig::default();
        config.replication.rules_path = dir.join("rules.json").to_str().unwrap().to_string();
        config
    }

    #[tokio::test]
    async fn add_list_remove_round_trip() {
        let dir = tempdir().unwrap();
        let config = config_with_rules(dir.path());

        run_rules(
            &config,
            RulesAction::Add {
                source: "https://t.me/newsfeed".into(),
                target: "-1001000002222".into(),
            },
        )
        .await
        .unwrap();

        let store = RuleStore::new(&config.replication.rules_path);
        let rules = store.rules();
        assert_eq!(rules.len(), 1);
        // Link forms normalize to bare handles before storage.
        assert_eq!(rules[0].source.to_string(), "newsfeed");

        run_rules(
            &config,
            RulesAction::Remove {
                source: "@newsfeed".into(),
                target: "-1001000002222".into(),
                purge: false,
            },
        )
        .await
        .unwrap();
        assert!(store.rules().is_empty());
    }

    #[tokio::test]
    async fn remove_with_purge_clears_stored_state() {
        let dir = tempdir().unwrap();
        let mut config = config_with_rules(dir.path());
        config.storage.database_path = dir.path().join("m.db").to_str().unwrap().to_string();

        let db = Database::open_with(&config.storage.database_path, true)
            .await
            .unwrap();
        queries::mappings::put_mapping(&db, -1001, 1, -1002, 11)
            .await
            .unwrap();
        db.close().await.unwrap();
        drop(db);

        let store = RuleStore::new(&config.replication.rules_path);
        store
            .add_rule(ChannelRef::Id(-1001), ChannelRef::Id(-1002))
            .unwrap();

        run_rules(
            &config,
            RulesAction::Remove {
                source: "-1001".into(),
                target: "-1002".into(),
                purge: true,
            },
        )
        .await
        .unwrap();

        let db = Database::open_with(&config.storage.database_path, true)
            .await
            .unwrap();
        assert!(
            !queries::mappings::is_replicated(&db, -1001, 1, -1002)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn enable_requires_a_full_pair_or_none() {
        let dir = tempdir().unwrap();
        let config = config_with_rules(dir.path());

        let err = run_rules(
            &config,
            RulesAction::Enable {
                source: Some("a".into()),
                target: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MirraError::Config(_)));

        run_rules(&config, RulesAction::Enable { source: None, target: None })
            .await
            .unwrap();
        assert!(RuleStore::new(&config.replication.rules_path).is_enabled());
    }
}
