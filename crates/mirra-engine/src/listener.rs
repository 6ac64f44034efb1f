// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time event handling.
//!
//! The transport session calls [`Engine::on_new_message`] for every
//! incoming message. The engine matches the message's channel against
//! the enabled mapping rules, fans out to every matching target, and
//! advances the sync cursor per target so a later backfill knows the
//! message was examined live.
//!
//! Failures are isolated per target: one target erroring never stops
//! replication to the others, and the cursor for a failed target stays
//! behind so the next backfill cycle picks the message up again.

use tracing::{debug, warn};

use mirra_core::{ContentKind, MessageRecord, MirraError};
use mirra_storage::queries;

use crate::links::rewrite_links;
use crate::Engine;

impl Engine {
    /// Handle one freshly arrived message.
    pub async fn on_new_message(&self, record: &MessageRecord) -> Result<(), MirraError> {
        if record.outgoing {
            return Ok(());
        }
        if record.edited {
            return self.on_edited_message(record).await;
        }

        let targets = self.targets_for_chat(record.channel).await?;
        if targets.is_empty() {
            return Ok(());
        }

        for target in targets {
            match self.replicate_message(target, record).await {
                Ok(_) => {
                    self.advance_cursor(record.channel, target, record.id).await?;
                }
                Err(e) => {
                    warn!(
                        source = record.channel,
                        msg = record.id,
                        target,
                        error = %e,
                        "live replication to target failed"
                    );
                }
            }
        }
        Ok(())
    }

    /// Propagate an edit to every target copy that exists.
    ///
    /// Best effort: an edit arriving before the message was replicated,
    /// or after the target copy was deleted, is logged and dropped.
    pub async fn on_edited_message(&self, record: &MessageRecord) -> Result<(), MirraError> {
        let Some(text) = &record.text else {
            return Ok(());
        };

        for target in self.targets_for_chat(record.channel).await? {
            let Some(target_msg) =
                queries::mappings::get_mapping(&self.db, record.channel, record.id, target).await?
            else {
                debug!(
                    source = record.channel,
                    msg = record.id,
                    target,
                    "edit for unreplicated message, ignoring"
                );
                continue;
            };

            let rewritten = rewrite_links(&self.db, record.channel, target, text).await?;
            let result = if record.content.kind() == ContentKind::Text {
                self.transport.edit_text(target, target_msg, &rewritten).await
            } else {
                self.transport.edit_caption(target, target_msg, &rewritten).await
            };
            if let Err(e) = result {
                warn!(
                    source = record.channel,
                    msg = record.id,
                    target,
                    error = %e,
                    "edit propagation failed"
                );
            }
        }
        Ok(())
    }

    /// Resolved target chat ids of all enabled rules matching `chat_id`.
    ///
    /// Rule endpoints written as handles are resolved through the
    /// transport (cached); a rule whose endpoint fails to resolve is
    /// skipped with a warning rather than failing the event.
    pub async fn targets_for_chat(&self, chat_id: i64) -> Result<Vec<i64>, MirraError> {
        let doc = self.rules.load();
        if !doc.enabled {
            return Ok(Vec::new());
        }

        let mut targets = Vec::new();
        for rule in doc.rules.iter().filter(|r| r.enabled) {
            let source_id = match self.resolve(&rule.source).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(source = %rule.source, error = %e, "cannot resolve rule source");
                    continue;
                }
            };
            if source_id != chat_id {
                continue;
            }
            match self.resolve(&rule.target).await {
                Ok(id) => {
                    if !targets.contains(&id) {
                        targets.push(id);
                    }
                }
                Err(e) => {
                    warn!(target = %rule.target, error = %e, "cannot resolve rule target");
                }
            }
        }
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use mirra_config::{ReplicationConfig, RuleStore};
    use mirra_core::ChannelRef;
    use mirra_storage::Database;
    use mirra_test_utils::{records, MockTransport};

    use super::*;

    const SOURCE: i64 = -1001000001111;
    const TARGET_A: i64 = -1001000002222;
    const TARGET_B: i64 = -1001000003333;

    async fn setup() -> (Arc<MockTransport>, Engine, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Arc::new(
            Database::open(dir.path().join("t.db").to_str().unwrap())
                .await
                .unwrap(),
        );
        let transport = Arc::new(MockTransport::new());
        let rules = RuleStore::new(dir.path().join("rules.json"));
        rules.set_enabled(true).unwrap();
        let config = ReplicationConfig {
            pacing_delay_ms: 0,
            ..ReplicationConfig::default()
        };
        let engine = Engine::new(transport.clone(), db, rules, config);
        (transport, engine, dir)
    }

    #[tokio::test]
    async fn live_message_fans_out_and_advances_cursors() {
        let (transport, engine, _dir) = setup().await;
        engine
            .rules()
            .add_rule(ChannelRef::Id(SOURCE), ChannelRef::Id(TARGET_A))
            .unwrap();
        engine
            .rules()
            .add_rule(ChannelRef::Id(SOURCE), ChannelRef::Id(TARGET_B))
            .unwrap();

        engine
            .on_new_message(&records::text(SOURCE, 7, "live"))
            .await
            .unwrap();

        assert_eq!(transport.sent_count().await, 2);
        assert_eq!(
            queries::cursors::get_cursor(engine.db(), SOURCE, TARGET_A).await.unwrap(),
            7
        );
        assert_eq!(
            queries::cursors::get_cursor(engine.db(), SOURCE, TARGET_B).await.unwrap(),
            7
        );
    }

    #[tokio::test]
    async fn outgoing_and_unmatched_messages_are_ignored() {
        let (transport, engine, _dir) = setup().await;
        engine
            .rules()
            .add_rule(ChannelRef::Id(SOURCE), ChannelRef::Id(TARGET_A))
            .unwrap();

        let mut own = records::text(SOURCE, 1, "mine");
        own.outgoing = true;
        engine.on_new_message(&own).await.unwrap();

        // A channel no rule matches.
        engine
            .on_new_message(&records::text(-100999, 1, "elsewhere"))
            .await
            .unwrap();

        assert_eq!(transport.sent_count().await, 0);
    }

    #[tokio::test]
    async fn kill_switch_stops_all_replication() {
        let (transport, engine, _dir) = setup().await;
        engine
            .rules()
            .add_rule(ChannelRef::Id(SOURCE), ChannelRef::Id(TARGET_A))
            .unwrap();
        engine.rules().set_enabled(false).unwrap();

        engine
            .on_new_message(&records::text(SOURCE, 1, "muted"))
            .await
            .unwrap();
        assert_eq!(transport.sent_count().await, 0);
    }

    #[tokio::test]
    async fn handle_rules_match_after_resolution() {
        let (transport, engine, _dir) = setup().await;
        transport.register_handle("newsfeed", SOURCE).await;
        engine
            .rules()
            .add_rule(
                ChannelRef::Handle("newsfeed".into()),
                ChannelRef::Id(TARGET_A),
            )
            .unwrap();

        engine
            .on_new_message(&records::text(SOURCE, 3, "via handle"))
            .await
            .unwrap();
        assert_eq!(transport.sent_count().await, 1);
    }

    #[tokio::test]
    async fn edits_reach_the_mapped_copy_only() {
        let (transport, engine, _dir) = setup().await;
        engine
            .rules()
            .add_rule(ChannelRef::Id(SOURCE), ChannelRef::Id(TARGET_A))
            .unwrap();

        let original = records::text(SOURCE, 5, "v1");
        engine.on_new_message(&original).await.unwrap();
        let target_msg = queries::mappings::get_mapping(engine.db(), SOURCE, 5, TARGET_A)
            .await
            .unwrap()
            .unwrap();

        let mut edited = records::text(SOURCE, 5, "v2");
        edited.edited = true;
        engine.on_new_message(&edited).await.unwrap();

        let edits = transport.edits().await;
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].0, TARGET_A);
        assert_eq!(edits[0].1, target_msg);
        assert_eq!(edits[0].2.text, "v2");

        // Edit of a message that was never replicated is dropped.
        let mut unknown = records::text(SOURCE, 99, "ghost");
        unknown.edited = true;
        engine.on_new_message(&unknown).await.unwrap();
        assert_eq!(transport.edits().await.len(), 1);
    }
}
