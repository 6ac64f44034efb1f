// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message mapping operations.
//!
//! The mapping table is the authoritative idempotence record: a row for
//! (source_chat, source_msg, target_chat) means that message has already
//! been replicated to that target. `put_mapping` is an upsert, so retried
//! writes for the same key overwrite rather than duplicate.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use mirra_core::{MirraError, PairStats};

use crate::database::Database;

/// Record (or overwrite) a source → target message mapping.
pub async fn put_mapping(
    db: &Database,
    source_chat: i64,
    source_msg: i64,
    target_chat: i64,
    target_msg: i64,
) -> Result<(), MirraError> {
    let cloned_at = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO message_map
                 (source_chat, source_msg, target_chat, target_msg, cloned_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![source_chat, source_msg, target_chat, target_msg, cloned_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The target message id for a source message, if it was replicated.
pub async fn get_mapping(
    db: &Database,
    source_chat: i64,
    source_msg: i64,
    target_chat: i64,
) -> Result<Option<i64>, MirraError> {
    db.connection()
        .call(move |conn| {
            let id = conn
                .query_row(
                    "SELECT target_msg FROM message_map
                     WHERE source_chat = ?1 AND source_msg = ?2 AND target_chat = ?3",
                    params![source_chat, source_msg, target_chat],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether a source message has already been replicated to a target.
pub async fn is_replicated(
    db: &Database,
    source_chat: i64,
    source_msg: i64,
    target_chat: i64,
) -> Result<bool, MirraError> {
    Ok(get_mapping(db, source_chat, source_msg, target_chat)
        .await?
        .is_some())
}

/// Replication statistics for one (source, target) pair.
pub async fn stats(db: &Database, source_chat: i64, target_chat: i64) -> Result<PairStats, MirraError> {
    db.connection()
        .call(move |conn| {
            let (cloned_count, last_cloned_at): (u64, Option<String>) = conn.query_row(
                "SELECT COUNT(*), MAX(cloned_at) FROM message_map
                 WHERE source_chat = ?1 AND target_chat = ?2",
                params![source_chat, target_chat],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let last_synced_id: i64 = conn
                .query_row(
                    "SELECT last_msg_id FROM sync_state
                     WHERE source_chat = ?1 AND target_chat = ?2",
                    params![source_chat, target_chat],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(0);

            Ok(PairStats {
                cloned_count,
                last_cloned_at,
                last_synced_id,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Drop all mappings and the cursor for a pair. Configuration-boundary
/// operation; the engine itself never deletes state.
pub async fn clear_pair(db: &Database, source_chat: i64, target_chat: i64) -> Result<u64, MirraError> {
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM message_map WHERE source_chat = ?1 AND target_chat = ?2",
                params![source_chat, target_chat],
            )?;
            conn.execute(
                "DELETE FROM sync_state WHERE source_chat = ?1 AND target_chat = ?2",
                params![source_chat, target_chat],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn put_and_get_round_trip() {
        let (db, _dir) = setup_db().await;

        put_mapping(&db, 100, 1, 200, 11).await.unwrap();
        assert_eq!(get_mapping(&db, 100, 1, 200).await.unwrap(), Some(11));
        assert!(is_replicated(&db, 100, 1, 200).await.unwrap());

        // Unknown key reads as absent.
        assert_eq!(get_mapping(&db, 100, 2, 200).await.unwrap(), None);
        assert!(!is_replicated(&db, 100, 1, 999).await.unwrap());
    }

    #[tokio::test]
    async fn put_is_an_idempotent_upsert() {
        let (db, _dir) = setup_db().await;

        put_mapping(&db, 100, 1, 200, 11).await.unwrap();
        put_mapping(&db, 100, 1, 200, 11).await.unwrap();
        put_mapping(&db, 100, 1, 200, 12).await.unwrap();

        // Exactly one row for the key, holding the latest write.
        let stats = stats(&db, 100, 200).await.unwrap();
        assert_eq!(stats.cloned_count, 1);
        assert_eq!(get_mapping(&db, 100, 1, 200).await.unwrap(), Some(12));
    }

    #[tokio::test]
    async fn mappings_are_scoped_per_target() {
        let (db, _dir) = setup_db().await;

        // Fan-out: the same source message mapped to two targets.
        put_mapping(&db, 100, 1, 200, 11).await.unwrap();
        put_mapping(&db, 100, 1, 300, 21).await.unwrap();

        assert_eq!(get_mapping(&db, 100, 1, 200).await.unwrap(), Some(11));
        assert_eq!(get_mapping(&db, 100, 1, 300).await.unwrap(), Some(21));
        assert_eq!(stats(&db, 100, 200).await.unwrap().cloned_count, 1);
    }

    #[tokio::test]
    async fn stats_on_empty_pair() {
        let (db, _dir) = setup_db().await;
        let s = stats(&db, 100, 200).await.unwrap();
        assert_eq!(s.cloned_count, 0);
        assert_eq!(s.last_cloned_at, None);
        assert_eq!(s.last_synced_id, 0);
    }

    #[tokio::test]
    async fn clear_pair_removes_mappings_and_cursor() {
        let (db, _dir) = setup_db().await;

        put_mapping(&db, 100, 1, 200, 11).await.unwrap();
        put_mapping(&db, 100, 2, 200, 12).await.unwrap();
        crate::queries::cursors::set_cursor(&db, 100, 200, 2).await.unwrap();

        let removed = clear_pair(&db, 100, 200).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(stats(&db, 100, 200).await.unwrap().cloned_count, 0);
        assert_eq!(
            crate::queries::cursors::get_cursor(&db, 100, 200).await.unwrap(),
            0
        );
    }
}
