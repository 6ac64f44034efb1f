// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync cursor operations.
//!
//! The cursor is the highest source message id examined for a pair. It
//! bounds how far back a resumed backfill must scan; the mapping table is
//! the authoritative idempotence record. The store does not enforce
//! monotonicity — callers only advance the cursor forward.

use rusqlite::{OptionalExtension, params};

use mirra_core::MirraError;

use crate::database::Database;

/// Last synced message id for a pair, 0 when the pair has never synced.
pub async fn get_cursor(db: &Database, source_chat: i64, target_chat: i64) -> Result<i64, MirraError> {
    db.connection()
        .call(move |conn| {
            let id = conn
                .query_row(
                    "SELECT last_msg_id FROM sync_state
                     WHERE source_chat = ?1 AND target_chat = ?2",
                    params![source_chat, target_chat],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id.unwrap_or(0))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set the last synced message id for a pair.
pub async fn set_cursor(
    db: &Database,
    source_chat: i64,
    target_chat: i64,
    msg_id: i64,
) -> Result<(), MirraError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO sync_state (source_chat, target_chat, last_msg_id)
                 VALUES (?1, ?2, ?3)",
                params![source_chat, target_chat, msg_id],
            )?;
            Ok(())
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
    async fn unknown_pair_reads_as_zero() {
        let (db, _dir) = setup_db().await;
        assert_eq!(get_cursor(&db, 100, 200).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn set_then_get() {
        let (db, _dir) = setup_db().await;

        set_cursor(&db, 100, 200, 42).await.unwrap();
        assert_eq!(get_cursor(&db, 100, 200).await.unwrap(), 42);

        set_cursor(&db, 100, 200, 43).await.unwrap();
        assert_eq!(get_cursor(&db, 100, 200).await.unwrap(), 43);
    }

    #[tokio::test]
    async fn cursors_are_independent_per_pair() {
        let (db, _dir) = setup_db().await;

        set_cursor(&db, 100, 200, 5).await.unwrap();
        set_cursor(&db, 100, 300, 9).await.unwrap();

        assert_eq!(get_cursor(&db, 100, 200).await.unwrap(), 5);
        assert_eq!(get_cursor(&db, 100, 300).await.unwrap(), 9);
        assert_eq!(get_cursor(&db, 999, 200).await.unwrap(), 0);
    }
}
