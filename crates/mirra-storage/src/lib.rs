// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Mirra replication engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! modules for the message mapping table and the sync cursor table.
//!
//! Concurrent callers on different (source, target) keys never block each
//! other beyond the serialized write thread; the upsert semantics of
//! `put_mapping`/`set_cursor` make same-key races safe.

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::Database;
pub use mirra_core::PairStats;
