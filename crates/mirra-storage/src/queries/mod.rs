// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the replication tables.

pub mod cursors;
pub mod mappings;
