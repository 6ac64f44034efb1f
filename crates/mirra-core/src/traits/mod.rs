// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for Mirra's external collaborators.

pub mod transport;

pub use transport::ChatTransport;
