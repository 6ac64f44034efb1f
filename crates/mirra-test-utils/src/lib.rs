// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test utilities for the Mirra workspace.
//!
//! The centerpiece is [`MockTransport`], an in-memory implementation of
//! the engine's transport boundary with scripted failure injection, plus
//! the [`records`] builders for constructing message fixtures.

pub mod mock_transport;
pub mod records;

pub use mock_transport::{MockTransport, SentMessage, SentVia};
