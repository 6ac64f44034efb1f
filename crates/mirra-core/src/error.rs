// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mirra replication engine.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all Mirra crates.
///
/// The transport layer signals two conditions the engine must special-case:
/// [`MirraError::RateLimited`] (carries the platform-suggested wait) and
/// [`MirraError::ForwardRestricted`] (triggers the download/re-upload
/// fallback). [`MirraError::NotFound`] marks a vanished or empty message,
/// which the engine treats as a skip rather than a failure.
#[derive(Debug, Error)]
pub enum MirraError {
    /// Configuration errors (invalid TOML, missing required fields, bad rule documents).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, query failure, migration failure).
    ///
    /// Never swallowed by the engine: losing a mapping or cursor write would
    /// break the idempotence invariant for that message.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors (send failure, resolution failure, download failure).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The platform asked the caller to pause before retrying.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// The source channel forbids forwarding/copying its content directly.
    #[error("forwarding restricted by the source channel")]
    ForwardRestricted,

    /// The message no longer exists or has an empty payload.
    #[error("message not found or empty")]
    NotFound,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MirraError {
    /// Convenience constructor for transport errors without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// True for the vanished/empty-message condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// True for the forwarding-restricted capability failure.
    pub fn is_forward_restricted(&self) -> bool {
        matches!(self, Self::ForwardRestricted)
    }
}
