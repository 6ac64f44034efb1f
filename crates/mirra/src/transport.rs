// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter selection.
//!
//! The engine is written against the `ChatTransport` trait; concrete
//! platform sessions are compiled in behind feature flags by downstream
//! builds. A build without any adapter can still manage rules and read
//! status, but `serve` and `backfill` report the missing adapter.

use std::sync::Arc;

use mirra_config::MirraConfig;
use mirra_core::{ChatTransport, MirraError};

/// Construct the configured transport adapter.
pub fn build_transport(_config: &MirraConfig) -> Result<Arc<dyn ChatTransport>, MirraError> {
    Err(MirraError::Config(
        "no chat transport adapter compiled into this build; \
         enable a platform adapter feature and rebuild"
            .to_string(),
    ))
}
