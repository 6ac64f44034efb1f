// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mirra channel replication engine.
//!
//! This crate provides the domain types, the error type, the identifier
//! normalizer, and the [`ChatTransport`] trait that bounds the engine's
//! view of the messaging platform. It performs no I/O itself.

pub mod error;
pub mod ident;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MirraError;
pub use ident::normalize;
pub use traits::ChatTransport;
pub use types::{
    BackfillStats, ChannelInfo, ChannelRef, ContactData, ContentKind, FormattedText, LocationData,
    MappingRule, MediaRef, MessageContent, MessageRecord, OutboundContent, PairStats, PollData,
    TextEntity, VenueData,
};
