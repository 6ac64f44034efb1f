// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat transport trait: the boundary between the replication engine and
//! the platform session layer.
//!
//! The engine never talks to the network directly. Everything it needs
//! from the platform — resolution, history, sends, downloads — goes
//! through this trait, which lets tests drive the engine with an
//! in-memory implementation. Two error conditions are distinguished and
//! must be surfaced as their dedicated [`MirraError`] variants:
//! `RateLimited` (with the platform-suggested wait) and
//! `ForwardRestricted`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::MirraError;
use crate::types::{ChannelInfo, ChannelRef, FormattedText, MessageRecord, OutboundContent};

/// Platform session operations consumed by the replication engine.
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// Resolve a channel reference against the platform's directory.
    async fn resolve_channel(&self, channel: &ChannelRef) -> Result<ChannelInfo, MirraError>;

    /// Fetch a single message. `Ok(None)` means it no longer exists.
    async fn fetch_message(
        &self,
        channel: i64,
        id: i64,
    ) -> Result<Option<MessageRecord>, MirraError>;

    /// Fetch one page of channel history, newest first.
    ///
    /// Returns messages with ids strictly below `before_id`, or the newest
    /// messages when `before_id` is `None`. An empty page means the start
    /// of history was reached.
    async fn fetch_history_page(
        &self,
        channel: i64,
        before_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, MirraError>;

    /// Fetch all members of the media group containing message `id`,
    /// in ascending id order.
    async fn fetch_group(&self, channel: i64, id: i64) -> Result<Vec<MessageRecord>, MirraError>;

    /// Submit one freshly created message; returns the new message id.
    async fn send_content(
        &self,
        target: i64,
        content: &OutboundContent,
        reply_to: Option<i64>,
    ) -> Result<i64, MirraError>;

    /// Submit a media group as one atomic multi-item send; returns the new
    /// message ids in the same order as `items`.
    async fn send_group(
        &self,
        target: i64,
        items: &[OutboundContent],
        reply_to: Option<i64>,
    ) -> Result<Vec<i64>, MirraError>;

    /// Download a message's media to local ephemeral storage.
    async fn download(&self, message: &MessageRecord) -> Result<PathBuf, MirraError>;

    /// Upload a local file as a fresh asset and send it; returns the new
    /// message id. Used by the forwarding-restricted fallback.
    async fn upload(
        &self,
        target: i64,
        path: &Path,
        caption: Option<&FormattedText>,
        reply_to: Option<i64>,
    ) -> Result<i64, MirraError>;

    /// Replace the text of an existing plain-text message.
    async fn edit_text(
        &self,
        channel: i64,
        message_id: i64,
        text: &FormattedText,
    ) -> Result<(), MirraError>;

    /// Replace the caption of an existing media message.
    async fn edit_caption(
        &self,
        channel: i64,
        message_id: i64,
        caption: &FormattedText,
    ) -> Result<(), MirraError>;
}
