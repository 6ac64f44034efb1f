// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat transport for deterministic testing.
//!
//! `MockTransport` implements [`ChatTransport`] over in-memory channel
//! histories, with captured sends and scripted failures: rate limits,
//! forwarding restrictions on specific media handles, and vanished
//! messages. Target message ids are allocated monotonically per target
//! channel, like the real platform does.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mirra_core::{
    ChannelInfo, ChannelRef, ChatTransport, FormattedText, MessageRecord, MirraError,
    OutboundContent,
};

/// How a captured message reached the mock platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentVia {
    /// A singular `send_content` call.
    Single,
    /// Item `index` of a `send_group` call of `len` items.
    GroupItem { index: usize, len: usize },
    /// The `upload` fallback path.
    Upload,
}

/// One message captured by the mock platform.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub target: i64,
    pub id: i64,
    pub content: Option<OutboundContent>,
    pub caption: Option<FormattedText>,
    pub reply_to: Option<i64>,
    pub via: SentVia,
}

#[derive(Default)]
struct Inner {
    /// Per-channel history, ascending by message id.
    channels: HashMap<i64, BTreeMap<i64, MessageRecord>>,
    /// Handle → chat id directory for resolution.
    directory: HashMap<String, i64>,
    /// Next message id to allocate, per target channel.
    next_id: HashMap<i64, i64>,
    sent: Vec<SentMessage>,
    edits: Vec<(i64, i64, FormattedText)>,
    /// Each queued duration fails the next send with `RateLimited`.
    rate_limits: VecDeque<Duration>,
    /// Media handles whose direct re-send is forwarding-restricted.
    restricted_media: HashSet<String>,
    /// Number of sends that should fail with `NotFound`.
    not_found_sends: u32,
    /// Uploads of these paths fail once with `RateLimited`.
    upload_failures: HashMap<PathBuf, Duration>,
    /// Files handed out by `download`, for cleanup assertions.
    downloads: Vec<PathBuf>,
    send_group_calls: u32,
}

impl Inner {
    fn alloc_id(&mut self, target: i64) -> i64 {
        let next = self.next_id.entry(target).or_insert(1);
        let id = *next;
        *next += 1;
        id
    }

    fn check_scripted_failures(&mut self, content: Option<&OutboundContent>) -> Result<(), MirraError> {
        if let Some(wait) = self.rate_limits.pop_front() {
            return Err(MirraError::RateLimited { retry_after: wait });
        }
        if self.not_found_sends > 0 {
            self.not_found_sends -= 1;
            return Err(MirraError::NotFound);
        }
        if let Some(content) = content
            && let Some(media) = content.content.media()
            && self.restricted_media.contains(&media.0)
        {
            return Err(MirraError::ForwardRestricted);
        }
        Ok(())
    }
}

/// An in-memory messaging platform for engine tests.
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
    scratch: tempfile::TempDir,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            scratch: tempfile::tempdir().expect("scratch dir"),
        }
    }

    /// Seed a channel's history with the given records.
    pub async fn seed_history(&self, channel: i64, records: Vec<MessageRecord>) {
        let mut inner = self.inner.lock().await;
        let history = inner.channels.entry(channel).or_default();
        for record in records {
            history.insert(record.id, record);
        }
    }

    /// Register a handle in the resolution directory.
    pub async fn register_handle(&self, handle: &str, id: i64) {
        self.inner.lock().await.directory.insert(handle.to_string(), id);
    }

    /// Fail the next `times` sends with a rate-limit carrying `wait`.
    pub async fn script_rate_limit(&self, times: u32, wait: Duration) {
        let mut inner = self.inner.lock().await;
        for _ in 0..times {
            inner.rate_limits.push_back(wait);
        }
    }

    /// Mark a media handle as forwarding-restricted for direct sends.
    pub async fn restrict_media(&self, file_id: &str) {
        self.inner.lock().await.restricted_media.insert(file_id.to_string());
    }

    /// Fail the next `times` sends with `NotFound`.
    pub async fn script_not_found(&self, times: u32) {
        self.inner.lock().await.not_found_sends = times;
    }

    /// Fail the next upload of the given source message's media once
    /// with a rate limit.
    pub async fn script_upload_rate_limit(&self, channel: i64, id: i64, wait: Duration) {
        let path = self.scratch.path().join(format!("{channel}_{id}.bin"));
        self.inner.lock().await.upload_failures.insert(path, wait);
    }

    /// Remove a message from a channel's history.
    pub async fn vanish_message(&self, channel: i64, id: i64) {
        if let Some(history) = self.inner.lock().await.channels.get_mut(&channel) {
            history.remove(&id);
        }
    }

    /// All messages captured by the mock platform, in send order.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.inner.lock().await.sent.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.inner.lock().await.sent.len()
    }

    /// Number of `send_group` calls observed.
    pub async fn group_send_calls(&self) -> u32 {
        self.inner.lock().await.send_group_calls
    }

    /// All text/caption edits captured, as (channel, message_id, text).
    pub async fn edits(&self) -> Vec<(i64, i64, FormattedText)> {
        self.inner.lock().await.edits.clone()
    }

    /// Paths handed out by `download`; callers assert on cleanup.
    pub async fn downloads(&self) -> Vec<PathBuf> {
        self.inner.lock().await.downloads.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn resolve_channel(&self, channel: &ChannelRef) -> Result<ChannelInfo, MirraError> {
        match channel {
            ChannelRef::Id(id) => Ok(ChannelInfo {
                id: *id,
                title: None,
                handle: None,
            }),
            ChannelRef::Handle(handle) => {
                let inner = self.inner.lock().await;
                inner
                    .directory
                    .get(handle)
                    .map(|id| ChannelInfo {
                        id: *id,
                        title: None,
                        handle: Some(handle.clone()),
                    })
                    .ok_or_else(|| MirraError::transport(format!("unknown handle: {handle}")))
            }
        }
    }

    async fn fetch_message(
        &self,
        channel: i64,
        id: i64,
    ) -> Result<Option<MessageRecord>, MirraError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .channels
            .get(&channel)
            .and_then(|history| history.get(&id))
            .cloned())
    }

    async fn fetch_history_page(
        &self,
        channel: i64,
        before_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, MirraError> {
        let inner = self.inner.lock().await;
        let Some(history) = inner.channels.get(&channel) else {
            return Ok(Vec::new());
        };
        // Newest first, strictly below before_id.
        let page: Vec<MessageRecord> = history
            .values()
            .rev()
            .filter(|record| before_id.is_none_or(|b| record.id < b))
            .take(limit)
            .cloned()
            .collect();
        Ok(page)
    }

    async fn fetch_group(&self, channel: i64, id: i64) -> Result<Vec<MessageRecord>, MirraError> {
        let inner = self.inner.lock().await;
        let history = inner
            .channels
            .get(&channel)
            .ok_or(MirraError::NotFound)?;
        let group_id = history
            .get(&id)
            .and_then(|record| record.group_id.clone())
            .ok_or(MirraError::NotFound)?;
        Ok(history
            .values()
            .filter(|record| record.group_id.as_deref() == Some(group_id.as_str()))
            .cloned()
            .collect())
    }

    async fn send_content(
        &self,
        target: i64,
        content: &OutboundContent,
        reply_to: Option<i64>,
    ) -> Result<i64, MirraError> {
        let mut inner = self.inner.lock().await;
        inner.check_scripted_failures(Some(content))?;
        let id = inner.alloc_id(target);
        inner.sent.push(SentMessage {
            target,
            id,
            content: Some(content.clone()),
            caption: content.caption.clone(),
            reply_to,
            via: SentVia::Single,
        });
        Ok(id)
    }

    async fn send_group(
        &self,
        target: i64,
        items: &[OutboundContent],
        reply_to: Option<i64>,
    ) -> Result<Vec<i64>, MirraError> {
        let mut inner = self.inner.lock().await;
        inner.check_scripted_failures(items.first())?;
        inner.send_group_calls += 1;
        let len = items.len();
        let mut ids = Vec::with_capacity(len);
        for (index, item) in items.iter().enumerate() {
            let id = inner.alloc_id(target);
            inner.sent.push(SentMessage {
                target,
                id,
                content: Some(item.clone()),
                caption: item.caption.clone(),
                reply_to,
                via: SentVia::GroupItem { index, len },
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn download(&self, message: &MessageRecord) -> Result<PathBuf, MirraError> {
        let path = self
            .scratch
            .path()
            .join(format!("{}_{}.bin", message.channel, message.id));
        std::fs::write(&path, b"media").map_err(|e| MirraError::Transport {
            message: format!("download failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        self.inner.lock().await.downloads.push(path.clone());
        Ok(path)
    }

    async fn upload(
        &self,
        target: i64,
        path: &Path,
        caption: Option<&FormattedText>,
        reply_to: Option<i64>,
    ) -> Result<i64, MirraError> {
        if !path.exists() {
            return Err(MirraError::transport(format!(
                "upload source missing: {}",
                path.display()
            )));
        }
        let mut inner = self.inner.lock().await;
        if let Some(wait) = inner.upload_failures.remove(path) {
            return Err(MirraError::RateLimited { retry_after: wait });
        }
        let id = inner.alloc_id(target);
        inner.sent.push(SentMessage {
            target,
            id,
            content: None,
            caption: caption.cloned(),
            reply_to,
            via: SentVia::Upload,
        });
        Ok(id)
    }

    async fn edit_text(
        &self,
        channel: i64,
        message_id: i64,
        text: &FormattedText,
    ) -> Result<(), MirraError> {
        self.inner.lock().await.edits.push((channel, message_id, text.clone()));
        Ok(())
    }

    async fn edit_caption(
        &self,
        channel: i64,
        message_id: i64,
        caption: &FormattedText,
    ) -> Result<(), MirraError> {
        self.inner
            .lock()
            .await
            .edits
            .push((channel, message_id, caption.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records;

    #[tokio::test]
    async fn history_pages_are_newest_first() {
        let transport = MockTransport::new();
        transport
            .seed_history(
                100,
                (1..=5).map(|id| records::text(100, id, "m")).collect(),
            )
            .await;

        let page = transport.fetch_history_page(100, None, 2).await.unwrap();
        assert_eq!(page.iter().map(|m| m.id).collect::<Vec<_>>(), vec![5, 4]);

        let page = transport.fetch_history_page(100, Some(4), 10).await.unwrap();
        assert_eq!(page.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn ids_allocate_monotonically_per_target() {
        let transport = MockTransport::new();
        let content = records::outbound_text("a");
        assert_eq!(transport.send_content(200, &content, None).await.unwrap(), 1);
        assert_eq!(transport.send_content(200, &content, None).await.unwrap(), 2);
        assert_eq!(transport.send_content(300, &content, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn scripted_rate_limit_fails_then_recovers() {
        let transport = MockTransport::new();
        transport
            .script_rate_limit(1, Duration::from_secs(3))
            .await;
        let content = records::outbound_text("a");

        let err = transport.send_content(200, &content, None).await.unwrap_err();
        assert!(matches!(err, MirraError::RateLimited { .. }));
        assert!(transport.send_content(200, &content, None).await.is_ok());
    }
}
