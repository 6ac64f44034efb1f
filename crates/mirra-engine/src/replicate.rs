// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message transcription: clone one source message into a target channel.
//!
//! Every clone is submitted as a freshly created message, never a
//! platform forward, so no attribution header appears on the target.
//! The mapping table is consulted before any send and written after
//! every successful one, which makes `replicate_message` idempotent:
//! re-running it for an already-replicated message performs no send.
//!
//! Media groups are dispatched atomically: the first member encountered
//! triggers one multi-item send covering the whole group, and mappings
//! for all members are recorded together. Later members short-circuit.

use std::time::Duration;

use tracing::{debug, info, warn};

use mirra_core::{FormattedText, MessageRecord, MirraError, OutboundContent};
use mirra_storage::queries;

use crate::links::rewrite_links;
use crate::Engine;

/// Why a message was skipped rather than cloned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Service/system event; never replicated.
    Service,
    /// Another member of the same media group is dispatching it.
    GroupMember,
    /// The platform reported the message vanished or empty mid-send.
    Empty,
}

/// Result of one replication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicateOutcome {
    /// A new clone was sent and mapped.
    Cloned { target_msg: i64 },
    /// A mapping row already existed; no send happened. Carries the
    /// previously recorded target id, so retried invocations observe
    /// the same result as the first.
    Existing { target_msg: i64 },
    Skipped(SkipReason),
}

impl ReplicateOutcome {
    pub fn is_cloned(&self) -> bool {
        matches!(self, Self::Cloned { .. })
    }

    /// The target-side message id, for outcomes that have one.
    pub fn target_msg(&self) -> Option<i64> {
        match self {
            Self::Cloned { target_msg } | Self::Existing { target_msg } => Some(*target_msg),
            Self::Skipped(_) => None,
        }
    }
}

impl Engine {
    /// Clone `record` into `target_chat`, if it has not been cloned yet.
    ///
    /// Returns `Err` only for failures worth surfacing to the caller:
    /// storage errors, transport errors, and rate limits that survived
    /// the bounded retry loop. Skips are part of the `Ok` domain.
    pub async fn replicate_message(
        &self,
        target_chat: i64,
        record: &MessageRecord,
    ) -> Result<ReplicateOutcome, MirraError> {
        let source_chat = record.channel;

        if record.content.is_service() {
            debug!(source = source_chat, msg = record.id, "skipping service message");
            return Ok(ReplicateOutcome::Skipped(SkipReason::Service));
        }

        if let Some(target_msg) =
            queries::mappings::get_mapping(&self.db, source_chat, record.id, target_chat).await?
        {
            return Ok(ReplicateOutcome::Existing { target_msg });
        }

        // Reply preservation: point the clone at the target-side copy of
        // the replied-to message. When that message was never replicated
        // the clone is sent without the reply link.
        let reply_to = match record.reply_to {
            Some(source_reply) => {
                let mapped =
                    queries::mappings::get_mapping(&self.db, source_chat, source_reply, target_chat)
                        .await?;
                if mapped.is_none() {
                    debug!(
                        source = source_chat,
                        msg = record.id,
                        reply_to = source_reply,
                        "reply target not replicated, dropping reply link"
                    );
                }
                mapped
            }
            None => None,
        };

        let outcome = if record.group_id.is_some() {
            self.replicate_group(target_chat, record, reply_to).await?
        } else {
            self.replicate_single(target_chat, record, reply_to).await?
        };

        if let ReplicateOutcome::Cloned { target_msg } = outcome {
            info!(
                source = source_chat,
                msg = record.id,
                target = target_chat,
                target_msg,
                kind = %record.content.kind(),
                "cloned message"
            );
        }
        Ok(outcome)
    }

    async fn replicate_single(
        &self,
        target_chat: i64,
        record: &MessageRecord,
        reply_to: Option<i64>,
    ) -> Result<ReplicateOutcome, MirraError> {
        let source_chat = record.channel;
        let outbound = self.transcribe(target_chat, record).await?;

        let mut attempts = 0u32;
        let result = loop {
            match self
                .transport
                .send_content(target_chat, &outbound, reply_to)
                .await
            {
                Err(MirraError::RateLimited { retry_after }) if attempts < self.config.max_retries => {
                    attempts += 1;
                    self.pause_after_rate_limit(source_chat, record.id, attempts, retry_after)
                        .await;
                }
                other => break other,
            }
        };

        let target_msg = match result {
            Ok(id) => id,
            Err(e) if e.is_forward_restricted() => {
                self.resend_as_upload(target_chat, record, outbound.caption.as_ref(), reply_to)
                    .await?
            }
            Err(e) if e.is_not_found() => {
                debug!(source = source_chat, msg = record.id, "message vanished mid-send");
                return Ok(ReplicateOutcome::Skipped(SkipReason::Empty));
            }
            Err(e) => return Err(e),
        };

        queries::mappings::put_mapping(&self.db, source_chat, record.id, target_chat, target_msg)
            .await?;
        Ok(ReplicateOutcome::Cloned { target_msg })
    }

    async fn replicate_group(
        &self,
        target_chat: i64,
        record: &MessageRecord,
        reply_to: Option<i64>,
    ) -> Result<ReplicateOutcome, MirraError> {
        let source_chat = record.channel;
        let group_id = record.group_id.as_deref().unwrap_or_default();
        let key = format!("{source_chat}_{group_id}_{target_chat}");

        {
            let mut cache = self.group_cache.lock().await;
            if !cache.insert(key.clone()) {
                return Ok(ReplicateOutcome::Skipped(SkipReason::GroupMember));
            }
        }

        let dispatched = self
            .dispatch_group(target_chat, record, reply_to)
            .await;

        match dispatched {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // Undo the reservation so a later member can retry.
                self.group_cache.lock().await.remove(&key);
                if e.is_not_found() {
                    return Ok(ReplicateOutcome::Skipped(SkipReason::Empty));
                }
                Err(e)
            }
        }
    }

    /// Send the whole media group containing `record` as one atomic
    /// multi-item send and record mappings for every member.
    async fn dispatch_group(
        &self,
        target_chat: i64,
        record: &MessageRecord,
        reply_to: Option<i64>,
    ) -> Result<ReplicateOutcome, MirraError> {
        let source_chat = record.channel;
        let members = self.transport.fetch_group(source_chat, record.id).await?;
        if members.is_empty() {
            return Err(MirraError::NotFound);
        }

        let mut items = Vec::with_capacity(members.len());
        for member in &members {
            items.push(self.transcribe(target_chat, member).await?);
        }

        let mut attempts = 0u32;
        let result = loop {
            match self.transport.send_group(target_chat, &items, reply_to).await {
                Err(MirraError::RateLimited { retry_after }) if attempts < self.config.max_retries => {
                    attempts += 1;
                    self.pause_after_rate_limit(source_chat, record.id, attempts, retry_after)
                        .await;
                }
                other => break other,
            }
        };

        let ids = match result {
            Ok(ids) => {
                if ids.len() != members.len() {
                    return Err(MirraError::Internal(format!(
                        "group send returned {} ids for {} members",
                        ids.len(),
                        members.len()
                    )));
                }
                for (member, target_msg) in members.iter().zip(&ids) {
                    queries::mappings::put_mapping(
                        &self.db,
                        source_chat,
                        member.id,
                        target_chat,
                        *target_msg,
                    )
                    .await?;
                }
                ids
            }
            Err(e) if e.is_forward_restricted() => {
                // Restricted groups lose atomicity: members are uploaded
                // one by one from freshly downloaded copies, each mapped
                // as soon as it lands. A fallback interrupted partway
                // resumes here without re-posting the mapped members.
                let mut ids = Vec::with_capacity(members.len());
                for (member, item) in members.iter().zip(&items) {
                    if let Some(existing) = queries::mappings::get_mapping(
                        &self.db,
                        source_chat,
                        member.id,
                        target_chat,
                    )
                    .await?
                    {
                        ids.push(existing);
                        continue;
                    }
                    let id = self
                        .resend_as_upload(target_chat, member, item.caption.as_ref(), reply_to)
                        .await?;
                    queries::mappings::put_mapping(&self.db, source_chat, member.id, target_chat, id)
                        .await?;
                    ids.push(id);
                }
                ids
            }
            Err(e) => return Err(e),
        };

        let target_msg = members
            .iter()
            .position(|m| m.id == record.id)
            .map(|i| ids[i])
            .unwrap_or(ids[0]);
        Ok(ReplicateOutcome::Cloned { target_msg })
    }

    /// Build the outbound content for one message: same content kind and
    /// payload, with same-channel message links rewritten in the caption.
    async fn transcribe(
        &self,
        target_chat: i64,
        record: &MessageRecord,
    ) -> Result<OutboundContent, MirraError> {
        let caption = match &record.text {
            Some(text) => Some(rewrite_links(&self.db, record.channel, target_chat, text).await?),
            None => None,
        };
        Ok(OutboundContent {
            content: record.content.clone(),
            caption,
        })
    }

    /// Forwarding-restricted fallback: download the media to ephemeral
    /// storage, upload it as a fresh asset, and delete the local file
    /// whether or not the upload succeeded.
    async fn resend_as_upload(
        &self,
        target_chat: i64,
        record: &MessageRecord,
        caption: Option<&FormattedText>,
        reply_to: Option<i64>,
    ) -> Result<i64, MirraError> {
        info!(
            source = record.channel,
            msg = record.id,
            "source restricts forwarding, falling back to download and re-upload"
        );
        let path = self.transport.download(record).await?;
        let sent = self
            .transport
            .upload(target_chat, &path, caption, reply_to)
            .await;
        if let Err(e) = std::fs::remove_file(&path) {
            debug!(path = %path.display(), error = %e, "could not remove downloaded media");
        }
        sent
    }

    async fn pause_after_rate_limit(
        &self,
        source_chat: i64,
        msg_id: i64,
        attempt: u32,
        retry_after: Duration,
    ) {
        let wait = retry_after + Duration::from_secs(self.config.flood_margin_secs);
        warn!(
            source = source_chat,
            msg = msg_id,
            attempt,
            wait_secs = wait.as_secs(),
            "rate limited, pausing before retry"
        );
        tokio::time::sleep(wait).await;
    }
}
