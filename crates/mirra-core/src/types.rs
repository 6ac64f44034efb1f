// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Mirra replication engine.
//!
//! A channel is a messaging destination with its own monotonically
//! increasing message-id space. The engine works with resolved numeric
//! chat ids (`i64`) internally; [`ChannelRef`] is the canonical form used
//! at the configuration and CLI surface before resolution.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Canonical reference to a chat/channel: a resolved numeric id or a
/// normalized handle awaiting resolution against the channel directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelRef {
    Id(i64),
    Handle(String),
}

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelRef::Id(id) => write!(f, "{id}"),
            ChannelRef::Handle(h) => write!(f, "{h}"),
        }
    }
}

/// Information about a resolved channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: i64,
    pub title: Option<String>,
    pub handle: Option<String>,
}

/// Opaque platform file handle for a piece of media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef(pub String);

/// A formatting span inside message text, carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEntity {
    pub kind: String,
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub url: Option<String>,
}

/// Message text or caption together with its formatting spans.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormattedText {
    pub text: String,
    #[serde(default)]
    pub entities: Vec<TextEntity>,
}

impl FormattedText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entities: Vec::new(),
        }
    }
}

/// Poll payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollData {
    pub question: String,
    pub options: Vec<String>,
    pub is_anonymous: bool,
    pub allows_multiple_answers: bool,
    #[serde(default)]
    pub correct_option: Option<u32>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Shared contact payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactData {
    pub phone_number: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub vcard: Option<String>,
}

/// Geographic point payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub latitude: f64,
    pub longitude: f64,
}

/// Named venue payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueData {
    pub location: LocationData,
    pub title: String,
    pub address: String,
    #[serde(default)]
    pub foursquare_id: Option<String>,
}

/// Discriminant for [`MessageContent`], used for dispatch and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ContentKind {
    Text,
    Photo,
    Video,
    Document,
    Audio,
    Voice,
    VideoNote,
    Animation,
    Sticker,
    Poll,
    Contact,
    Location,
    Venue,
    Dice,
    Service,
}

/// The content of a single message, exactly one kind per message.
///
/// Grouped (album) membership is tracked separately on [`MessageRecord`]
/// via `group_id`, since any media kind may appear inside a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageContent {
    Text,
    Photo {
        media: MediaRef,
    },
    Video {
        media: MediaRef,
        duration: u32,
        width: u32,
        height: u32,
    },
    Document {
        media: MediaRef,
        file_name: Option<String>,
    },
    Audio {
        media: MediaRef,
        duration: u32,
        performer: Option<String>,
        title: Option<String>,
    },
    Voice {
        media: MediaRef,
    },
    VideoNote {
        media: MediaRef,
    },
    Animation {
        media: MediaRef,
        file_name: Option<String>,
    },
    Sticker {
        media: MediaRef,
    },
    Poll(PollData),
    Contact(ContactData),
    Location(LocationData),
    Venue(VenueData),
    Dice {
        emoji: String,
    },
    /// Service/system event (join, leave, pin, ...). Never replicated.
    Service,
}

impl MessageContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            MessageContent::Text => ContentKind::Text,
            MessageContent::Photo { .. } => ContentKind::Photo,
            MessageContent::Video { .. } => ContentKind::Video,
            MessageContent::Document { .. } => ContentKind::Document,
            MessageContent::Audio { .. } => ContentKind::Audio,
            MessageContent::Voice { .. } => ContentKind::Voice,
            MessageContent::VideoNote { .. } => ContentKind::VideoNote,
            MessageContent::Animation { .. } => ContentKind::Animation,
            MessageContent::Sticker { .. } => ContentKind::Sticker,
            MessageContent::Poll(_) => ContentKind::Poll,
            MessageContent::Contact(_) => ContentKind::Contact,
            MessageContent::Location(_) => ContentKind::Location,
            MessageContent::Venue(_) => ContentKind::Venue,
            MessageContent::Dice { .. } => ContentKind::Dice,
            MessageContent::Service => ContentKind::Service,
        }
    }

    pub fn is_service(&self) -> bool {
        matches!(self, MessageContent::Service)
    }

    /// The platform file handle, for kinds that carry one.
    pub fn media(&self) -> Option<&MediaRef> {
        match self {
            MessageContent::Photo { media }
            | MessageContent::Video { media, .. }
            | MessageContent::Document { media, .. }
            | MessageContent::Audio { media, .. }
            | MessageContent::Voice { media }
            | MessageContent::VideoNote { media }
            | MessageContent::Animation { media, .. }
            | MessageContent::Sticker { media } => Some(media),
            _ => None,
        }
    }
}

/// A normalized view of one platform message, as consumed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Resolved chat id of the channel this message lives in.
    pub channel: i64,
    /// Message id, monotonic within the channel, not globally unique.
    pub id: i64,
    pub content: MessageContent,
    /// Body text for `Text`, caption for media kinds.
    #[serde(default)]
    pub text: Option<FormattedText>,
    /// Id of the message this one replies to, in the same channel.
    #[serde(default)]
    pub reply_to: Option<i64>,
    /// Album id shared by all members of one media group.
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub outgoing: bool,
}

/// Content to be submitted as a freshly created message on the target.
///
/// Always a "create new message" operation, never a platform forward:
/// that is what removes attribution headers and permits caption rewriting.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundContent {
    pub content: MessageContent,
    pub caption: Option<FormattedText>,
}

/// One configured replication direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub source: ChannelRef,
    pub target: ChannelRef,
    #[serde(default = "default_rule_enabled")]
    pub enabled: bool,
}

fn default_rule_enabled() -> bool {
    true
}

/// Aggregate counters returned by one backfill invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackfillStats {
    pub processed: u64,
    pub cloned: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Replication statistics for one (source, target) pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PairStats {
    pub cloned_count: u64,
    pub last_cloned_at: Option<String>,
    pub last_synced_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ref_serde_is_untagged() {
        let id: ChannelRef = serde_json::from_str("-1001234567890").unwrap();
        assert_eq!(id, ChannelRef::Id(-1001234567890));

        let handle: ChannelRef = serde_json::from_str(r#""somechannel""#).unwrap();
        assert_eq!(handle, ChannelRef::Handle("somechannel".into()));

        assert_eq!(serde_json::to_string(&id).unwrap(), "-1001234567890");
    }

    #[test]
    fn content_kind_matches_variant() {
        let poll = MessageContent::Poll(PollData {
            question: "q".into(),
            options: vec!["a".into(), "b".into()],
            is_anonymous: true,
            allows_multiple_answers: false,
            correct_option: None,
            explanation: None,
        });
        assert_eq!(poll.kind(), ContentKind::Poll);
        assert_eq!(poll.kind().to_string(), "poll");
        assert!(poll.media().is_none());

        let photo = MessageContent::Photo {
            media: MediaRef("file-1".into()),
        };
        assert_eq!(photo.kind(), ContentKind::Photo);
        assert_eq!(photo.media().unwrap().0, "file-1");

        assert!(MessageContent::Service.is_service());
    }

    #[test]
    fn mapping_rule_defaults_to_enabled() {
        let rule: MappingRule =
            serde_json::from_str(r#"{"source": 100, "target": 200}"#).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.source, ChannelRef::Id(100));
    }
}
