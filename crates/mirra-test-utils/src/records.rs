// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for message records used across engine tests.

use mirra_core::{
    FormattedText, MediaRef, MessageContent, MessageRecord, OutboundContent, PollData,
};

/// A plain text message.
pub fn text(channel: i64, id: i64, body: &str) -> MessageRecord {
    MessageRecord {
        channel,
        id,
        content: MessageContent::Text,
        text: Some(FormattedText::plain(body)),
        reply_to: None,
        group_id: None,
        edited: false,
        outgoing: false,
    }
}

/// A text message replying to another message in the same channel.
pub fn reply(channel: i64, id: i64, body: &str, reply_to: i64) -> MessageRecord {
    MessageRecord {
        reply_to: Some(reply_to),
        ..text(channel, id, body)
    }
}

/// A photo message with an opaque file handle and optional caption.
pub fn photo(channel: i64, id: i64, file_id: &str, caption: Option<&str>) -> MessageRecord {
    MessageRecord {
        channel,
        id,
        content: MessageContent::Photo {
            media: MediaRef(file_id.into()),
        },
        text: caption.map(FormattedText::plain),
        reply_to: None,
        group_id: None,
        edited: false,
        outgoing: false,
    }
}

/// One member of a media group (album).
pub fn album_photo(channel: i64, id: i64, file_id: &str, group_id: &str) -> MessageRecord {
    MessageRecord {
        group_id: Some(group_id.into()),
        ..photo(channel, id, file_id, None)
    }
}

/// A consecutive run of album members sharing one group id.
pub fn album(channel: i64, ids: std::ops::RangeInclusive<i64>, group_id: &str) -> Vec<MessageRecord> {
    ids.map(|id| album_photo(channel, id, &format!("file-{id}"), group_id))
        .collect()
}

/// A service message (join/leave/pin), which is never replicated.
pub fn service(channel: i64, id: i64) -> MessageRecord {
    MessageRecord {
        channel,
        id,
        content: MessageContent::Service,
        text: None,
        reply_to: None,
        group_id: None,
        edited: false,
        outgoing: false,
    }
}

/// A two-option anonymous poll.
pub fn poll(channel: i64, id: i64, question: &str) -> MessageRecord {
    MessageRecord {
        channel,
        id,
        content: MessageContent::Poll(PollData {
            question: question.into(),
            options: vec!["yes".into(), "no".into()],
            is_anonymous: true,
            allows_multiple_answers: false,
            correct_option: None,
            explanation: None,
        }),
        text: None,
        reply_to: None,
        group_id: None,
        edited: false,
        outgoing: false,
    }
}

/// Outbound plain-text content, as handed to a transport send.
pub fn outbound_text(body: &str) -> OutboundContent {
    OutboundContent {
        content: MessageContent::Text,
        caption: Some(FormattedText::plain(body)),
    }
}
