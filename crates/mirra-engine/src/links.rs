// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intra-channel link rewriting.
//!
//! Private-channel message links have the form `t.me/c/<internal>/<msg>`,
//! where `<internal>` is the channel id without its `-100` marker prefix.
//! When a replicated message links to another message of the same source
//! channel, and that message has already been replicated to the same
//! target, the link is rewritten to point at the target copy. Links to
//! other channels or to unreplicated messages pass through untouched.

use std::sync::LazyLock;

use regex::Regex;

use mirra_core::{FormattedText, MirraError};
use mirra_storage::{Database, queries};

static MESSAGE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:https?://)?t\.me/c/(\d+)/(\d+)").expect("valid regex"));

const MARKED_BASE: i64 = 1_000_000_000_000;

/// Marked chat id for a link-form internal id: `-100xxxxxxxxxx`.
pub fn marked_from_internal(internal: i64) -> i64 {
    -(MARKED_BASE + internal)
}

/// Link-form internal id for a marked chat id, if it has one.
pub fn internal_from_marked(marked: i64) -> Option<i64> {
    let internal = -marked - MARKED_BASE;
    (marked < -MARKED_BASE && internal > 0).then_some(internal)
}

/// Rewrite same-channel message links in text and entity urls.
///
/// Text rewrites shift the offsets of later entities by the length delta
/// so formatting spans stay aligned.
pub async fn rewrite_links(
    db: &Database,
    source_chat: i64,
    target_chat: i64,
    text: &FormattedText,
) -> Result<FormattedText, MirraError> {
    let mut out = text.clone();

    let Some(target_internal) = internal_from_marked(target_chat) else {
        return Ok(out);
    };

    // Body text first. Matches are collected up front since replacements
    // need async mapping lookups.
    let matches: Vec<(usize, usize, i64, i64)> = MESSAGE_LINK
        .captures_iter(&out.text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let internal: i64 = caps.get(1)?.as_str().parse().ok()?;
            let msg_id: i64 = caps.get(2)?.as_str().parse().ok()?;
            Some((whole.start(), whole.end(), internal, msg_id))
        })
        .collect();

    let mut delta: i64 = 0;
    for (start, end, internal, msg_id) in matches {
        if marked_from_internal(internal) != source_chat {
            continue;
        }
        let Some(target_msg) = queries::mappings::get_mapping(db, source_chat, msg_id, target_chat).await?
        else {
            continue;
        };

        let replacement = format!("https://t.me/c/{target_internal}/{target_msg}");
        let start = (start as i64 + delta) as usize;
        let end = (end as i64 + delta) as usize;
        let shift = replacement.len() as i64 - (end - start) as i64;
        out.text.replace_range(start..end, &replacement);

        for entity in &mut out.entities {
            if entity.offset >= end {
                entity.offset = (entity.offset as i64 + shift) as usize;
            }
        }
        delta += shift;
    }

    // Entity urls (text_link spans) carry their own copies of the link.
    for entity in &mut out.entities {
        if let Some(url) = entity.url.clone()
            && let Some(rewritten) = rewrite_url(db, source_chat, target_chat, target_internal, &url).await?
        {
            entity.url = Some(rewritten);
        }
    }

    Ok(out)
}

async fn rewrite_url(
    db: &Database,
    source_chat: i64,
    target_chat: i64,
    target_internal: i64,
    url: &str,
) -> Result<Option<String>, MirraError> {
    let Some(caps) = MESSAGE_LINK.captures(url) else {
        return Ok(None);
    };
    let internal: i64 = match caps[1].parse() {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };
    let msg_id: i64 = match caps[2].parse() {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };
    if marked_from_internal(internal) != source_chat {
        return Ok(None);
    }
    let Some(target_msg) = queries::mappings::get_mapping(db, source_chat, msg_id, target_chat).await?
    else {
        return Ok(None);
    };
    let whole = caps.get(0).expect("match");
    let mut rewritten = url.to_string();
    rewritten.replace_range(
        whole.start()..whole.end(),
        &format!("https://t.me/c/{target_internal}/{target_msg}"),
    );
    Ok(Some(rewritten))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirra_core::TextEntity;
    use tempfile::tempdir;

    const SOURCE: i64 = marked_from_internal_const(1111);
    const TARGET: i64 = marked_from_internal_const(2222);

    const fn marked_from_internal_const(internal: i64) -> i64 {
        -(MARKED_BASE + internal)
    }

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    #[test]
    fn marked_internal_round_trip() {
        assert_eq!(marked_from_internal(1234567890), -1001234567890);
        assert_eq!(internal_from_marked(-1001234567890), Some(1234567890));
        // Plain group ids and user ids have no link form.
        assert_eq!(internal_from_marked(-12345), None);
        assert_eq!(internal_from_marked(12345), None);
    }

    #[tokio::test]
    async fn mapped_same_channel_link_is_rewritten() {
        let (db, _dir) = setup_db().await;
        queries::mappings::put_mapping(&db, SOURCE, 7, TARGET, 70)
            .await
            .unwrap();

        let text = FormattedText::plain("see https://t.me/c/1111/7 for details");
        let out = rewrite_links(&db, SOURCE, TARGET, &text).await.unwrap();
        assert_eq!(out.text, "see https://t.me/c/2222/70 for details");
    }

    #[tokio::test]
    async fn unmapped_and_foreign_links_pass_through() {
        let (db, _dir) = setup_db().await;

        // No mapping for message 7, and 9999 is a different channel.
        let text = FormattedText::plain("t.me/c/1111/7 and t.me/c/9999/3");
        let out = rewrite_links(&db, SOURCE, TARGET, &text).await.unwrap();
        assert_eq!(out.text, text.text);
    }

    #[tokio::test]
    async fn entity_offsets_shift_with_text_rewrites() {
        let (db, _dir) = setup_db().await;
        queries::mappings::put_mapping(&db, SOURCE, 7, TARGET, 70)
            .await
            .unwrap();

        // "t.me/c/1111/7 tail" with a bold span over "tail".
        let text = FormattedText {
            text: "t.me/c/1111/7 tail".into(),
            entities: vec![TextEntity {
                kind: "bold".into(),
                offset: 14,
                length: 4,
                url: None,
            }],
        };
        let out = rewrite_links(&db, SOURCE, TARGET, &text).await.unwrap();
        assert_eq!(out.text, "https://t.me/c/2222/70 tail");
        assert_eq!(out.entities[0].offset, out.text.len() - 4);
    }

    #[tokio::test]
    async fn entity_urls_are_rewritten() {
        let (db, _dir) = setup_db().await;
        queries::mappings::put_mapping(&db, SOURCE, 7, TARGET, 70)
            .await
            .unwrap();

        let text = FormattedText {
            text: "here".into(),
            entities: vec![TextEntity {
                kind: "text_link".into(),
                offset: 0,
                length: 4,
                url: Some("https://t.me/c/1111/7".into()),
            }],
        };
        let out = rewrite_links(&db, SOURCE, TARGET, &text).await.unwrap();
        assert_eq!(
            out.entities[0].url.as_deref(),
            Some("https://t.me/c/2222/70")
        );
    }
}
