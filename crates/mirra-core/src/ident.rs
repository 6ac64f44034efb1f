// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel identifier normalization.
//!
//! Accepts the forms operators actually paste: `@handle`, bare handles,
//! public `t.me` deep links, `+`-prefixed private invite links, and signed
//! numeric id strings. Best effort and infallible: input that matches no
//! rule is returned unchanged as a handle, deferring validity checking to
//! resolution against the channel directory.

use crate::types::ChannelRef;

/// Parse a raw channel reference into its canonical form.
pub fn normalize(raw: &str) -> ChannelRef {
    let mut s = raw.trim();

    // Strip protocol + host for t.me deep links, keeping the last path
    // segment. Private invite links keep their leading '+'. Query and
    // path handling applies to links only; anything else passes through
    // untouched.
    for prefix in ["https://t.me/", "http://t.me/", "t.me/"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest;
            if let Some((path, _query)) = s.split_once('?') {
                s = path;
            }
            s = s.trim_end_matches('/');
            if let Some((_, last)) = s.rsplit_once('/') {
                s = last;
            }
            break;
        }
    }

    s = s.strip_prefix('@').unwrap_or(s);

    if is_signed_digits(s)
        && let Ok(id) = s.parse::<i64>()
    {
        return ChannelRef::Id(id);
    }

    ChannelRef::Handle(s.to_string())
}

fn is_signed_digits(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_handle_passes_through() {
        assert_eq!(normalize("somechannel"), ChannelRef::Handle("somechannel".into()));
    }

    #[test]
    fn at_prefix_is_stripped() {
        assert_eq!(normalize("@somechannel"), ChannelRef::Handle("somechannel".into()));
    }

    #[test]
    fn public_deep_link() {
        assert_eq!(
            normalize("https://t.me/somechannel"),
            ChannelRef::Handle("somechannel".into())
        );
        assert_eq!(
            normalize("https://t.me/somechannel/"),
            ChannelRef::Handle("somechannel".into())
        );
    }

    #[test]
    fn private_invite_link_keeps_plus() {
        assert_eq!(
            normalize("https://t.me/+AbCdEf123"),
            ChannelRef::Handle("+AbCdEf123".into())
        );
    }

    #[test]
    fn query_string_is_dropped() {
        assert_eq!(
            normalize("https://t.me/somechannel?start=1"),
            ChannelRef::Handle("somechannel".into())
        );
    }

    #[test]
    fn numeric_ids() {
        assert_eq!(normalize("123456"), ChannelRef::Id(123456));
        assert_eq!(normalize("-1001234567890"), ChannelRef::Id(-1001234567890));
        assert_eq!(normalize(" -100500 "), ChannelRef::Id(-100500));
    }

    #[test]
    fn malformed_input_is_returned_unchanged() {
        assert_eq!(normalize("???!!!"), ChannelRef::Handle("???!!!".into()));
        assert_eq!(normalize(""), ChannelRef::Handle(String::new()));
        // A lone minus is not a number.
        assert_eq!(normalize("-"), ChannelRef::Handle("-".into()));
        // '?' and '/' only get special treatment inside t.me links.
        assert_eq!(normalize("what?ever"), ChannelRef::Handle("what?ever".into()));
        assert_eq!(normalize("a/b"), ChannelRef::Handle("a/b".into()));
    }

    #[test]
    fn deep_link_with_numeric_tail() {
        // A /c/ style link's last segment is numeric; best effort keeps it
        // as an id, which the directory lookup will validate.
        assert_eq!(normalize("https://t.me/c/1234/56"), ChannelRef::Id(56));
    }
}
