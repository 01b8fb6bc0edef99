//! Identifier validation
//!
//! Recognizes the YouTube address forms the caption source accepts:
//! watch, embed, `v/`, shorts and `youtu.be` short links, with or without
//! scheme and with an optional `www.` or `m.` subdomain.

fn address_regex() -> &'static regex::Regex {
    regex!(
        r"^(?:(?:https?:)?//)?(?:(?:www|m)\.)?(?:youtube(?:-nocookie)?\.com|youtu\.be)/(?:watch\?v=|embed/|v/|shorts/)?([A-Za-z0-9_-]{11})"
    )
}

/// Check whether `identifier` is a supported video address.
pub fn validate(identifier: &str) -> bool {
    address_regex().is_match(identifier.trim())
}

/// Extract the 11 character video id, if the address is supported.
pub fn video_id(identifier: &str) -> Option<&str> {
    address_regex()
        .captures(identifier.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
