//! Path rewriting for metric labels.
//!
//! # Responsibilities
//! - Collapse identifiers out of a request path for shaped labels
//! - Pull the first numeric segment out of a path for bomb labels
//!
//! # Design Decisions
//! - Every maximal run of ASCII digits becomes `{id}`, wherever it sits
//! - Byte scanning, no regex, so both operations stay O(n)
//! - Paths without digits are returned borrowed and untouched

use std::borrow::Cow;

/// Replacement token for identifiers in shaped paths.
pub const ID_TOKEN: &str = "{id}";

/// Rewrite every digit run in `path` to [`ID_TOKEN`].
///
/// `/orders/123/items/7` becomes `/orders/{id}/items/{id}`. The result never
/// contains a digit, so applying it twice changes nothing.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if !path.bytes().any(|b| b.is_ascii_digit()) {
        return Cow::Borrowed(path);
    }

    let mut normalized = String::with_capacity(path.len() + ID_TOKEN.len());
    let mut in_run = false;
    for ch in path.chars() {
        if ch.is_ascii_digit() {
            if !in_run {
                normalized.push_str(ID_TOKEN);
                in_run = true;
            }
        } else {
            in_run = false;
            normalized.push(ch);
        }
    }
    Cow::Owned(normalized)
}

/// First digit run that starts a path segment.
///
/// `/users/42` yields `42`, `/orders/123abc` yields `123`, `/v2/users` yields
/// nothing because `2` does not start its segment.
pub fn extract_path_id(path: &str) -> Option<&str> {
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'/' {
            let start = i + 1;
            let end = bytes[start..]
                .iter()
                .position(|b| !b.is_ascii_digit())
                .map_or(bytes.len(), |offset| start + offset);
            if end > start {
                return Some(&path[start..end]);
            }
        }
        i += 1;
    }
    None
}
