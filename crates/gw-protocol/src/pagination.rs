//! Opaque cursor encoding for list endpoints. A cursor is the base64url-no-pad encoding of the last
//! surrogate `id` returned, plus the sort order it was issued under, so a client cannot silently
//! flip direction mid-pagination.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn tag(self) -> char {
        match self {
            Self::Asc => 'a',
            Self::Desc => 'd',
        }
    }
}

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

/// Clamp a client-supplied limit into `[1, MAX_LIMIT]`, defaulting to `DEFAULT_LIMIT` when absent.
pub fn clamp_limit(requested: Option<u64>) -> u64 {
    match requested {
        None => DEFAULT_LIMIT,
        Some(0) => DEFAULT_LIMIT,
        Some(n) => n.min(MAX_LIMIT),
    }
}

pub fn encode_cursor(last_id: i64, order: SortOrder) -> String {
    let raw = format!("{}:{}", order.tag(), last_id);
    URL_SAFE_NO_PAD.encode(raw)
}

/// Decodes a cursor previously produced by [`encode_cursor`]. Returns `None` for malformed input
/// rather than erroring: an invalid cursor is treated as "start from the beginning" by the caller,
/// per the `invalidRequest` vs. silently-resetting tradeoff this API makes for robustness against
/// stale client-cached cursors.
pub fn decode_cursor(cursor: &str) -> Option<(i64, SortOrder)> {
    let bytes = URL_SAFE_NO_PAD.decode(cursor).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (tag, id_str) = text.split_once(':')?;
    let order = match tag {
        "a" => SortOrder::Asc,
        "d" => SortOrder::Desc,
        _ => return None,
    };
    let id = id_str.parse::<i64>().ok()?;
    Some((id, order))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let cursor = encode_cursor(42, SortOrder::Desc);
        assert_eq!(decode_cursor(&cursor), Some((42, SortOrder::Desc)));
    }

    #[test]
    fn malformed_cursor_decodes_to_none() {
        assert_eq!(decode_cursor("not-a-cursor!!"), None);
    }

    #[test]
    fn limit_clamps_to_max() {
        assert_eq!(clamp_limit(Some(500)), MAX_LIMIT);
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), DEFAULT_LIMIT);
    }
}
