//! Prefixed, URL-safe opaque identifiers. Each public ID is `<prefix>_<suffix>` where `suffix` is
//! drawn from 24 cryptographically random bytes, base64url-encoded without padding, then truncated
//! to a fixed length. Truncated-suffix collisions are treated as vanishingly rare; the storage
//! layer's unique index on `public_id` is the final authority and a duplicate insert gets a single
//! retry.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Suffix length per entity kind. 22 chars (the full un-truncated base64url encoding of 24 bytes)
/// for conversations/messages/responses, which see the highest cardinality; shorter for the rest.
const SUFFIX_LEN: usize = 22;

macro_rules! id_prefixes {
    ($($name:ident => $prefix:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum IdKind {
            $($name),+
        }

        impl IdKind {
            pub fn prefix(self) -> &'static str {
                match self {
                    $(Self::$name => $prefix),+
                }
            }

            pub const ALL: &'static [IdKind] = &[$(Self::$name),+];
        }
    };
}

id_prefixes! {
    Conversation => "conv",
    Item => "msg",
    Response => "resp",
    ApiKey => "key",
    User => "user",
    Organization => "org",
    Project => "proj",
    Provider => "prov",
}

/// Generates a new public ID of the given kind.
pub fn generate(kind: IdKind) -> String {
    format!("{}_{}", kind.prefix(), random_suffix())
}

fn random_suffix() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    let encoded = URL_SAFE_NO_PAD.encode(bytes);
    encoded.chars().take(SUFFIX_LEN).collect()
}

/// Validates `^<prefix>_[A-Za-z0-9_-]{1,64}$` for the given expected kind.
pub fn validate(kind: IdKind, id: &str) -> bool {
    let Some(suffix) = id.strip_prefix(kind.prefix()).and_then(|s| s.strip_prefix('_')) else {
        return false;
    };
    is_valid_suffix(suffix)
}

/// Validates the ID against any known prefix, returning the matched kind.
pub fn validate_any(id: &str) -> Option<IdKind> {
    let (prefix, rest) = id.split_once('_')?;
    if !is_valid_suffix(rest) {
        return None;
    }
    IdKind::ALL.iter().copied().find(|kind| kind.prefix() == prefix)
}

fn is_valid_suffix(suffix: &str) -> bool {
    if suffix.is_empty() || suffix.len() > 64 {
        return false;
    }
    suffix
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Opaque correlation ID attached to `internal` errors for log correlation.
pub fn new_correlation_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_validate_round_trips_for_every_prefix() {
        for &kind in IdKind::ALL {
            let id = generate(kind);
            assert!(id.starts_with(kind.prefix()));
            assert!(validate(kind, &id), "failed to validate {id}");
        }
    }

    #[test]
    fn validate_rejects_empty_suffix() {
        assert!(!validate(IdKind::Conversation, "conv_"));
    }

    #[test]
    fn validate_rejects_wrong_prefix() {
        let id = generate(IdKind::Conversation);
        assert!(!validate(IdKind::User, &id));
    }

    #[test]
    fn validate_rejects_bad_characters() {
        assert!(!validate(IdKind::Conversation, "conv_abc def"));
        assert!(!validate(IdKind::Conversation, "conv_abc/def"));
    }

    #[test]
    fn validate_any_finds_matching_kind() {
        let id = generate(IdKind::Response);
        assert_eq!(validate_any(&id), Some(IdKind::Response));
    }

    #[test]
    fn two_generated_ids_are_distinct() {
        assert_ne!(generate(IdKind::Item), generate(IdKind::Item));
    }
}
