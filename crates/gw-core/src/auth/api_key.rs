//! API-key half of the principal resolver.

use gw_common::OwnerKind;
use gw_storage::ApiKeyRecord;

pub fn owner_kind_of(record: &ApiKeyRecord) -> Option<OwnerKind> {
    match record.owner_kind.as_str() {
        "user" => Some(OwnerKind::User),
        "admin" => Some(OwnerKind::Admin),
        "project" => Some(OwnerKind::Project),
        "ephemeral" => Some(OwnerKind::Ephemeral),
        _ => None,
    }
}

/// Extracts the bearer token from an `Authorization` header value, whichever scheme it carries —
/// the resolver itself decides whether to try it as a JWT or an API key.
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    let trimmed = header_value.trim();
    trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_token_case_insensitively() {
        assert_eq!(extract_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("Basic abc123"), None);
    }
}
