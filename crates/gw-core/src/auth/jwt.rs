//! JWT half of the principal resolver. Verifies a symmetric-secret bearer JWT and extracts `{sub,
//! email, name, exp}`.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: i64,
}

pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Returns `None` on any verification failure (expired, bad signature, malformed) — the resolver
    /// falls through to the API-key middleware rather than failing outright.
    pub fn verify(&self, token: &str) -> Option<JwtClaims> {
        decode::<JwtClaims>(token, &self.key, &self.validation)
            .ok()
            .map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, exp: i64) -> String {
        let claims = JwtClaims {
            sub: "user_abc".to_string(),
            email: Some("a@example.com".to_string()),
            name: None,
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn verifies_a_well_formed_token() {
        let future = time::OffsetDateTime::now_utc().unix_timestamp() + 3600;
        let verifier = JwtVerifier::new("shh");
        let claims = verifier.verify(&token("shh", future)).unwrap();
        assert_eq!(claims.sub, "user_abc");
    }

    #[test]
    fn rejects_wrong_secret() {
        let future = time::OffsetDateTime::now_utc().unix_timestamp() + 3600;
        let verifier = JwtVerifier::new("shh");
        assert!(verifier.verify(&token("different", future)).is_none());
    }

    #[test]
    fn rejects_expired_token() {
        let past = time::OffsetDateTime::now_utc().unix_timestamp() - 3600;
        let verifier = JwtVerifier::new("shh");
        assert!(verifier.verify(&token("shh", past)).is_none());
    }
}
