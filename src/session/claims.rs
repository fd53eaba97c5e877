use base64::Engine as _;
use serde::Deserialize;

use super::AuthError;

/// The identity-token claims the dashboard reads.
///
/// The signature is not checked here: the token came straight from the
/// identity provider over TLS, and the Record Service verifies it on every
/// call.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    pub email: Option<String>,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl IdTokenClaims {
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let mut parts = token.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(AuthError::MalformedToken(
                    "expected three dot-separated segments".into(),
                ))
            }
        };

        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::MalformedToken(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken(e.to_string()))
    }

    /// Whether the token is still usable `skew_secs` from `now`.
    pub fn is_fresh(&self, now: chrono::DateTime<chrono::Utc>, skew_secs: i64) -> bool {
        self.exp > now.timestamp() + skew_secs
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Unsigned JWT carrying `payload_json`.
    pub(crate) fn fake_jwt(payload_json: &str) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.sig",
            engine.encode(r#"{"alg":"none"}"#),
            engine.encode(payload_json)
        )
    }

    #[test]
    fn decodes_email_and_expiry() {
        let token = fake_jwt(r#"{"email":"lab@example.com","exp":1700000000,"sub":"x"}"#);
        let claims = IdTokenClaims::decode(&token).unwrap();
        assert_eq!(claims.email.as_deref(), Some("lab@example.com"));
        assert_eq!(claims.exp, 1_700_000_000);
    }

    #[test]
    fn tolerates_padded_payload() {
        let engine = base64::engine::general_purpose::URL_SAFE;
        let token = format!("h.{}.s", engine.encode(r#"{"exp":1}"#));
        assert_eq!(IdTokenClaims::decode(&token).unwrap().exp, 1);
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(matches!(
            IdTokenClaims::decode("only.two"),
            Err(AuthError::MalformedToken(_))
        ));
        assert!(matches!(
            IdTokenClaims::decode("a.b.c.d"),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn rejects_non_json_payload() {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let token = format!("h.{}.s", engine.encode("not json"));
        assert!(IdTokenClaims::decode(&token).is_err());
    }

    #[test]
    fn freshness_respects_skew() {
        let claims = IdTokenClaims {
            email: None,
            exp: 1_000,
        };
        let now = chrono::Utc.timestamp_opt(900, 0).unwrap();
        assert!(claims.is_fresh(now, 60));
        assert!(!claims.is_fresh(now, 100));
    }
}
