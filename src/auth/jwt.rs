//! Read-only JWT claim decoding. Signatures are not verified; the server does that.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid JWT format")]
    Format,
    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub scope: Option<String>,
    pub exp: Option<i64>,
}

pub fn decode_claims(token: &str) -> Result<Claims, Error> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next()) {
        (Some(_header), Some(payload)) if !payload.is_empty() => payload,
        _ => return Err(Error::Format),
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload).or_else(|_| {
        let padded = match payload.len() % 4 {
            2 => format!("{payload}=="),
            3 => format!("{payload}="),
            _ => payload.to_owned(),
        };
        STANDARD.decode(padded)
    })?;

    let claims = serde_json::from_slice(&bytes)?;
    Ok(claims)
}

/// `true` when the token carries an `exp` claim later than `now` (unix seconds).
pub fn is_valid_at(token: &str, now: i64) -> bool {
    match decode_claims(token) {
        Ok(Claims { exp: Some(exp), .. }) => exp > now,
        _ => false,
    }
}

/// Malformed tokens are reported as invalid rather than as errors.
pub fn is_valid(token: &str) -> bool {
    is_valid_at(token, unix_now())
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) fn encode_unsigned(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_claims() {
        let token = encode_unsigned(&json!({
            "sub": "ada@example.com",
            "scope": "ROLE_TEACHER ROLE_STUDENT",
            "exp": 2_000_000_000,
        }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("ada@example.com"));
        assert_eq!(claims.scope.as_deref(), Some("ROLE_TEACHER ROLE_STUDENT"));
        assert_eq!(claims.exp, Some(2_000_000_000));
    }

    #[test]
    fn accepts_padded_payload() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let payload = STANDARD.encode(br#"{"exp":10}"#);
        let token = format!("{header}.{payload}.sig");
        assert!(is_valid_at(&token, 9));
    }

    #[test]
    fn expiry_boundary() {
        let token = encode_unsigned(&json!({ "exp": 100 }));
        assert!(is_valid_at(&token, 99));
        assert!(!is_valid_at(&token, 100));
    }

    #[test]
    fn malformed_is_invalid() {
        assert!(!is_valid(""));
        assert!(!is_valid("not-a-jwt"));
        assert!(!is_valid("a.!!!.c"));
        assert!(!is_valid(&encode_unsigned(&json!({ "sub": "no-exp" }))));
    }
}
