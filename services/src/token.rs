//! Rotating check-in token codec.
//!
//! A token carries `(session_id, rotation_slot, secret)` as an opaque,
//! URL-safe string. The encoding provides transport convenience, not
//! confidentiality: authorization rests entirely on the embedded secret
//! matching the session's current secret. Slot freshness is not checked at
//! validation time; the slot exists so displayed QR codes visibly rotate
//! and stale screenshots age out of circulation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};

use crate::error::AttendanceError;

/// Fixed rotation interval for minted tokens.
pub const ROTATION_INTERVAL_SECS: i64 = 10;

/// Decoded contents of a rotating token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub session_id: i64,
    pub rotation_slot: i64,
    pub secret: String,
}

/// Rotation slot for a point in time: `floor(unix / 10s)`.
pub fn rotation_slot(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(ROTATION_INTERVAL_SECS)
}

/// Encodes a token for the given session at the given time.
pub fn encode_token(session_id: i64, secret: &str, now: DateTime<Utc>) -> String {
    let raw = format!("{}.{}.{}", session_id, rotation_slot(now), secret);
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

/// Decodes a token back into its claims.
///
/// Fails with [`AttendanceError::MalformedToken`] whenever the string does
/// not parse back into the `(session_id, slot, secret)` triple.
pub fn decode_token(token: &str) -> Result<TokenClaims, AttendanceError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|_| AttendanceError::MalformedToken)?;
    let raw = String::from_utf8(bytes).map_err(|_| AttendanceError::MalformedToken)?;

    let mut parts = raw.splitn(3, '.');
    let session_id = parts
        .next()
        .and_then(|p| p.parse::<i64>().ok())
        .ok_or(AttendanceError::MalformedToken)?;
    let rotation_slot = parts
        .next()
        .and_then(|p| p.parse::<i64>().ok())
        .ok_or(AttendanceError::MalformedToken)?;
    let secret = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or(AttendanceError::MalformedToken)?
        .to_owned();

    Ok(TokenClaims {
        session_id,
        rotation_slot,
        secret,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn roundtrip_preserves_claims() {
        let now = Utc.with_ymd_and_hms(2026, 8, 20, 10, 0, 14).unwrap();
        let token = encode_token(42, "s3cret", now);
        let claims = decode_token(&token).unwrap();
        assert_eq!(claims.session_id, 42);
        assert_eq!(claims.rotation_slot, rotation_slot(now));
        assert_eq!(claims.secret, "s3cret");
    }

    #[test]
    fn slot_advances_across_interval_boundary() {
        let t1 = Utc.with_ymd_and_hms(2026, 8, 20, 10, 0, 9).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 8, 20, 10, 0, 10).unwrap();
        assert_eq!(rotation_slot(t2), rotation_slot(t1) + 1);
        // tokens differ across the boundary even with the same secret
        assert_ne!(encode_token(1, "x", t1), encode_token(1, "x", t2));
    }

    #[test]
    fn secret_may_contain_dots() {
        let now = Utc::now();
        let token = encode_token(7, "a.b.c", now);
        let claims = decode_token(&token).unwrap();
        assert_eq!(claims.secret, "a.b.c");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            decode_token("not base64 at all!!!"),
            Err(AttendanceError::MalformedToken)
        ));
    }

    #[test]
    fn rejects_wrong_shape() {
        // valid base64, wrong contents
        let raw = URL_SAFE_NO_PAD.encode("just-one-field".as_bytes());
        assert!(matches!(
            decode_token(&raw),
            Err(AttendanceError::MalformedToken)
        ));

        let raw = URL_SAFE_NO_PAD.encode("12.not-a-slot.secret".as_bytes());
        assert!(matches!(
            decode_token(&raw),
            Err(AttendanceError::MalformedToken)
        ));

        let raw = URL_SAFE_NO_PAD.encode("12.99.".as_bytes());
        assert!(matches!(
            decode_token(&raw),
            Err(AttendanceError::MalformedToken)
        ));
    }
}
