//! Stateless access tokens in the JSON Web Token format, signed with HMAC-SHA256.

use crate::config::Config;
use crate::model::enums::Rol;
use crate::model::user::User;
use crate::time::DateTime;
use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use time::Duration;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token algorithm is not supported")]
    UnsupportedAlgorithm,
    #[error("Token has expired")]
    Expired,
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Token signing key is invalid")]
    InvalidKey(#[from] hmac::digest::InvalidLength),
    #[error("Token is malformed")]
    Malformed,
    #[error(transparent)]
    Encoding(#[from] base64::DecodeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the token's owner.
    pub sub: String,
    pub user_id: i64,
    pub rol: Rol,
    /// Expiration as seconds since the Unix epoch.
    pub exp: i64,
}

impl Claims {
    pub fn for_user(user: &User, lifetime: Duration, now: DateTime) -> Self {
        Self {
            sub: user.username.clone(),
            user_id: user.id,
            rol: user.rol,
            exp: (now + lifetime).unix_timestamp(),
        }
    }
}

/// Creates an access token for `user` that expires after the configured lifetime.
pub fn create_access_token(config: &Config, user: &User) -> Result<String, TokenError> {
    let claims = Claims::for_user(user, Duration::minutes(config.token.expire_minutes), DateTime::now());
    encode(config.token.secret.as_bytes(), &claims)
}

/// Validates `token` and returns its claims.
pub fn decode_access_token(config: &Config, token: &str) -> Result<Claims, TokenError> {
    decode(config.token.secret.as_bytes(), token, DateTime::now())
}

pub fn encode(secret: &[u8], claims: &Claims) -> Result<String, TokenError> {
    let header = Header {
        alg: String::from(ALGORITHM),
        typ: String::from("JWT"),
    };
    let header = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
    let payload = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header}.{payload}");

    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = BASE64_URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{signing_input}.{signature}"))
}

/// Decodes `token`, checking its signature and that it hasn't expired at `now`.
pub fn decode(secret: &[u8], token: &str, now: DateTime) -> Result<Claims, TokenError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let decoded_header: Header = serde_json::from_slice(&BASE64_URL_SAFE_NO_PAD.decode(header)?)?;
    if decoded_header.alg != ALGORITHM {
        return Err(TokenError::UnsupportedAlgorithm);
    }

    let signature = BASE64_URL_SAFE_NO_PAD.decode(signature)?;
    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).map_err(|_| TokenError::InvalidSignature)?;

    let claims: Claims = serde_json::from_slice(&BASE64_URL_SAFE_NO_PAD.decode(payload)?)?;
    if claims.exp <= now.unix_timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

#[cfg(test)]
mod test {
    use super::*;
    use time::macros::datetime;

    const SECRET: &[u8] = b"test-token-secret";

    fn claims(exp: i64) -> Claims {
        Claims {
            sub: String::from("recepcion"),
            user_id: 7,
            rol: Rol::Recepcion,
            exp,
        }
    }

    #[test]
    fn round_trip() {
        let now: DateTime = datetime!(2025-05-01 12:00 UTC).into();
        let expected = claims(now.unix_timestamp() + 1800);
        let token = encode(SECRET, &expected).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(decode(SECRET, &token, now).unwrap(), expected);
    }

    #[test]
    fn expiry() {
        let now: DateTime = datetime!(2025-05-01 12:00 UTC).into();
        let token = encode(SECRET, &claims(now.unix_timestamp())).unwrap();
        assert!(matches!(decode(SECRET, &token, now), Err(TokenError::Expired)));
        let token = encode(SECRET, &claims(now.unix_timestamp() + 1)).unwrap();
        assert!(decode(SECRET, &token, now).is_ok());
    }

    #[test]
    fn wrong_secret() {
        let now: DateTime = datetime!(2025-05-01 12:00 UTC).into();
        let token = encode(SECRET, &claims(now.unix_timestamp() + 60)).unwrap();
        assert!(matches!(decode(b"another-secret", &token, now), Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn tampered_payload() {
        let now: DateTime = datetime!(2025-05-01 12:00 UTC).into();
        let token = encode(SECRET, &claims(now.unix_timestamp() + 60)).unwrap();
        let (header, rest) = token.split_once('.').unwrap();
        let (_, signature) = rest.split_once('.').unwrap();

        let mut forged_claims = claims(now.unix_timestamp() + 60);
        forged_claims.rol = Rol::Admin;
        let forged_payload = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{header}.{forged_payload}.{signature}");
        assert!(matches!(decode(SECRET, &forged, now), Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn malformed() {
        let now = DateTime::now();
        assert!(matches!(decode(SECRET, "not-a-token", now), Err(TokenError::Malformed)));
        assert!(matches!(decode(SECRET, "a.b.c.d", now), Err(TokenError::Malformed)));
        assert!(matches!(decode(SECRET, "***.b.c", now), Err(TokenError::Encoding(_))));
    }

    #[test]
    fn rejects_other_algorithms() {
        let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims(i64::MAX)).unwrap());
        let token = format!("{header}.{payload}.");
        assert!(matches!(decode(SECRET, &token, DateTime::now()), Err(TokenError::UnsupportedAlgorithm)));
    }
}
