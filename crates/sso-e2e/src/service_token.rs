//! Service tokens for the Users service, and unverified claim decoding.
//!
//! Service tokens are short-lived HS256 JWTs signed with the secret shared by
//! every backend service. A fresh token is minted for each request.

use crate::config::ServiceTokenSettings;
use crate::error::E2eResult;
use crate::models::AccessTokenClaims;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Role carried by service-to-service tokens.
pub const SERVICE_ROLE: &str = "service";

#[derive(Debug, Serialize)]
struct ServiceClaims<'a> {
    sub: &'a str,
    roles: [&'a str; 1],
    iss: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Sign a new service token.
///
/// # Errors
///
/// Returns `E2eError::Token` if signing fails.
pub fn create_service_token(settings: &ServiceTokenSettings) -> E2eResult<String> {
    let iat = Utc::now().timestamp();
    let ttl = i64::try_from(settings.ttl.as_secs()).unwrap_or(i64::MAX);

    let claims = ServiceClaims {
        sub: &settings.subject,
        roles: [SERVICE_ROLE],
        iss: &settings.issuer,
        aud: &settings.audience,
        iat,
        exp: iat.saturating_add(ttl),
    };

    let key = EncodingKey::from_secret(settings.secret.as_bytes());
    Ok(encode(&Header::new(Algorithm::HS256), &claims, &key)?)
}

/// Decode a JWT's claims without checking signature, algorithm, expiry,
/// issuer or audience.
///
/// Returns `None` unless the token has three dot-separated segments whose
/// header and payload are base64url-encoded JSON objects.
#[must_use]
pub fn decode_unverified(token: &str) -> Option<AccessTokenClaims> {
    match decode_claims(token) {
        Ok(claims) => Some(claims),
        Err(reason) => {
            tracing::debug!(%reason, "access token is not a decodable JWT");
            None
        }
    }
}

fn decode_claims(token: &str) -> Result<AccessTokenClaims, String> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err("expected three dot-separated segments".to_string());
    };

    decode_segment::<Map<String, Value>>(header).map_err(|e| format!("header: {e}"))?;
    decode_segment(payload).map_err(|e| format!("payload: {e}"))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}
