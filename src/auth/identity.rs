//! Best-effort identity extraction from a token payload.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lightweight identity snapshot derived from a token or hydrated at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct Claims {
    sub: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

/// Decode the payload segment of a JWT-shaped token. Any failure yields `None`;
/// the token's validity is never affected.
pub fn decode_identity(token: &str) -> Option<UserIdentity> {
    let payload = token.split('.').nth(1)?;
    let bytes = match URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(error = %err, "token payload is not base64url");
            return None;
        }
    };
    let claims: Claims = match serde_json::from_slice(&bytes) {
        Ok(claims) => claims,
        Err(err) => {
            debug!(error = %err, "token payload is not a claims object");
            return None;
        }
    };
    let id = claims.sub.filter(|sub| !sub.is_empty())?;
    Some(UserIdentity {
        id,
        name: claims.name,
        email: claims.email,
    })
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}
