//! Signed session credentials.
//!
//! A credential is `base64url(claims) "." base64url(hmac)`, where the claims
//! are JSON `{sub, name, exp}` and the MAC is HMAC-SHA256 over the encoded
//! claims. The WebSocket upgrade and every REST call verify one and bind
//! the resulting [`Identity`] to the request.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::domain::Identity;
use crate::error::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried inside a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Expiry as unix seconds.
    pub exp: i64,
}

/// Issues and verifies HMAC-signed credentials.
#[derive(Clone)]
pub struct CredentialVerifier {
    key: Vec<u8>,
    ttl: Duration,
}

impl fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("key", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CredentialVerifier {
    /// Creates a verifier with the given secret and credential lifetime.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
            ttl,
        }
    }

    fn mac(&self) -> Result<HmacSha256, GatewayError> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|e| GatewayError::Internal(format!("hmac key: {e}")))
    }

    /// Issues a credential for `identity`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the claims cannot be encoded.
    pub fn issue(&self, identity: &Identity) -> Result<String, GatewayError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issues a credential for `identity` as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the claims cannot be encoded.
    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, GatewayError> {
        let claims = Claims {
            sub: identity.account_id.as_str().to_string(),
            name: identity.display_name.clone(),
            exp: (now + self.ttl).timestamp(),
        };
        let json = serde_json::to_vec(&claims)
            .map_err(|e| GatewayError::Internal(format!("claims encoding: {e}")))?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Verifies a credential and returns the identity it names.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthenticated`] if the credential is
    /// malformed, carries a bad signature or has expired.
    pub fn verify(&self, token: &str) -> Result<Identity, GatewayError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies a credential against the given clock.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthenticated`] if the credential is
    /// malformed, carries a bad signature or has expired.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, GatewayError> {
        let (payload, signature) = token
            .trim()
            .split_once('.')
            .ok_or_else(|| unauthenticated("malformed credential"))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| unauthenticated("malformed signature"))?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| unauthenticated("bad signature"))?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| unauthenticated("malformed claims"))?;
        let claims: Claims =
            serde_json::from_slice(&json).map_err(|_| unauthenticated("malformed claims"))?;

        if claims.exp <= now.timestamp() {
            return Err(unauthenticated("credential expired"));
        }
        if claims.sub.is_empty() {
            return Err(unauthenticated("credential has no subject"));
        }
        Ok(Identity::new(claims.sub, claims.name))
    }
}

fn unauthenticated(reason: &str) -> GatewayError {
    GatewayError::Unauthenticated(reason.to_string())
}
