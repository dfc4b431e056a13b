//! Anti-forgery tokens for state-changing requests.
//!
//! A token is the hex-encoded HMAC-SHA256 of the owner identifier under a
//! server secret. Tokens are bound to the principal they were issued for and
//! stay valid for the lifetime of the secret.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use super::error::ApiErrorResponse;
use crate::domain::OwnerId;

type HmacSha256 = Hmac<Sha256>;

/// Header a client echoes the token back in.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// The forgery-token key could not be initialized.
#[derive(Debug, Error)]
#[error("invalid anti-forgery key: {0}")]
pub struct CsrfKeyError(String);

/// Issues and checks anti-forgery tokens.
#[derive(Clone)]
pub struct CsrfGuard {
    mac: HmacSha256,
}

impl std::fmt::Debug for CsrfGuard {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("CsrfGuard").finish_non_exhaustive()
    }
}

impl CsrfGuard {
    /// Creates a guard keyed with `secret`.
    ///
    /// # Errors
    ///
    /// Returns `CsrfKeyError` if the key is rejected by the MAC.
    pub fn new(secret: &[u8]) -> Result<Self, CsrfKeyError> {
        let mac =
            HmacSha256::new_from_slice(secret).map_err(|error| CsrfKeyError(error.to_string()))?;
        Ok(Self { mac })
    }

    /// Creates a guard with a random per-process key.
    ///
    /// Tokens issued by this guard do not survive a restart.
    ///
    /// # Errors
    ///
    /// Returns `CsrfKeyError` if the key is rejected by the MAC.
    pub fn random() -> Result<Self, CsrfKeyError> {
        let secret: [u8; 32] = rand::random();
        Self::new(&secret)
    }

    /// Issues the token for `owner`.
    #[must_use]
    pub fn issue(&self, owner: &OwnerId) -> String {
        let mut mac = self.mac.clone();
        mac.update(owner.as_str().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Returns `true` if `token` was issued for `owner`.
    ///
    /// The comparison runs in constant time.
    #[must_use]
    pub fn verify(&self, owner: &OwnerId, token: &str) -> bool {
        let Ok(provided) = hex::decode(token.trim()) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(owner.as_str().as_bytes());
        mac.verify_slice(&provided).is_ok()
    }

    /// Checks the token carried in the `x-csrf-token` header.
    ///
    /// # Errors
    ///
    /// Returns a 403 `ApiErrorResponse` if the header is missing or the token
    /// does not belong to `owner`.
    pub fn verify_request(
        &self,
        owner: &OwnerId,
        headers: &HeaderMap,
    ) -> Result<(), ApiErrorResponse> {
        let token = headers
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if self.verify(owner, token) {
            Ok(())
        } else {
            tracing::warn!(owner = %owner, "Rejected request with invalid anti-forgery token");
            Err(ApiErrorResponse::csrf_invalid())
        }
    }
}
