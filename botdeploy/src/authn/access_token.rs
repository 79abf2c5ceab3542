//! Azure access token inspection
//!
//! Tokens come from `az account get-access-token`. They are only decoded to
//! read their claims; the signature is never checked here, the remote
//! services do that.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Remediation hint appended to every expired-token error
pub const REFRESH_HINT: &str =
    "run az account get-access-token, then replace the accessToken in your configuration";

/// Claims of interest in an Azure AD access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Expiration timestamp
    pub exp: i64,

    /// Tenant id
    #[serde(default)]
    pub tid: Option<String>,

    /// Audience
    #[serde(default)]
    pub aud: Option<serde_json::Value>,

    /// Signed-in user, when present
    #[serde(default)]
    pub upn: Option<String>,
}

/// A decoded access token
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub claims: AccessTokenClaims,
}

impl AccessToken {
    /// Decode the claims of a raw JWT without validating it
    pub fn decode(raw: &str) -> Result<Self, DeployError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;

        let token_data = decode::<AccessTokenClaims>(raw, &DecodingKey::from_secret(b""), &validation)
            .map_err(|e| DeployError::TokenError(format!("Failed to decode token: {}", e)))?;

        Ok(Self {
            claims: token_data.claims,
        })
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        self.claims.exp < Utc::now().timestamp()
    }

    /// Get expiration time
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.claims.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// Fail early on a token that is already expired.
///
/// Tokens that cannot be decoded are let through; the remote call will judge them.
pub fn ensure_not_expired(raw: &str) -> Result<(), DeployError> {
    match AccessToken::decode(raw) {
        Ok(token) if token.is_expired() => Err(DeployError::AuthError(format!(
            "Token expired at {}, please {}",
            token.expires_at(),
            REFRESH_HINT
        ))),
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::warn!("Unable to inspect access token, continuing: {}", e);
            Ok(())
        }
    }
}
