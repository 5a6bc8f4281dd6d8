//! Access token lifecycle for the encoding API
//!
//! Tokens are acquired through a credential exchange and renewed transparently
//! once they come within [`TOKEN_EXPIRY_MARGIN_SECS`] of expiring.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::clock::Clock;
use super::session::Session;
use crate::error::{ApiError, Error, Result};

/// Tokens are treated as expired this many seconds before their real expiry
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 5 * 60;

/// Credential-exchange endpoint, relative to the encoding API base URL
const AUTHENTICATE_PATH: [&str; 2] = ["auth", "authenticate"];

/// Response shape of the credential exchange, fixed per deployment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum AuthContract {
    /// `{token}` where the token is a JWT carrying an `exp` claim
    #[default]
    Jwt,
    /// `{access_token, expires_in}` with a lifetime in seconds
    ExpiresIn,
}

/// Identifier/secret pair used for the credential exchange
#[derive(Clone)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Bearer token with its absolute expiry
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The bearer token string
    pub token: String,

    /// Token expiration time
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// True while `now` is strictly before `expires_at - margin`
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at
            .checked_sub_signed(margin)
            .is_some_and(|deadline| now < deadline)
    }
}

/// Owns the access token for one encoding client
pub struct TokenManager {
    credentials: Credentials,
    contract: AuthContract,
    margin: Duration,
    clock: Arc<dyn Clock>,
    token: Mutex<Option<AccessToken>>,
}

impl TokenManager {
    pub fn new(credentials: Credentials, contract: AuthContract, clock: Arc<dyn Clock>) -> Self {
        Self {
            credentials,
            contract,
            margin: Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS),
            clock,
            token: Mutex::new(None),
        }
    }

    pub fn contract(&self) -> AuthContract {
        self.contract
    }

    /// Whether the held token can still be used right now
    #[allow(dead_code)]
    pub async fn is_valid(&self) -> bool {
        let now = self.clock.now();
        self.token
            .lock()
            .await
            .as_ref()
            .is_some_and(|token| token.is_valid_at(now, self.margin))
    }

    /// Snapshot of the held token, if any
    pub async fn current(&self) -> Option<AccessToken> {
        self.token.lock().await.clone()
    }

    /// Return a usable bearer token, renewing first if none is held or the
    /// held one is inside the expiry margin.
    ///
    /// The lock is held across the check and the renewal, so concurrent
    /// callers trigger at most one credential exchange.
    pub async fn ensure_valid(&self, session: &Session) -> Result<String> {
        let mut guard = self.token.lock().await;
        let now = self.clock.now();

        if let Some(token) = guard.as_ref()
            && token.is_valid_at(now, self.margin)
        {
            return Ok(token.token.clone());
        }

        let renewed = self.exchange(session).await?;
        let bearer = renewed.token.clone();
        *guard = Some(renewed);
        Ok(bearer)
    }

    /// Unconditionally fetch a fresh token
    #[allow(dead_code)]
    pub async fn renew(&self, session: &Session) -> Result<()> {
        let mut guard = self.token.lock().await;
        *guard = Some(self.exchange(session).await?);
        Ok(())
    }

    /// Run the credential exchange once. Every failure is reported as
    /// [`ApiError::AuthenticationFailed`].
    async fn exchange(&self, session: &Session) -> Result<AccessToken> {
        #[derive(Serialize)]
        struct AuthenticateRequest<'a> {
            email: &'a str,
            password: &'a str,
        }

        #[derive(Deserialize)]
        struct JwtResponse {
            token: String,
        }

        #[derive(Deserialize)]
        struct ExpiresInResponse {
            access_token: String,
            expires_in: i64,
        }

        let body = AuthenticateRequest {
            email: &self.credentials.identifier,
            password: &self.credentials.secret,
        };

        let result = match self.contract {
            AuthContract::Jwt => session
                .post_json::<_, JwtResponse>(&AUTHENTICATE_PATH, &body)
                .await
                .and_then(|response| {
                    let expires_at = decode_jwt_expiry(&response.token)?;
                    Ok(AccessToken {
                        token: response.token,
                        expires_at,
                    })
                }),
            AuthContract::ExpiresIn => session
                .post_json::<_, ExpiresInResponse>(&AUTHENTICATE_PATH, &body)
                .await
                .and_then(|response| {
                    let expires_at = Duration::try_seconds(response.expires_in)
                        .and_then(|lifetime| self.clock.now().checked_add_signed(lifetime))
                        .ok_or_else(|| {
                            ApiError::InvalidResponse(format!(
                                "expires_in {} out of range",
                                response.expires_in
                            ))
                        })?;
                    Ok(AccessToken {
                        token: response.access_token,
                        expires_at,
                    })
                }),
        };

        match result {
            Ok(token) => {
                log::info!("Successfully authenticated with encoding API");
                log::debug!("Access token expires at {}", token.expires_at);
                Ok(token)
            }
            Err(err) => {
                log::error!("Error refreshing token: {}", err);
                Err(into_auth_failure(err))
            }
        }
    }
}

fn into_auth_failure(err: Error) -> Error {
    match err {
        Error::Api(ApiError::AuthenticationFailed(_)) => err,
        Error::Api(ApiError::Http { status, body }) => {
            ApiError::AuthenticationFailed(format!("HTTP {}: {}", status, body)).into()
        }
        other => ApiError::AuthenticationFailed(other.to_string()).into(),
    }
}

/// Read the `exp` claim from a JWT without verifying its signature.
///
/// Only used to schedule renewal. The token's authenticity is never derived
/// from this value.
pub fn decode_jwt_expiry(token: &str) -> Result<DateTime<Utc>> {
    #[derive(Deserialize)]
    struct JwtPayload {
        exp: i64, // Unix timestamp
    }

    // header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ApiError::InvalidToken(format!(
            "expected 3 segments, found {}",
            parts.len()
        ))
        .into());
    }

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| ApiError::InvalidToken(format!("payload is not base64url: {}", e)))?;

    let payload: JwtPayload = serde_json::from_slice(&payload_bytes)
        .map_err(|e| ApiError::InvalidToken(format!("payload has no usable exp claim: {}", e)))?;

    DateTime::from_timestamp(payload.exp, 0)
        .ok_or_else(|| ApiError::InvalidToken(format!("exp {} out of range", payload.exp)).into())
}

#[cfg(test)]
pub(crate) fn fake_jwt(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"svc","exp":{}}}"#, exp));
    format!("{}.{}.c2lnbmF0dXJl", header, payload)
}
