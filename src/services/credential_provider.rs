use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::app::config::Config;

const GRANT_TYPE: &str = "client_credentials";

/// Bearer token for one processor call. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("identity endpoint timed out")]
    Timeout,
    #[error("identity endpoint unreachable: {0}")]
    Transport(String),
    #[error("identity endpoint returned HTTP {status}")]
    Rejected { status: u16, body: String },
    #[error("identity endpoint returned an unusable body: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }

    /// Only failures that may clear up on their own are retried; bad
    /// credentials and garbage responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::MalformedResponse(_) => false,
        }
    }
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
}

/// Client-credentials exchange against the processor's identity endpoint.
/// A fresh token is requested on every call; nothing is cached.
pub struct OAuthCredentialProvider {
    client: Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    max_attempts: u32,
    backoff: Duration,
}

impl OAuthCredentialProvider {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            token_url: config.identity_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            max_attempts: config.token_max_attempts.max(1),
            backoff: config.token_retry_backoff,
        }
    }

    async fn request_token(&self) -> Result<AccessToken, AuthError> {
        let form = [
            ("grant_type", GRANT_TYPE),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(AuthError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AuthError::Timeout
            } else {
                AuthError::MalformedResponse(e.to_string())
            }
        })?;

        debug!(
            token_type = token.token_type.as_deref().unwrap_or("unknown"),
            expires_in = token.expires_in,
            "Obtained processor access token"
        );

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(AccessToken::new(access_token)),
            _ => Err(AuthError::MalformedResponse(
                "access_token missing from response".to_string(),
            )),
        }
    }
}

#[async_trait]
impl CredentialProvider for OAuthCredentialProvider {
    async fn access_token(&self) -> Result<AccessToken, AuthError> {
        let mut attempt = 1;
        loop {
            match self.request_token().await {
                Ok(token) => return Ok(token),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = backoff_delay(self.backoff, attempt);
                    warn!(
                        "Token request attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    match &e {
                        AuthError::Rejected { status, body } => {
                            error!(status, upstream_body = %body, "Identity endpoint rejected token request")
                        }
                        other => error!("Failed to obtain processor token: {}", other),
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Exponential backoff with up to 50% random jitter.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(1u32 << (attempt - 1).min(16));
    let jitter_ceiling = u64::try_from(exp.as_millis() / 2).unwrap_or(u64::MAX);
    let jitter = if jitter_ceiling == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_ceiling)
    };
    exp.saturating_add(Duration::from_millis(jitter))
}
