//! Exchange of the long-lived secret for a short-lived access token.
//!
//! Concurrent generations share one [`CredentialCache`]. Only one of them
//! talks to the token endpoint at a time; the rest wait for it to finish (up
//! to [`MAX_WAIT`]) and reuse the token it caches.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::http::{EDITOR_VERSION, HttpRequest, HttpTransport, USER_AGENT};

use super::store::{AccessToken, CredentialCache, Endpoints, mask_token};

/// Token endpoint for the Copilot provider.
pub const TOKEN_URL: &str = "https://api.github.com/copilot_internal/v2/token";

/// Upper bound on waiting for someone else's exchange before issuing our own.
pub const MAX_WAIT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
    expires_at: Option<i64>,
    endpoints: Option<Endpoints>,
    /// Present on error bodies such as `{"message": "Bad credentials"}`.
    message: Option<String>,
}

/// Parse the token endpoint's response body.
pub fn parse_token_response(body: &str) -> Result<AccessToken, AuthError> {
    let response: TokenResponse = serde_json::from_str(body).map_err(|e| {
        debug!("Token response is not valid JSON: {}", e);
        AuthError::Parse
    })?;

    match (response.token, response.expires_at) {
        (Some(token), Some(expires_at)) if !token.is_empty() => Ok(AccessToken {
            token,
            expires_at,
            endpoints: response.endpoints,
        }),
        _ => match response.message {
            Some(message) => Err(AuthError::Rejected(message)),
            None => Err(AuthError::Parse),
        },
    }
}

/// The right to run the exchange. Released on drop, so a caller cancelled
/// mid-request still wakes the waiters.
struct ExchangeClaim<'a> {
    cache: &'a CredentialCache,
    secret: &'a str,
    released: bool,
}

impl<'a> ExchangeClaim<'a> {
    fn new(cache: &'a CredentialCache, secret: &'a str) -> Self {
        Self {
            cache,
            secret,
            released: false,
        }
    }

    fn finish(mut self, token: Option<&AccessToken>) {
        self.released = true;
        self.cache.finish_exchange(self.secret, token);
    }
}

impl Drop for ExchangeClaim<'_> {
    fn drop(&mut self) {
        if !self.released {
            debug!("Token exchange cancelled, releasing claim");
            self.cache.finish_exchange(self.secret, None);
        }
    }
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Coordinates token exchanges against a shared cache.
#[derive(Clone)]
pub struct TokenExchange {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<CredentialCache>,
    url: String,
    max_wait: Duration,
}

impl TokenExchange {
    pub fn new(transport: Arc<dyn HttpTransport>, cache: Arc<CredentialCache>) -> Self {
        Self {
            transport,
            cache,
            url: TOKEN_URL.to_string(),
            max_wait: MAX_WAIT,
        }
    }

    /// Use a different token endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Override the bound on waiting for an in-flight exchange.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn cache(&self) -> &Arc<CredentialCache> {
        &self.cache
    }

    /// Return a valid access token for `secret`.
    ///
    /// 1. A cached token that has not expired is returned without a request.
    /// 2. If another exchange is in flight, wait for it to finish and reuse
    ///    its token. Once `max_wait` elapses, stop waiting and exchange anyway.
    /// 3. Otherwise issue one request to the token endpoint and cache the
    ///    result.
    pub async fn exchange(&self, secret: &str) -> Result<AccessToken, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::NoSecret);
        }

        let deadline = Instant::now() + self.max_wait;

        loop {
            // Register interest before checking state so a finish between the
            // check and the await is not missed.
            let notified = self.cache.exchange_done().notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(token) = self.cache.valid_token(unix_now()) {
                debug!("Reusing cached access token");
                return Ok(token);
            }

            if self.cache.try_begin_exchange() {
                break;
            }

            debug!("Token exchange already in flight, waiting");
            if timeout_at(deadline, notified).await.is_err() {
                warn!(
                    "Waited {}s for an in-flight token exchange; exchanging again",
                    self.max_wait.as_secs()
                );
                self.cache.force_begin_exchange();
                break;
            }
        }

        let claim = ExchangeClaim::new(&self.cache, secret);
        let result = self.request_token(secret).await;
        claim.finish(result.as_ref().ok());
        result
    }

    async fn request_token(&self, secret: &str) -> Result<AccessToken, AuthError> {
        debug!("Exchanging secret {} for an access token", mask_token(secret));

        let request = HttpRequest::get(&self.url)
            .header("Authorization", format!("Bearer {secret}"))
            .header("Accept", "application/json")
            .header("Editor-Version", EDITOR_VERSION)
            .header("User-Agent", USER_AGENT);

        let body = self.transport.send(&request).await?.into_body()?;
        let token = parse_token_response(&body)?;

        debug!(
            "Access token {} expires at {}",
            mask_token(&token.token),
            token.expires_at
        );
        Ok(token)
    }
}
