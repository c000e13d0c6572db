use std::time::{Duration, Instant};

use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthType, AuthUrl, ClientId, ClientSecret,
    RequestTokenError, TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, Secret};
use tokio::sync::Mutex;
use url::Url;

use crate::errors::AppError;

/// Tokens are refreshed this long before the identity service says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Used when the token response carries no `expires_in`.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

struct CachedToken {
    secret: Secret<String>,
    refresh_after: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.refresh_after
    }
}

/// App access tokens for one client id/secret pair.
///
/// The lock is held for the whole exchange, so concurrent callers that find
/// the cache empty wait for the first exchange instead of starting their own.
/// With a `timeout`, a hung exchange fails instead of holding the lock forever.
pub struct TokenProvider {
    oauth_client: BasicClient,
    timeout: Option<Duration>,
    cached: Mutex<Option<CachedToken>>,
}

#[tracing::instrument(name = "Build Twitch OAuth client", skip(client_id, client_secret))]
pub fn build_twitch_oauth_client(
    client_id: String,
    client_secret: String,
    token_url: &Url,
) -> BasicClient {
    tracing::info!("Building Twitch OAuth client");
    tracing::debug!("Using Twitch token URL: {}", token_url);

    // Never visited: the client-credentials grant has no authorization step.
    let mut authorize_url = token_url.clone();
    authorize_url.set_path(&token_url.path().replace("/token", "/authorize"));

    BasicClient::new(
        ClientId::new(client_id),
        Some(ClientSecret::new(client_secret)),
        AuthUrl::from_url(authorize_url),
        Some(TokenUrl::from_url(token_url.clone())),
    )
    // The identity service expects the pair in the form body, not in a Basic header.
    .set_auth_type(AuthType::RequestBody)
}

impl TokenProvider {
    pub fn new(
        client_id: &str,
        client_secret: &Secret<String>,
        token_url: &Url,
        timeout: Option<Duration>,
    ) -> Self {
        let oauth_client = build_twitch_oauth_client(
            client_id.to_string(),
            client_secret.expose_secret().clone(),
            token_url,
        );

        Self {
            oauth_client,
            timeout,
            cached: Mutex::new(None),
        }
    }

    /// Returns a bearer token, exchanging credentials only when the cached one is stale.
    #[tracing::instrument(name = "Get Twitch access token", skip(self))]
    pub async fn access_token(&self) -> Result<String, AppError> {
        let mut slot = self.cached.lock().await;

        if let Some(token) = slot.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            tracing::debug!("Reusing cached Twitch access token");
            return Ok(token.secret.expose_secret().clone());
        }

        let token = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange())
                .await
                .map_err(|_| {
                    AppError::UpstreamAuth(anyhow::anyhow!(
                        "token request timed out after {:?}",
                        limit
                    ))
                })??,
            None => self.exchange().await?,
        };
        let value = token.secret.expose_secret().clone();
        *slot = Some(token);
        Ok(value)
    }

    /// Drops the cached token if it is still `rejected`, so the next call
    /// performs a fresh exchange. A newer token fetched meanwhile is kept.
    pub async fn invalidate(&self, rejected: &str) {
        let mut slot = self.cached.lock().await;
        if slot
            .as_ref()
            .is_some_and(|t| t.secret.expose_secret() == rejected)
        {
            tracing::info!("Invalidating cached Twitch access token");
            slot.take();
        } else {
            tracing::debug!("Rejected token already replaced, keeping the cached one");
        }
    }

    async fn exchange(&self) -> Result<CachedToken, AppError> {
        tracing::info!("Exchanging client credentials for a Twitch access token");

        let started = Instant::now();
        let response = self
            .oauth_client
            .exchange_client_credentials()
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                tracing::warn!("Failed to exchange client credentials: {:?}", e);
                let detail = match e {
                    RequestTokenError::ServerResponse(server_response) => {
                        format!("identity service rejected credentials: {server_response}")
                    }
                    RequestTokenError::Request(e) => format!("token request failed: {e}"),
                    RequestTokenError::Parse(e, body) => format!(
                        "unexpected token response ({e}): {}",
                        String::from_utf8_lossy(&body)
                    ),
                    RequestTokenError::Other(message) => message,
                };
                AppError::UpstreamAuth(anyhow::anyhow!(detail))
            })?;

        let access_token = response.access_token().secret().clone();
        if access_token.is_empty() {
            return Err(AppError::UpstreamAuth(anyhow::anyhow!(
                "token response carried an empty access_token"
            )));
        }

        let lifetime = response.expires_in().unwrap_or(DEFAULT_LIFETIME);
        tracing::info!("Obtained Twitch access token valid for {:?}", lifetime);

        Ok(CachedToken {
            secret: Secret::new(access_token),
            refresh_after: started + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}
