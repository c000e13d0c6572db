use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::errors::AppError;
use crate::twitch::auth::TokenProvider;
use crate::twitch::models::{GameList, HelixCategory, HelixPage, HelixVideo, VideoList};

/// Largest page Helix serves; keeps round trips down when fetching everything.
pub const PAGE_SIZE: u32 = 100;

/// Helix API access shared by every request handler.
#[derive(Clone)]
pub struct TwitchClient {
    http_client: Client,
    api_base_url: Url,
    client_id: String,
    tokens: Arc<TokenProvider>,
}

impl TwitchClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.upstream_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(|e| {
            AppError::Config(format!("could not build the upstream HTTP client: {e}"))
        })?;

        let tokens = TokenProvider::new(
            &config.twitch_client_id,
            &config.twitch_client_secret,
            &config.twitch_token_url,
            config.upstream_timeout,
        );

        Ok(Self {
            http_client,
            api_base_url: config.twitch_api_base_url.clone(),
            client_id: config.twitch_client_id.clone(),
            tokens: Arc::new(tokens),
        })
    }

    /// Categories whose name matches `query`, in Helix relevance order.
    #[tracing::instrument(name = "Search Twitch games", skip(self))]
    pub async fn search_games(&self, query: &str, fetch_all: bool) -> Result<GameList, AppError> {
        let token = self.tokens.access_token().await?;
        let items: Vec<HelixCategory> = self
            .paginate("search/categories", &[("query", query)], &token, fetch_all)
            .await?;

        let games = GameList::try_from(items)?;
        tracing::info!("Found {} games for query '{}'", games.data.len(), query);
        Ok(games)
    }

    /// Videos published under the category `game_id`.
    #[tracing::instrument(name = "Fetch Twitch videos", skip(self))]
    pub async fn videos_for_game(
        &self,
        game_id: &str,
        fetch_all: bool,
    ) -> Result<VideoList, AppError> {
        let token = self.tokens.access_token().await?;
        let items: Vec<HelixVideo> = self
            .paginate("videos", &[("game_id", game_id)], &token, fetch_all)
            .await?;

        let videos = VideoList::try_from(items)?;
        tracing::info!("Found {} videos for game {}", videos.data.len(), game_id);
        Ok(videos)
    }

    /// Walks a cursor-paginated endpoint and concatenates every page's `data`.
    ///
    /// Only one page is read unless `fetch_all` is set. Otherwise the walk ends
    /// on the first page that is empty or carries no cursor. Any failure
    /// discards what was accumulated so far.
    pub async fn paginate<T: DeserializeOwned>(
        &self,
        path: &str,
        base_params: &[(&str, &str)],
        token: &str,
        fetch_all: bool,
    ) -> Result<Vec<T>, AppError> {
        let url = self.endpoint(path);
        let page_size = PAGE_SIZE.to_string();

        let mut all_items = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_count = 0;

        loop {
            page_count += 1;
            tracing::debug!("Requesting page {} of {}", page_count, path);

            let mut request = self
                .http_client
                .get(url.clone())
                .query(base_params)
                .query(&[("first", page_size.as_str())])
                .header("Client-Id", &self.client_id)
                .bearer_auth(token);

            if let Some(after) = &cursor {
                request = request.query(&[("after", after.as_str())]);
            }

            let response = request.send().await?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                tracing::warn!(
                    "Twitch API error on page {} of {}: {} {}",
                    page_count,
                    path,
                    status,
                    error_text
                );
                if status == StatusCode::UNAUTHORIZED {
                    self.tokens.invalidate(token).await;
                }
                return Err(AppError::UpstreamRequest(anyhow::anyhow!(
                    "Twitch API returned {} for {} (page {}): {}",
                    status,
                    path,
                    page_count,
                    error_text
                )));
            }

            let page: HelixPage<T> = response.json().await.map_err(|e| {
                tracing::debug!("Failed to parse Twitch API response: {:?}", e);
                AppError::UpstreamRequest(
                    anyhow::Error::new(e)
                        .context(format!("could not decode page {page_count} of {path}")),
                )
            })?;

            let items_count = page.data.len();
            tracing::debug!("Received {} items on page {}", items_count, page_count);
            all_items.extend(page.data);

            cursor = page.pagination.next_cursor();
            if !fetch_all || cursor.is_none() || items_count == 0 {
                break;
            }
            tracing::debug!("More pages available, continuing pagination");
        }

        tracing::info!(
            "Completed pagination of {}, {} items over {} pages",
            path,
            all_items.len(),
            page_count
        );
        Ok(all_items)
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.api_base_url.clone();
        let joined = format!("{}/{}", url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        url
    }
}
