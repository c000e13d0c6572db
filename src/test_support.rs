//! Fakes for the identity service, Helix and the watch history store.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use secrecy::Secret;
use serde_json::json;
use tokio::net::TcpListener;

use crate::api::v1::watched_videos::WatchedVideo;
use crate::config::Config;
use crate::db::WatchStore;
use crate::errors::AppError;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{addr}")
}

pub fn test_config(api_base_url: &str, token_url: &str) -> Config {
    Config {
        database_url: "postgres://localhost/postgres".to_string(),
        database_name: "visitwitch_test".to_string(),
        twitch_client_id: "client-id".to_string(),
        twitch_client_secret: Secret::new("client-secret".to_string()),
        twitch_api_base_url: api_base_url.parse().expect("api base url"),
        twitch_token_url: token_url.parse().expect("token url"),
        upstream_timeout: Some(std::time::Duration::from_secs(5)),
        bind_address: "127.0.0.1:0".parse().expect("bind address"),
    }
}

#[derive(Clone, Copy)]
pub enum TokenBehaviour {
    Issue { expires_in: u64 },
    Reject,
    /// Accepts the request and never answers.
    Hang,
}

/// Fake `POST /oauth2/token`; tokens are numbered by exchange count.
pub fn token_router(behaviour: TokenBehaviour) -> (Router, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));

    let handler = {
        let hits = hits.clone();
        move |Form(form): Form<HashMap<String, String>>| {
            let hits = hits.clone();
            async move {
                let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                let credentials_ok = form.get("grant_type").map(String::as_str)
                    == Some("client_credentials")
                    && form.get("client_id").map(String::as_str) == Some("client-id")
                    && form.get("client_secret").map(String::as_str) == Some("client-secret");

                if let TokenBehaviour::Hang = behaviour {
                    tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                }

                match behaviour {
                    TokenBehaviour::Issue { expires_in } if credentials_ok => Json(json!({
                        "access_token": format!("app-token-{n}"),
                        "expires_in": expires_in,
                        "token_type": "bearer"
                    }))
                    .into_response(),
                    _ => (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "status": 401, "message": "invalid client secret" })),
                    )
                        .into_response(),
                }
            }
        }
    };

    (Router::new().route("/oauth2/token", post(handler)), hits)
}

#[derive(Clone, Default)]
pub struct HelixHits {
    pub pages: Arc<AtomicUsize>,
    pub last_first: Arc<Mutex<Option<String>>>,
}

/// Fake Helix with a few canned paginated scenarios keyed by query.
pub fn helix_router() -> (Router, HelixHits) {
    let hits = HelixHits::default();
    let router = Router::new()
        .route("/helix/search/categories", get(search_categories))
        .route("/helix/videos", get(videos))
        .with_state(hits.clone());
    (router, hits)
}

fn authorized(headers: &HeaderMap) -> bool {
    let client_id = headers.get("client-id").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    client_id == Some("client-id") && bearer.starts_with("Bearer app-token-")
}

fn record(hits: &HelixHits, params: &HashMap<String, String>) {
    hits.pages.fetch_add(1, Ordering::SeqCst);
    *hits.last_first.lock().unwrap() = params.get("first").cloned();
}

fn category(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("Game {id}"),
        "box_art_url": format!("https://cdn.test/{id}-{{width}}x{{height}}.jpg"),
        "broadcaster_language": "en"
    })
}

async fn search_categories(
    State(hits): State<HelixHits>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid oauth token").into_response();
    }
    record(&hits, &params);

    let query = params.get("query").map(String::as_str).unwrap_or_default();
    let after = params.get("after").map(String::as_str);

    let body = match (query, after) {
        ("zelda", None) => json!({
            "data": [category("g1"), category("g2")],
            "pagination": { "cursor": "c1" }
        }),
        ("zelda", Some("c1")) => json!({
            "data": [category("g3")],
            "pagination": { "cursor": "c2" }
        }),
        ("zelda", Some("c2")) => json!({ "data": [], "pagination": { "cursor": "c3" } }),
        ("flaky", None) => json!({
            "data": [category("f1")],
            "pagination": { "cursor": "f-next" }
        }),
        ("flaky", Some(_)) => {
            return (StatusCode::SERVICE_UNAVAILABLE, "upstream overloaded").into_response()
        }
        ("revoked", _) => {
            return (StatusCode::UNAUTHORIZED, "invalid oauth token").into_response()
        }
        ("garbled", _) => json!({ "data": [{ "name": "no id here" }] }),
        _ => json!({ "data": [], "pagination": { "cursor": "x" } }),
    };
    Json(body).into_response()
}

async fn videos(
    State(hits): State<HelixHits>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid oauth token").into_response();
    }
    record(&hits, &params);

    let video = |id: &str| {
        json!({
            "id": id,
            "user_id": "141981764",
            "title": format!("Speedrun {id}"),
            "created_at": "2024-05-01T20:15:00Z",
            "url": format!("https://www.twitch.tv/videos/{id}"),
            "thumbnail_url": format!("https://cdn.test/{id}-%{{width}}x%{{height}}.jpg"),
            "view_count": 12
        })
    };

    let body = match params.get("after").map(String::as_str) {
        None => json!({ "data": [video("v1")], "pagination": { "cursor": "vc1" } }),
        Some(_) => json!({ "data": [video("v2")], "pagination": {} }),
    };
    Json(body).into_response()
}

/// Keeps inserted records in memory so tests can read them back.
#[derive(Default)]
pub struct MemoryWatchStore {
    pub records: Mutex<Vec<WatchedVideo>>,
}

#[async_trait]
impl WatchStore for MemoryWatchStore {
    async fn insert(&self, record: &WatchedVideo) -> Result<(), AppError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub struct FailingWatchStore;

#[async_trait]
impl WatchStore for FailingWatchStore {
    async fn insert(&self, _record: &WatchedVideo) -> Result<(), AppError> {
        Err(AppError::Persistence(anyhow::anyhow!(
            "pool timed out while waiting for an open connection"
        )))
    }
}
