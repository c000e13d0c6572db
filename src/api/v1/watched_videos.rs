use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use crate::db::WatchStore;
use crate::errors::AppError;
use crate::InnerState;

/// Body of `POST /watched-videos`. Any other field, a `watchedAt` included, is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRequest {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedVideo {
    pub id: Uuid,
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub thumbnail_url: String,
    pub watched_at: DateTime<Utc>,
}

impl WatchRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.video_id.trim().is_empty() {
            return Err(AppError::Validation("videoId must not be empty".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        if self.thumbnail_url.trim().is_empty() {
            return Err(AppError::Validation("thumbnailUrl must not be empty".to_string()));
        }
        Url::parse(&self.url)
            .map_err(|e| AppError::Validation(format!("url is not a valid URL: {e}")))?;
        Ok(())
    }
}

/// Validates `input` and appends it to the history, stamped with the current time.
pub async fn record_watch(
    store: &dyn WatchStore,
    input: WatchRequest,
) -> Result<WatchedVideo, AppError> {
    input.validate()?;

    let record = WatchedVideo {
        id: Uuid::new_v4(),
        video_id: input.video_id,
        title: input.title,
        url: input.url,
        thumbnail_url: input.thumbnail_url,
        watched_at: Utc::now(),
    };

    store.insert(&record).await?;
    tracing::info!("Recorded watch of video {} as {}", record.video_id, record.id);

    Ok(record)
}

#[tracing::instrument(name = "Record watched video", skip(inner, payload), fields(video_id = %payload.video_id))]
pub async fn create_watched_video(
    State(inner): State<InnerState>,
    Json(payload): Json<WatchRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let record = record_watch(inner.store.as_ref(), payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "The video is corretly downloaded",
            "id": record.id,
        })),
    ))
}
