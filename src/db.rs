use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::api::v1::watched_videos::WatchedVideo;
use crate::config::Config;
use crate::errors::AppError;

const CREATE_WATCHED_VIDEOS: &str = r#"
CREATE TABLE IF NOT EXISTS watched_videos (
    id UUID PRIMARY KEY,
    video_id TEXT NOT NULL,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    thumbnail_url TEXT NOT NULL,
    watched_at TIMESTAMPTZ NOT NULL
)"#;

/// Append-only history of watched videos.
#[async_trait]
pub trait WatchStore: Send + Sync {
    async fn insert(&self, record: &WatchedVideo) -> Result<(), AppError>;
}

#[tracing::instrument(name = "Initialize database", skip(config))]
pub async fn init_db(config: &Config) -> Result<PgPool, AppError> {
    let options = PgConnectOptions::from_str(&config.database_url)
        .map_err(|e| AppError::Config(format!("invalid DATABASE_URL: {e}")))?
        .database(&config.database_name);

    tracing::info!("Connecting to database '{}'", config.database_name);
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {:?}", e);
            AppError::from(e)
        })?;

    sqlx::query(CREATE_WATCHED_VIDEOS).execute(&pool).await?;
    tracing::info!("Database ready");

    Ok(pool)
}

#[derive(Clone)]
pub struct PgWatchStore {
    pool: PgPool,
}

impl PgWatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatchStore for PgWatchStore {
    #[tracing::instrument(name = "Insert watched video", skip(self, record), fields(video_id = %record.video_id))]
    async fn insert(&self, record: &WatchedVideo) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO watched_videos (id, video_id, title, url, thumbnail_url, watched_at)
            VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(record.id)
        .bind(&record.video_id)
        .bind(&record.title)
        .bind(&record.url)
        .bind(&record.thumbnail_url)
        .bind(record.watched_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::warn!("Database error while inserting watched video: {:?}", e);
            AppError::from(e)
        })?;

        Ok(())
    }
}
