//! Helix response schemas and the internal records handed to clients.
//!
//! Upstream payloads are decoded into explicit structs at the HTTP boundary;
//! conversion into [`Game`] / [`Video`] happens per item and never reorders.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::AppError;

pub const THUMBNAIL_WIDTH: &str = "320";
pub const THUMBNAIL_HEIGHT: &str = "180";

/// One page of a cursor-paginated Helix endpoint.
#[derive(Debug, Deserialize)]
pub struct HelixPage<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub cursor: Option<String>,
}

impl Pagination {
    /// Helix sends `{}` or an empty cursor on the last page.
    pub fn next_cursor(self) -> Option<String> {
        self.cursor.filter(|cursor| !cursor.is_empty())
    }
}

/// Item of `GET /search/categories`.
#[derive(Debug, Deserialize)]
pub struct HelixCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub box_art_url: Option<String>,
}

/// Item of `GET /videos`.
#[derive(Debug, Deserialize)]
pub struct HelixVideo {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub url: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_art_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub url: Url,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameList {
    pub data: Vec<Game>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoList {
    pub data: Vec<Video>,
}

/// Fills the `%{width}` / `%{height}` placeholders Helix leaves in video thumbnails.
pub fn resolve_thumbnail(template: &str) -> String {
    template
        .replace("%{width}", THUMBNAIL_WIDTH)
        .replace("%{height}", THUMBNAIL_HEIGHT)
}

fn require_id(kind: &str, id: &str) -> Result<(), AppError> {
    if id.trim().is_empty() {
        tracing::warn!("Upstream {} item without an id", kind);
        return Err(AppError::UpstreamRequest(anyhow::anyhow!(
            "upstream {kind} item has an empty id"
        )));
    }
    Ok(())
}

impl TryFrom<HelixCategory> for Game {
    type Error = AppError;

    fn try_from(item: HelixCategory) -> Result<Self, Self::Error> {
        require_id("category", &item.id)?;

        Ok(Game {
            id: item.id,
            name: item.name,
            box_art_url: item.box_art_url,
        })
    }
}

impl TryFrom<HelixVideo> for Video {
    type Error = AppError;

    fn try_from(item: HelixVideo) -> Result<Self, Self::Error> {
        require_id("video", &item.id)?;

        let url = Url::parse(&item.url).map_err(|e| {
            tracing::warn!("Upstream video {} has an invalid url: {:?}", item.id, e);
            AppError::UpstreamRequest(
                anyhow::Error::new(e).context(format!("video {} has an invalid url", item.id)),
            )
        })?;

        Ok(Video {
            thumbnail_url: resolve_thumbnail(&item.thumbnail_url),
            id: item.id,
            title: item.title,
            created_at: item.created_at,
            url,
        })
    }
}

impl TryFrom<Vec<HelixCategory>> for GameList {
    type Error = AppError;

    fn try_from(items: Vec<HelixCategory>) -> Result<Self, Self::Error> {
        let data = items
            .into_iter()
            .map(Game::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(GameList { data })
    }
}

impl TryFrom<Vec<HelixVideo>> for VideoList {
    type Error = AppError;

    fn try_from(items: Vec<HelixVideo>) -> Result<Self, Self::Error> {
        let data = items
            .into_iter()
            .map(Video::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VideoList { data })
    }
}
