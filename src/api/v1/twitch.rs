use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{de, Deserialize, Deserializer};

use crate::errors::AppError;
use crate::twitch::models::{GameList, VideoList};
use crate::InnerState;

/// `max_results=true` walks every page; otherwise a single page is returned.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub max_results: bool,
}

/// Accepts the spellings existing clients send: `1`/`0`, `yes`/`no`,
/// `on`/`off`, `t`/`f`, `y`/`n` and `true`/`false`, in any case.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => Err(de::Error::invalid_value(
            de::Unexpected::Str(&raw),
            &"a boolean such as true, false, 1, 0, yes or no",
        )),
    }
}

#[tracing::instrument(name = "Search games", skip(inner))]
pub async fn search_games(
    State(inner): State<InnerState>,
    Path(game_name): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<GameList>, AppError> {
    let games = inner
        .twitch
        .search_games(&game_name, params.max_results)
        .await?;
    Ok(Json(games))
}

#[tracing::instrument(name = "Get videos for game", skip(inner))]
pub async fn videos_for_game(
    State(inner): State<InnerState>,
    Path(game_id): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<VideoList>, AppError> {
    let videos = inner
        .twitch
        .videos_for_game(&game_id, params.max_results)
        .await?;
    Ok(Json(videos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    fn parse(query: &str) -> Option<bool> {
        let uri: Uri = format!("/twitch-games/zelda{query}").parse().unwrap();
        Query::<SearchParams>::try_from_uri(&uri)
            .ok()
            .map(|Query(params)| params.max_results)
    }

    #[test]
    fn max_results_accepts_common_boolean_spellings() {
        for truthy in ["true", "True", "1", "yes", "on", "Y"] {
            assert_eq!(parse(&format!("?max_results={truthy}")), Some(true), "{truthy}");
        }
        for falsy in ["false", "FALSE", "0", "no", "off", "n"] {
            assert_eq!(parse(&format!("?max_results={falsy}")), Some(false), "{falsy}");
        }
    }

    #[test]
    fn max_results_defaults_to_a_single_page() {
        assert_eq!(parse(""), Some(false));
    }

    #[test]
    fn max_results_rejects_other_values() {
        assert_eq!(parse("?max_results=maybe"), None);
    }
}
