use axum::{
    routing::{get, post},
    Router,
};

use crate::api::v1::twitch::{search_games, videos_for_game};
use crate::api::v1::watched_videos::create_watched_video;
use crate::InnerState;

#[tracing::instrument(name = "create_v1_routes", skip(state))]
pub fn create_v1_routes(state: InnerState) -> Router {
    tracing::info!("Setting up V1 API routes");

    Router::new()
        // Twitch catalog
        .route("/twitch-games/:game_name", get(search_games))
        .route("/twitch-videos/:game_id", get(videos_for_game))

        // Viewing history
        .route("/watched-videos", post(create_watched_video))
        .with_state(state)
}
