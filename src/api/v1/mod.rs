//! API Version 1 endpoints

pub mod routes;
pub mod twitch;
pub mod watched_videos;
