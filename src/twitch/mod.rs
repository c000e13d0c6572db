//! Twitch Helix integration: app access tokens, cursor pagination and
//! normalization of categories and videos.

pub mod auth;
pub mod client;
pub mod models;
