use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Upstream authentication failed: {0:#}")]
    UpstreamAuth(#[source] anyhow::Error),

    #[error("Upstream request failed: {0:#}")]
    UpstreamRequest(#[source] anyhow::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0:#}")]
    Persistence(#[source] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Stable machine-readable tag sent alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::UpstreamAuth(_) => "upstream_auth",
            AppError::UpstreamRequest(_) => "upstream_request",
            AppError::Validation(_) => "validation",
            AppError::Persistence(_) => "persistence",
            AppError::Config(_) => "config",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UpstreamAuth(_) | AppError::UpstreamRequest(_) => StatusCode::BAD_GATEWAY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = self.to_string();

        let source_chain = match &self {
            AppError::UpstreamAuth(e) | AppError::UpstreamRequest(e) | AppError::Persistence(e) => e
                .chain()
                .skip(1)
                .map(|cause| format!("\n  Caused by: {}", cause))
                .collect::<String>(),
            _ => String::new(),
        };

        tracing::error!(
            error_kind = self.kind(),
            error_message = %error_message,
            status_code = %status,
            "Request error{}",
            source_chain
        );

        let body = Json(json!({
            "message": error_message,
            "status": status.as_u16(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Persistence(anyhow::Error::new(err).context("SQLx operation failed"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let mut context_parts = Vec::new();

        if let Some(url) = err.url() {
            // Path only, query strings carry user search input.
            context_parts.push(format!("URL: {}{}", url.origin().ascii_serialization(), url.path()));
        }

        if let Some(status) = err.status() {
            context_parts.push(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status")
            ));
        }

        let error_type = match &err {
            e if e.is_timeout() => "Request Timeout",
            e if e.is_connect() => "Connection Failed",
            e if e.is_decode() => "Response Decode Failed",
            e if e.is_redirect() => "Redirect Loop or Invalid Redirect",
            e if e.is_request() => "Invalid Request",
            e if e.is_body() => "Request Body Error",
            _ => "Unknown HTTP Error",
        };
        context_parts.push(format!("Type: {}", error_type));

        let context = format!("External HTTP request failed - {}", context_parts.join(", "));

        tracing::debug!(
            error = %err,
            status = ?err.status(),
            is_timeout = err.is_timeout(),
            is_connect = err.is_connect(),
            is_decode = err.is_decode(),
            "HTTP request failed with detailed context"
        );

        AppError::UpstreamRequest(anyhow::Error::new(err).context(context))
    }
}
