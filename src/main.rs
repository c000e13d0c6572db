mod api;
mod config;
mod db;
mod errors;
mod system;
mod twitch;

#[cfg(test)]
mod test_support;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::get;
use axum::Router;
use axum_prometheus::PrometheusMetricLayer;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::api::common::tracing::{
    make_custom_span, on_custom_failure, on_custom_request, on_custom_response,
};
use crate::config::Config;
use crate::db::{init_db, PgWatchStore, WatchStore};
use crate::twitch::client::TwitchClient;

#[derive(Clone)]
pub struct InnerState {
    pub twitch: TwitchClient,
    pub store: Arc<dyn WatchStore>,
}

fn routes(state: InnerState) -> Router {
    Router::new()
        .merge(system::create_system_router())
        .merge(api::create_api_router(state))
}

/// CORS and request tracing; applies to every route already on `router`.
fn with_http_layers(router: Router) -> Router {
    router
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| make_custom_span(request))
                .on_request(|request: &Request<Body>, span: &Span| {
                    on_custom_request(request, span)
                })
                .on_response(|response: &Response<Body>, latency: Duration, span: &Span| {
                    on_custom_response(response, latency, span)
                })
                .on_failure(
                    |error: ServerErrorsFailureClass, latency: Duration, span: &Span| {
                        on_custom_failure(error, latency, span)
                    },
                ),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {:?}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_visitwitch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| {
        tracing::error!("Refusing to start: {}", e);
        e
    })?;

    let pool = init_db(&config).await?;
    let twitch = TwitchClient::new(&config)?;

    let state = InnerState {
        twitch,
        store: Arc::new(PgWatchStore::new(pool.clone())),
    };

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    // The recorder is process-global, so `/metrics` is only mounted here.
    let app = with_http_layers(
        routes(state).route("/metrics", get(|| async move { metric_handle.render() })),
    )
    .layer(prometheus_layer);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Database pool closed, bye");

    Ok(())
}
