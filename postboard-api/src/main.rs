use listing::{
    DEFAULT_LISTING_CACHE_TTL_SECONDS, DEFAULT_LISTING_WINDOW, ListingConfig,
    metrics::{LikesLatency, create_meter},
};
use opentelemetry_sdk::{error::OTelSdkError, metrics::SdkMeterProvider};
use opentelemetry_stdout::MetricExporter;
use postboard_common::util::{NonPositiveDurationError, PositiveDuration};
use postboard_db::{
    client::DbClient,
    kv::{KvClient, KvError},
};
use serde::Deserialize;
use server::ServerState;
use sqlx::postgres::PgPoolOptions;
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU64,
};
use thiserror::Error;
use time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod listing;
mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Invalid listing cache TTL: {0}")]
    CacheTtl(#[from] NonPositiveDurationError),
    #[error("Error connecting to the database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Error connecting to the key-value store: {0}")]
    KeyValue(#[from] KvError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
    #[error("Error flushing metrics: {0}")]
    Metrics(#[from] OTelSdkError),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    redis_url: String,
    #[serde(default = "default_listing_window")]
    listing_window: NonZeroU64,
    #[serde(default = "default_listing_cache_ttl_seconds")]
    listing_cache_ttl_seconds: i64,
}

fn default_listing_window() -> NonZeroU64 {
    DEFAULT_LISTING_WINDOW
}

fn default_listing_cache_ttl_seconds() -> i64 {
    DEFAULT_LISTING_CACHE_TTL_SECONDS
}

impl Env {
    fn listing_config(&self) -> Result<ListingConfig, InitError> {
        let cache_ttl =
            PositiveDuration::try_from(Duration::seconds(self.listing_cache_ttl_seconds))?;

        Ok(ListingConfig {
            window: self.listing_window,
            cache_ttl,
        })
    }
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "postboard_api=debug,\
                postboard_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Metrics go to stdout every `OTEL_METRIC_EXPORT_INTERVAL` milliseconds.
fn install_metrics() -> SdkMeterProvider {
    SdkMeterProvider::builder()
        .with_periodic_exporter(MetricExporter::default())
        .build()
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Could not listen for ctrl-c, graceful shutdown is unavailable");
        return;
    }

    info!("Shutdown requested");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let meter_provider = install_metrics();
    let env = get_env()?;
    let listing_config = env.listing_config()?;

    let pool = PgPoolOptions::new().connect(&env.database_url).await?;
    let kv_client = KvClient::connect(&env.redis_url).await?;
    let db_client = DbClient::new(pool.clone());
    info!(?listing_config, "Connected to stores");

    let likes_latency = LikesLatency::new(&create_meter(&meter_provider));

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes()
        .layer(tracing_layer)
        .with_state(ServerState::new(
            db_client,
            kv_client,
            listing_config,
            likes_latency,
        ));

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    pool.close().await;
    meter_provider.shutdown()?;
    Ok(())
}
