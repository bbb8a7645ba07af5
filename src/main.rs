use std::{sync::Arc, time::Duration};

use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use campus_exchange::{config::Config, routes, storage::LocalImageStore, AppState};
use moka::future::Cache;
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let images = Arc::new(LocalImageStore::create(config.upload_dir.clone(), "/uploads").await?);

    let state = AppState {
        pool,
        jwt_secret: config.jwt_secret.clone(),
        images,
        exchange_points_cache: Cache::builder()
            .time_to_live(Duration::from_secs(300))
            .build(),
    };

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = routes::router()
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(prometheus_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    info!("listening on {}", config.bind_addr);
    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
