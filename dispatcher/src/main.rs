use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use dispatcher::actors::drain;
use dispatcher::api;
use dispatcher::app_state::AppState;
use dispatcher::audit_store::SqliteAuditStore;
use dispatcher::config::Config;
use dispatcher::db;
use dispatcher::model_client::HttpModelClient;
use dispatcher::project_config::{seed_from_catalog, ProjectCatalog, SqliteConfigResolver};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dispatcher=debug,tower_http=info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin {origin}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    tracing::info!(
        bind = %config.bind,
        port = config.port,
        database_url = %config.database_url,
        protocol = ?config.model_protocol,
        "Starting dispatcher"
    );

    let pool = db::connect(&config.database_url).await?;

    if let Some(path) = &config.project_catalog {
        let catalog = ProjectCatalog::load(path)?;
        let seeded = seed_from_catalog(&pool, &catalog)
            .await
            .context("Failed to seed project catalog")?;
        tracing::info!(path = %path.display(), projects = seeded, "Project catalog seeded");
    }

    let client = HttpModelClient::new(config.model_client_options())
        .context("Failed to build model HTTP client")?;
    let app_state = AppState::new(
        Arc::new(client),
        Arc::new(SqliteConfigResolver::new(pool.clone())),
        Arc::new(SqliteAuditStore::new(pool.clone())),
    )
    .await
    .context("Failed to spawn head auditor")?;

    let app = api::router()
        .with_state(app_state.clone())
        .layer(cors_layer(&config.cors_origins)?)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let auditor = app_state.auditor();
    match drain(&auditor, config.shutdown_drain_timeout).await {
        Some(stats) => {
            tracing::info!(
                recorded = stats.recorded,
                failed = stats.failed,
                "Pending shadow notes drained"
            );
            auditor.stop(None);
        }
        None => auditor.kill(),
    }
    pool.close().await;

    Ok(())
}
