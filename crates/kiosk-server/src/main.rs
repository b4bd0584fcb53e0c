use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use kiosk_client::ReqwestFetcher;
use kiosk_core::{
    DEFAULT_REFRESH_MINUTES, REFRESH_MINUTES_KEY, Scheduler, ScriptSandbox, SnapshotCell,
    StatusPublisher, TracingCycleReporter, UpdateCycle,
};
use kiosk_db::{Database, DatabaseConfig};
use kiosk_server::routes;
use kiosk_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("kiosk=info".parse()?))
        .with_target(false)
        .init();

    let api_key = std::env::var("KIOSK_API_KEY").ok();
    if api_key.is_none() {
        tracing::warn!("KIOSK_API_KEY not set, API authentication is disabled");
    }
    let port = std::env::var("KIOSK_SERVER_PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");

    let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    db.migrate().await?;
    db.settings_repo()
        .init_defaults(&[(
            REFRESH_MINUTES_KEY,
            serde_json::json!(DEFAULT_REFRESH_MINUTES),
        )])
        .await?;

    let mut fetcher = ReqwestFetcher::new()?;
    if allow_private_urls() {
        tracing::info!("Private/reserved addresses are allowed for source URLs");
        fetcher = fetcher.allow_private_urls();
    }

    let cycle = UpdateCycle::new(
        db.source_repo(),
        fetcher,
        ScriptSandbox::new(),
        SnapshotCell::new(),
        StatusPublisher::new(),
    );
    let scheduler = Arc::new(Scheduler::new(cycle, db.settings_repo()));

    let cancel = CancellationToken::new();
    let scheduler_task = {
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel, &TracingCycleReporter).await })
    };

    let state = Arc::new(AppState {
        db,
        scheduler,
        api_key,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    // Let the scheduler finish any in-flight cycle before exiting.
    let _ = scheduler_task.await;

    Ok(())
}

fn allow_private_urls() -> bool {
    std::env::var("KIOSK_ALLOW_PRIVATE_URLS")
        .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

async fn shutdown_signal(cancel: CancellationToken) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
