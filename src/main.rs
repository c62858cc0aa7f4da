use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use reservehub::config::AppConfig;
use reservehub::db;
use reservehub::handlers;
use reservehub::services::booking;
use reservehub::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    anyhow::ensure!(
        config.platform_fee_percent >= rust_decimal::Decimal::ZERO
            && config.platform_fee_percent <= rust_decimal::Decimal::ONE_HUNDRED,
        "PLATFORM_FEE_PERCENT must be between 0 and 100"
    );

    let conn = db::init_db(&config.database_url)?;
    let state = Arc::new(AppState::new(conn, config.clone()));

    spawn_completion_sweep(Arc::clone(&state), config.completion_sweep_secs);

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically moves ended confirmed bookings to `completed`.
fn spawn_completion_sweep(state: Arc<AppState>, every_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(every_secs.max(1)));
        loop {
            ticker.tick().await;
            let result = state
                .db()
                .and_then(|mut db| booking::complete_due_reservations(&mut db, Utc::now()));
            if let Err(e) = result {
                tracing::error!(error = %e, "completion sweep failed");
            }
        }
    });
}
