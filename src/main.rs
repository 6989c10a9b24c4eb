use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use academy_billing::api::router;
use academy_billing::clock::SystemClock;
use academy_billing::config::AppConfig;
use academy_billing::db::SqliteStore;
use academy_billing::services::{BillingService, HorizonScheduler};
use academy_billing::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "academy_billing=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(SqliteStore::new(pool.clone()));
    let billing = Arc::new(BillingService::new(
        store.clone(),
        Arc::new(SystemClock),
        config.billing,
    ));

    if config.horizon_refresh_secs > 0 {
        let scheduler = HorizonScheduler::new(billing.clone(), config.horizon_refresh_secs);
        tokio::spawn(scheduler.start());
    }

    let state = AppState {
        db: pool.clone(),
        store,
        billing,
    };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
