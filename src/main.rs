use std::sync::Arc;
use std::time::Duration;

use ibportal::api::router::create_router;
use ibportal::commission::AnalyticsCache;
use ibportal::config::AppConfig;
use ibportal::mt5::Mt5Client;
use ibportal::scheduler::{self, SchedulerConfig, SyncController};
use ibportal::{db, metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database connected");

    let metrics_handle = metrics::init_metrics();

    let mt5 = Mt5Client::new(reqwest::Client::new(), config.mt5_base_url.clone());
    let sync = Arc::new(SyncController::new());

    if config.sync_enabled {
        let scheduler_config = SchedulerConfig {
            interval_secs: config.sync_interval_secs,
            lookback_days: config.sync_lookback_days,
            page_size: config.sync_page_size,
            concurrency: config.sync_concurrency,
        };
        let client = mt5.clone();
        let scheduler_pool = pool.clone();
        let controller = sync.clone();
        tokio::spawn(async move {
            scheduler::run_auto_sync(client, scheduler_pool, controller, scheduler_config).await;
        });
    } else {
        tracing::info!("Auto-sync disabled (SYNC_ENABLED=false)");
    }

    let state = AppState {
        db: pool,
        cache: Arc::new(AnalyticsCache::new(Duration::from_secs(
            config.cache_ttl_secs,
        ))),
        config,
        mt5,
        sync,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
