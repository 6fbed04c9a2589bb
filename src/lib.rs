pub mod api;
pub mod commission;
pub mod config;
pub mod db;
pub mod errors;
pub mod ingestion;
pub mod metrics;
pub mod models;
pub mod mt5;
pub mod scheduler;

use std::sync::Arc;

use crate::commission::AnalyticsCache;
use crate::config::AppConfig;
use crate::mt5::Mt5Client;
use crate::scheduler::SyncController;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: AppConfig,
    pub mt5: Mt5Client,
    pub cache: Arc<AnalyticsCache>,
    pub sync: Arc<SyncController>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
