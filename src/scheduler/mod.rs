//! Auto-sync scheduler.
//!
//! A recurring tick walks every approved partner, resolves its trading
//! accounts, builds the partner's rule map once, and ingests each live
//! account over a fixed lookback window with bounded fan-out. One pass is
//! a plain async function (`run_sync_pass`) so a tick can be driven
//! synchronously from tests or from the manual trigger endpoint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use metrics::{counter, histogram};
use serde::Serialize;
use sqlx::PgPool;
use tokio::time::sleep;

use crate::db::{account_repo, partner_repo, rule_repo};
use crate::ingestion::{ingest_account, SyncWindow};
use crate::mt5::Mt5Client;

/// Outcome of one full pass over all approved partners.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassSummary {
    pub finished_at: Option<DateTime<Utc>>,
    pub partners: usize,
    pub accounts: usize,
    pub trades_upserted: usize,
    pub errors: usize,
}

/// Overlap guard plus last-pass bookkeeping, shared with the control API.
#[derive(Debug, Default)]
pub struct SyncController {
    running: AtomicBool,
    last_pass: Mutex<Option<PassSummary>>,
}

impl SyncController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the running flag. Returns false when a pass is already in
    /// flight — the caller skips its tick.
    pub fn try_begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn finish(&self, summary: PassSummary) {
        *self.last_pass.lock().expect("sync state lock poisoned") = Some(summary);
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn last_pass(&self) -> Option<PassSummary> {
        self.last_pass
            .lock()
            .expect("sync state lock poisoned")
            .clone()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
    pub lookback_days: i64,
    pub page_size: u32,
    pub concurrency: usize,
}

/// Drive sync passes forever. A pass that fails entirely is logged and the
/// next tick proceeds regardless.
pub async fn run_auto_sync(
    client: Mt5Client,
    pool: PgPool,
    controller: std::sync::Arc<SyncController>,
    config: SchedulerConfig,
) {
    tracing::info!(
        interval_secs = config.interval_secs,
        lookback_days = config.lookback_days,
        "auto-sync scheduler started"
    );

    loop {
        sleep(Duration::from_secs(config.interval_secs)).await;

        if !controller.try_begin() {
            tracing::warn!("previous sync pass still running, skipping tick");
            continue;
        }

        let summary = match run_sync_pass(&client, &pool, config).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(error = %e, "sync pass failed");
                counter!("sync_pass_failures_total").increment(1);
                PassSummary {
                    finished_at: Some(Utc::now()),
                    errors: 1,
                    ..Default::default()
                }
            }
        };
        controller.finish(summary);
    }
}

/// One pass over all approved partners.
pub async fn run_sync_pass(
    client: &Mt5Client,
    pool: &PgPool,
    config: SchedulerConfig,
) -> anyhow::Result<PassSummary> {
    let started = std::time::Instant::now();
    let partners = partner_repo::get_approved_partners(pool).await?;
    let window = SyncWindow::trailing_days(config.lookback_days);

    let mut summary = PassSummary {
        partners: partners.len(),
        ..Default::default()
    };

    for partner in &partners {
        let accounts = match account_repo::for_partner(pool, partner.id).await {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::error!(partner = %partner.email, error = %e, "failed to resolve accounts");
                summary.errors += 1;
                continue;
            }
        };

        let assignments = match rule_repo::for_partner(pool, partner.id).await {
            Ok(assignments) => assignments,
            Err(e) => {
                tracing::error!(partner = %partner.email, error = %e, "failed to load rules");
                summary.errors += 1;
                continue;
            }
        };
        // One map per partner per pass, reused across all its accounts.
        let rule_map = crate::commission::RuleMap::for_partner(partner, &assignments);

        let live: Vec<_> = accounts.into_iter().filter(|a| !a.is_demo()).collect();
        summary.accounts += live.len();

        // Index into `live` rather than taking `&account` as the mapping
        // closure's argument: a reference-typed closure parameter whose
        // returned future also borrows it defeats higher-ranked lifetime
        // inference when this pass is driven from a spawned task.
        let live_ref = &live;
        let results: Vec<_> = stream::iter((0..live.len()).map(|i| {
            ingest_one(client, pool, &live_ref[i], window, &rule_map, config.page_size)
        }))
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

        for (account, result) in results {
            match result {
                Ok(stats) => summary.trades_upserted += stats.upserted,
                Err(e) => {
                    summary.errors += 1;
                    counter!("broker_errors_total").increment(1);
                    tracing::warn!(
                        account_id = %account.account_id,
                        error = %e,
                        "account sync failed, will retry next tick"
                    );
                }
            }
        }
    }

    summary.finished_at = Some(Utc::now());
    counter!("sync_passes_total").increment(1);
    histogram!("sync_pass_duration_seconds").record(started.elapsed().as_secs_f64());

    tracing::info!(
        partners = summary.partners,
        accounts = summary.accounts,
        trades_upserted = summary.trades_upserted,
        errors = summary.errors,
        "sync pass finished"
    );

    Ok(summary)
}

/// Ingest a single account, pairing the outcome back with the account.
/// Extracted as a named `async fn` so the returned future carries a
/// higher-ranked lifetime through its signature (needed when the pass is
/// driven from a spawned task).
async fn ingest_one<'a>(
    client: &'a Mt5Client,
    pool: &'a PgPool,
    account: &'a crate::models::TradingAccount,
    window: SyncWindow,
    rule_map: &'a crate::commission::RuleMap,
    page_size: u32,
) -> (
    &'a crate::models::TradingAccount,
    anyhow::Result<crate::ingestion::SyncStats>,
) {
    let result = ingest_account(client, pool, account, window, rule_map, page_size).await;
    (account, result)
}
