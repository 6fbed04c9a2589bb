use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::types::{ClientProfile, ProfileEnvelope, RawTradeItem, TradeHistoryPage};

/// The upstream has no SLA; every call carries a hard timeout and at most
/// one retry at a longer timeout before the account is skipped for the
/// cycle.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_TIMEOUT: Duration = Duration::from_secs(20);

/// Upper bound on history pages fetched per account per cycle.
const PAGE_CAP: u32 = 10;

#[derive(Debug, Error)]
pub enum Mt5ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone)]
pub struct Mt5Client {
    http: Client,
    base_url: String,
}

impl Mt5Client {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Fetch the client profile for a trading account. `Ok(None)` means the
    /// broker answered but reported no profile (`Success: false`).
    pub async fn get_client_profile(
        &self,
        account_id: &str,
    ) -> Result<Option<ClientProfile>, Mt5ClientError> {
        let url = format!("{}/api/Users/{}/getClientProfile", self.base_url, account_id);
        let envelope: ProfileEnvelope = self.get_json(&url, &[]).await?;
        if !envelope.success {
            return Ok(None);
        }
        Ok(envelope.data)
    }

    /// Fetch one page of trade history for an account.
    pub async fn get_trade_history_page(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RawTradeItem>, Mt5ClientError> {
        let url = format!("{}/api/client/tradehistory/trades", self.base_url);
        let body: TradeHistoryPage = self
            .get_json(
                &url,
                &[
                    ("accountId", account_id.to_string()),
                    ("page", page.to_string()),
                    ("pageSize", page_size.to_string()),
                    ("fromDate", from.format("%Y-%m-%d").to_string()),
                    ("toDate", to.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;
        Ok(body.items)
    }

    /// Fetch trade history across pages until a short page or the page cap.
    pub async fn get_trade_history(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page_size: u32,
    ) -> Result<Vec<RawTradeItem>, Mt5ClientError> {
        let mut all = Vec::new();
        for page in 1..=PAGE_CAP {
            let items = self
                .get_trade_history_page(account_id, from, to, page, page_size)
                .await?;
            let short_page = (items.len() as u32) < page_size;
            all.extend(items);
            if short_page {
                return Ok(all);
            }
        }
        tracing::warn!(
            account_id = %account_id,
            page_cap = PAGE_CAP,
            "trade history page cap reached, remainder deferred to next cycle"
        );
        Ok(all)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, Mt5ClientError> {
        let first = self
            .http
            .get(url)
            .query(query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await;

        let resp = match first {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() || e.is_connect() => {
                tracing::debug!(url = %url, error = %e, "broker call failed, retrying once");
                self.http
                    .get(url)
                    .query(query)
                    .timeout(RETRY_TIMEOUT)
                    .send()
                    .await?
            }
            Err(e) => return Err(e.into()),
        };

        let resp = resp.error_for_status()?;
        let body: T = resp.json().await?;
        Ok(body)
    }
}
