use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::commission::group_key::is_demo_group;

/// A broker trading account linked to a partner
/// (the `trading_accounts` table).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TradingAccount {
    pub id: Uuid,
    /// Broker-side login, the key used against the MT5 API.
    pub account_id: String,
    pub ib_request_id: Option<Uuid>,
    /// Email of the trader owning the account. Equal to the partner's own
    /// email when the partner trades for themselves.
    pub owner_email: Option<String>,
    pub account_type: Option<String>,
    /// Last broker group resolved for this account.
    pub group_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TradingAccount {
    /// Demo/paper accounts are excluded from commission and balance
    /// aggregation. One predicate, applied everywhere.
    pub fn is_demo(&self) -> bool {
        self.account_type.as_deref().map(is_demo_group).unwrap_or(false)
            || self.group_id.as_deref().map(is_demo_group).unwrap_or(false)
    }
}
