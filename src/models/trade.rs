use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for the trades ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub order_id: i64,
    pub account_id: String,
    pub ib_request_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub symbol: String,
    pub order_type: String,
    pub volume_lots: Decimal,
    pub open_price: Decimal,
    pub close_price: Option<Decimal>,
    pub profit: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub group_id: Option<String>,
    pub ib_commission: Decimal,
    pub close_time: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub synced_at: DateTime<Utc>,
}

impl Trade {
    /// A trade contributes to commission aggregation only when it has a
    /// real close price, a non-zero profit, and is a plain buy/sell.
    /// Zero-profit rows are non-closing legs: stored, never aggregated.
    pub fn is_aggregation_eligible(&self) -> bool {
        let closed = self.close_price.map(|p| !p.is_zero()).unwrap_or(false);
        let has_profit = self.profit.map(|p| !p.is_zero()).unwrap_or(false);
        let directional = matches!(self.order_type.as_str(), "buy" | "sell");
        closed && has_profit && directional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_trade() -> Trade {
        Trade {
            id: Uuid::new_v4(),
            order_id: 1,
            account_id: "100001".into(),
            ib_request_id: None,
            user_email: None,
            symbol: "EURUSD".into(),
            order_type: "buy".into(),
            volume_lots: Decimal::ONE,
            open_price: Decimal::new(11000, 4),
            close_price: Some(Decimal::new(11050, 4)),
            profit: Some(Decimal::from(50)),
            take_profit: None,
            stop_loss: None,
            group_id: Some("Bbook\\Standard\\USD".into()),
            ib_commission: Decimal::from(7),
            close_time: None,
            created_at: None,
            updated_at: None,
            synced_at: Utc::now(),
        }
    }

    #[test]
    fn test_eligible_trade() {
        assert!(base_trade().is_aggregation_eligible());
    }

    #[test]
    fn test_zero_profit_not_eligible() {
        let mut t = base_trade();
        t.profit = Some(Decimal::ZERO);
        assert!(!t.is_aggregation_eligible());
    }

    #[test]
    fn test_missing_close_not_eligible() {
        let mut t = base_trade();
        t.close_price = None;
        assert!(!t.is_aggregation_eligible());

        t.close_price = Some(Decimal::ZERO);
        assert!(!t.is_aggregation_eligible());
    }

    #[test]
    fn test_non_directional_not_eligible() {
        let mut t = base_trade();
        t.order_type = "balance".into();
        assert!(!t.is_aggregation_eligible());
    }
}
