pub mod account;
pub mod partner;
pub mod rule;
pub mod trade;
pub mod withdrawal;

pub use account::TradingAccount;
pub use partner::{IbPartner, PartnerStatus};
pub use rule::GroupAssignment;
pub use trade::Trade;
pub use withdrawal::{Withdrawal, WithdrawalStatus};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// OrderSide
// ---------------------------------------------------------------------------

/// Direction of a broker order. Anything that is not a plain buy/sell
/// (balance operations, credits, adjustments) is rejected at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The broker reports order types either as names or as MT5 numeric
    /// codes (0 = buy, 1 = sell).
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "0" => Some(OrderSide::Buy),
            "sell" | "1" => Some(OrderSide::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_side_from_api_str() {
        assert_eq!(OrderSide::from_api_str("buy"), Some(OrderSide::Buy));
        assert_eq!(OrderSide::from_api_str("SELL"), Some(OrderSide::Sell));
        assert_eq!(OrderSide::from_api_str("0"), Some(OrderSide::Buy));
        assert_eq!(OrderSide::from_api_str("1"), Some(OrderSide::Sell));
        assert_eq!(OrderSide::from_api_str("balance"), None);
        assert_eq!(OrderSide::from_api_str("credit"), None);
        assert_eq!(OrderSide::from_api_str(""), None);
    }
}
