//! Wire types for the broker REST API.
//!
//! The upstream is loosely typed: numeric fields arrive as numbers or as
//! strings, and any field can be missing. Everything is coerced on the way
//! in — a malformed field degrades to zero/empty rather than failing the
//! whole payload.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::OrderSide;

// ---------------------------------------------------------------------------
// Trade history endpoint
// ---------------------------------------------------------------------------

/// `GET /api/client/tradehistory/trades` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeHistoryPage {
    #[serde(rename = "Items", default)]
    pub items: Vec<RawTradeItem>,
}

/// One raw trade row as the broker reports it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawTradeItem {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub order_id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_type: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub volume: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub open_price: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub close_price: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub profit: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub take_profit: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub stop_loss: Decimal,
    #[serde(default)]
    pub close_time: Option<Value>,
}

impl RawTradeItem {
    pub fn side(&self) -> Option<OrderSide> {
        OrderSide::from_api_str(&self.order_type)
    }

    pub fn close_time(&self) -> Option<DateTime<Utc>> {
        parse_flexible_timestamp(self.close_time.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Client profile endpoint
// ---------------------------------------------------------------------------

/// `GET /api/Users/{accountId}/getClientProfile` response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileEnvelope {
    #[serde(rename = "Success", default)]
    pub success: bool,
    #[serde(rename = "Data", default)]
    pub data: Option<ClientProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientProfile {
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub balance: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub equity: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub margin: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub profit: Decimal,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub leverage: i64,
}

// ---------------------------------------------------------------------------
// Lenient field coercion
// ---------------------------------------------------------------------------

fn lenient_decimal<'de, D: Deserializer<'de>>(de: D) -> Result<Decimal, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(coerce_decimal(value.as_ref()))
}

fn lenient_i64<'de, D: Deserializer<'de>>(de: D) -> Result<i64, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn coerce_decimal(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::Number(n)) => n.to_string().parse().unwrap_or(Decimal::ZERO),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

/// The broker reports timestamps as epoch seconds, epoch milliseconds,
/// numeric strings, RFC 3339, or a bare `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_flexible_timestamp(ts: Option<&Value>) -> Option<DateTime<Utc>> {
    ts.and_then(|t| match t {
        Value::Number(n) => {
            let secs = n.as_i64()?;
            from_epoch(secs)
        }
        Value::String(s) => {
            if let Ok(secs) = s.parse::<i64>() {
                return from_epoch(secs);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                .ok()
                .map(|naive| naive.and_utc())
        }
        _ => None,
    })
}

fn from_epoch(secs: i64) -> Option<DateTime<Utc>> {
    // If >1e12, it's milliseconds.
    if secs > 1_000_000_000_000 {
        DateTime::from_timestamp(secs / 1000, ((secs % 1000) * 1_000_000) as u32)
    } else {
        DateTime::from_timestamp(secs, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_numeric_fields_as_strings() {
        let item: RawTradeItem = serde_json::from_value(json!({
            "OrderId": "123456",
            "Symbol": "EURUSD",
            "OrderType": "0",
            "Volume": "0.5",
            "OpenPrice": 1.1000,
            "ClosePrice": "1.1050",
            "Profit": -12.5,
        }))
        .unwrap();

        assert_eq!(item.order_id, 123456);
        assert_eq!(item.volume, Decimal::new(5, 1));
        assert_eq!(item.close_price, Decimal::new(11050, 4));
        assert_eq!(item.profit, Decimal::new(-125, 1));
        assert_eq!(item.side(), Some(crate::models::OrderSide::Buy));
    }

    #[test]
    fn test_missing_fields_default() {
        let item: RawTradeItem = serde_json::from_value(json!({})).unwrap();
        assert_eq!(item.order_id, 0);
        assert!(item.symbol.is_empty());
        assert_eq!(item.volume, Decimal::ZERO);
        assert!(item.side().is_none());
        assert!(item.close_time().is_none());
    }

    #[test]
    fn test_garbage_numeric_degrades_to_zero() {
        let item: RawTradeItem = serde_json::from_value(json!({
            "Volume": "n/a",
            "OpenPrice": null,
        }))
        .unwrap();
        assert_eq!(item.volume, Decimal::ZERO);
        assert_eq!(item.open_price, Decimal::ZERO);
    }

    #[test]
    fn test_missing_items_array_defaults_empty() {
        let page: TradeHistoryPage = serde_json::from_value(json!({})).unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_close_time_variants() {
        let epoch = json!(1_700_000_000);
        let millis = json!(1_700_000_000_000i64);
        let iso = json!("2023-11-14T22:13:20Z");
        let bare = json!("2023-11-14T22:13:20");

        let expected = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(parse_flexible_timestamp(Some(&epoch)), Some(expected));
        assert_eq!(parse_flexible_timestamp(Some(&millis)), Some(expected));
        assert_eq!(parse_flexible_timestamp(Some(&iso)), Some(expected));
        assert_eq!(parse_flexible_timestamp(Some(&bare)), Some(expected));
        assert_eq!(parse_flexible_timestamp(None), None);
    }

    #[test]
    fn test_profile_envelope() {
        let envelope: ProfileEnvelope = serde_json::from_value(json!({
            "Success": true,
            "Data": {
                "Balance": "1050.25",
                "Equity": 1100,
                "Group": "Bbook\\Standard\\USD",
                "AccountType": "live",
                "Leverage": "500",
            }
        }))
        .unwrap();

        assert!(envelope.success);
        let profile = envelope.data.unwrap();
        assert_eq!(profile.balance, Decimal::new(105025, 2));
        assert_eq!(profile.group.as_deref(), Some("Bbook\\Standard\\USD"));
        assert_eq!(profile.leverage, 500);
    }
}
