use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A commission rule binding one partner to one broker group
/// (the `group_assignments` table).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupAssignment {
    pub id: Uuid,
    pub ib_request_id: Uuid,
    /// Raw broker group path, e.g. `Bbook\Standard\USD`.
    pub group_id: String,
    pub group_name: Option<String>,
    pub structure_id: Option<String>,
    pub structure_name: Option<String>,
    pub usd_per_lot: Decimal,
    /// Percentage of traded volume paid as spread share, 0..=100.
    pub spread_share_percentage: Decimal,
    pub created_at: Option<DateTime<Utc>>,
}
