use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An IB partner application / account (the `ib_requests` table).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IbPartner {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: String,
    pub ib_type: Option<String>,
    /// Legacy single-group commission defaults, used as a wildcard rule
    /// when a partner has no explicit group assignments.
    pub usd_per_lot: Decimal,
    pub spread_percentage_per_lot: Decimal,
    pub referral_code: Option<String>,
    pub referred_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IbPartner {
    pub fn is_approved(&self) -> bool {
        self.status == PartnerStatus::Approved.as_str()
    }
}

/// Partner lifecycle: pending -> approved | rejected | banned.
/// Re-application from rejected resets to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerStatus {
    Pending,
    Approved,
    Rejected,
    Banned,
}

impl PartnerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartnerStatus::Pending => "pending",
            PartnerStatus::Approved => "approved",
            PartnerStatus::Rejected => "rejected",
            PartnerStatus::Banned => "banned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PartnerStatus::Pending),
            "approved" => Some(PartnerStatus::Approved),
            "rejected" => Some(PartnerStatus::Rejected),
            "banned" => Some(PartnerStatus::Banned),
            _ => None,
        }
    }
}
