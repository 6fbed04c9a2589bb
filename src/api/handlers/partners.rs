use axum::extract::{Path, Query, State};
use axum::Json;
use base64::Engine;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::{account_repo, partner_repo, rule_repo};
use crate::errors::AppError;
use crate::models::{IbPartner, PartnerStatus, TradingAccount};
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

/// GET /api/partners — admin listing.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<IbPartner>>>, AppError> {
    let status = match &query.status {
        Some(s) => Some(
            PartnerStatus::from_str(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status: {s}")))?,
        ),
        None => None,
    };

    let partners = partner_repo::list_partners(&state.db, status.map(|s| s.as_str())).await?;
    Ok(Json(ApiResponse::ok(partners)))
}

#[derive(Deserialize)]
pub struct ApplyRequest {
    pub email: String,
    pub password: String,
    pub ib_type: Option<String>,
    /// Referral code of the introducing partner, if any.
    pub referral_code: Option<String>,
}

/// POST /api/partners — submit (or re-submit) an application.
pub async fn apply(
    State(state): State<AppState>,
    Json(body): Json<ApplyRequest>,
) -> Result<Json<ApiResponse<IbPartner>>, AppError> {
    let email = body.email.trim().to_lowercase();
    if !email.contains('@') || !email.contains('.') {
        return Err(AppError::BadRequest("invalid email address".into()));
    }
    if body.password.len() < 8 {
        return Err(AppError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    let referred_by = match body.referral_code.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => {
            if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(AppError::BadRequest("invalid referral code format".into()));
            }
            let referrer = partner_repo::get_by_referral_code(&state.db, code)
                .await?
                .ok_or_else(|| AppError::BadRequest("unknown referral code".into()))?;
            Some(referrer.id)
        }
    };

    let password_hash = hash_password(&body.password);

    if let Some(existing) = partner_repo::get_by_email(&state.db, &email).await? {
        // Rejected applicants may re-apply; anyone else already holds the
        // address.
        return match partner_repo::reapply(&state.db, existing.id, &password_hash).await? {
            Some(partner) => {
                tracing::info!(email = %partner.email, "rejected partner re-applied");
                Ok(Json(ApiResponse::ok(partner)))
            }
            None => Err(AppError::Conflict("email is already registered".into())),
        };
    }

    let referral_code = generate_referral_code();
    let partner = partner_repo::create_partner(
        &state.db,
        &email,
        &password_hash,
        body.ib_type.as_deref(),
        &referral_code,
        referred_by,
    )
    .await?;

    tracing::info!(email = %partner.email, "partner application submitted");
    Ok(Json(ApiResponse::ok(partner)))
}

#[derive(Deserialize)]
pub struct GroupInput {
    pub group_id: String,
    pub group_name: Option<String>,
    pub structure_id: Option<String>,
    pub structure_name: Option<String>,
    pub usd_per_lot: Decimal,
    pub spread_share_percentage: Decimal,
}

#[derive(Deserialize)]
pub struct ApproveRequest {
    #[serde(default)]
    pub groups: Vec<GroupInput>,
    /// Optional legacy default rates, kept as the wildcard fallback.
    pub usd_per_lot: Option<Decimal>,
    pub spread_percentage_per_lot: Option<Decimal>,
}

/// POST /api/partners/:id/approve — approve and replace the rule set.
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ApproveRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    for group in &body.groups {
        if group.group_id.trim().is_empty() {
            return Err(AppError::BadRequest("group_id must not be empty".into()));
        }
        if group.usd_per_lot < Decimal::ZERO {
            return Err(AppError::BadRequest("usd_per_lot must not be negative".into()));
        }
        if group.spread_share_percentage < Decimal::ZERO
            || group.spread_share_percentage > Decimal::ONE_HUNDRED
        {
            return Err(AppError::BadRequest(
                "spread_share_percentage must be between 0 and 100".into(),
            ));
        }
    }

    let partner = partner_repo::set_status(&state.db, id, PartnerStatus::Approved)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("partner {id} not found")))?;

    if let (Some(usd), Some(pct)) = (body.usd_per_lot, body.spread_percentage_per_lot) {
        partner_repo::set_default_rates(&state.db, partner.id, usd, pct).await?;
    }

    let rules: Vec<rule_repo::NewAssignment> = body
        .groups
        .iter()
        .map(|g| rule_repo::NewAssignment {
            group_id: g.group_id.trim().to_string(),
            group_name: g.group_name.clone(),
            structure_id: g.structure_id.clone(),
            structure_name: g.structure_name.clone(),
            usd_per_lot: g.usd_per_lot,
            spread_share_percentage: g.spread_share_percentage,
        })
        .collect();
    let assignments = rule_repo::replace_for_partner(&state.db, partner.id, &rules).await?;

    tracing::info!(
        email = %partner.email,
        groups = assignments.len(),
        "partner approved"
    );

    Ok(Json(json!({
        "success": true,
        "data": { "partner": partner, "groups": assignments }
    })))
}

#[derive(Deserialize)]
pub struct LinkAccountRequest {
    pub account_id: String,
    pub owner_email: Option<String>,
    pub account_type: Option<String>,
}

/// POST /api/partners/:id/accounts — link a broker trading account to a
/// partner so the scheduler picks it up.
pub async fn link_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<LinkAccountRequest>,
) -> Result<Json<ApiResponse<TradingAccount>>, AppError> {
    let account_id = body.account_id.trim();
    if account_id.is_empty() {
        return Err(AppError::BadRequest("account_id must not be empty".into()));
    }

    let partner = partner_repo::get_partner(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("partner {id} not found")))?;

    let owner_email = body
        .owner_email
        .as_deref()
        .unwrap_or(partner.email.as_str());
    let account = account_repo::upsert_account(
        &state.db,
        account_id,
        Some(partner.id),
        Some(owner_email),
        body.account_type.as_deref(),
    )
    .await?;

    tracing::info!(
        partner = %partner.email,
        account_id = %account.account_id,
        "trading account linked"
    );
    Ok(Json(ApiResponse::ok(account)))
}

/// POST /api/partners/:id/reject
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<IbPartner>>, AppError> {
    transition(&state, id, PartnerStatus::Rejected).await
}

/// POST /api/partners/:id/ban
pub async fn ban(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<IbPartner>>, AppError> {
    transition(&state, id, PartnerStatus::Banned).await
}

/// Rejection and ban both clear the partner's rule set so no further
/// commission accrues.
async fn transition(
    state: &AppState,
    id: Uuid,
    status: PartnerStatus,
) -> Result<Json<ApiResponse<IbPartner>>, AppError> {
    let partner = partner_repo::set_status(&state.db, id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("partner {id} not found")))?;

    rule_repo::clear_for_partner(&state.db, partner.id).await?;

    tracing::info!(email = %partner.email, status = %partner.status, "partner status changed");
    Ok(Json(ApiResponse::ok(partner)))
}

fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(digest)
}

fn generate_referral_code() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_is_stable() {
        assert_eq!(hash_password("secret123"), hash_password("secret123"));
        assert_ne!(hash_password("secret123"), hash_password("secret124"));
    }

    #[test]
    fn test_generate_referral_code_shape() {
        let code = generate_referral_code();
        assert_eq!(code.len(), 10);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
