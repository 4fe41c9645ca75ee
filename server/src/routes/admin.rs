//! Back-office routes. Mounted under `/api/admin` behind
//! [`crate::auth::require_admin`].

use super::{account_ref, AccountBody};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use empire_license::{ApproveOutcome, OrderStatus};
use empire_types::FieldError;
use serde::Deserialize;
use serde_json::{json, Value};

// ── Orders ──

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    status: Option<String>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrdersQuery>,
) -> ApiResult<Json<Value>> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(s) => Some(
            s.parse::<OrderStatus>()
                .map_err(|e| ApiError::bad_request("invalid_status", e))?,
        ),
    };
    let orders = state.orders.list_orders(status).await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

#[derive(Debug, Deserialize)]
pub struct OrderIdBody {
    id: Option<i64>,
}

pub async fn approve_order(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<OrderIdBody>,
) -> ApiResult<Json<Value>> {
    let id = body.id.ok_or(FieldError::missing("id"))?;

    let body = match state.issuer.approve_order(id).await? {
        ApproveOutcome::Issued {
            order_id,
            issued_key,
            email,
        } => json!({
            "success": true,
            "orderId": order_id,
            "issuedKey": issued_key,
            "email": email,
        }),
        ApproveOutcome::NotPending {
            order_id,
            status,
            issued_key,
        } => json!({
            "success": true,
            "reason": "not_pending",
            "orderId": order_id,
            "status": status,
            "issuedKey": issued_key,
        }),
    };
    Ok(Json(body))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<OrderIdBody>,
) -> ApiResult<Json<Value>> {
    let id = body.id.ok_or(FieldError::missing("id"))?;
    state.orders.cancel_order(id).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

pub async fn list_license_keys(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Value>> {
    let items = state.orders.list_license_keys(query.limit).await?;
    Ok(Json(json!({ "success": true, "items": items })))
}

// ── Bans and warnings ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceBody {
    device_id: Option<String>,
    is_banned: Option<bool>,
}

pub async fn warn_device(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<DeviceBody>,
) -> ApiResult<Json<Value>> {
    let affected = state
        .moderation
        .warn_device(body.device_id.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(json!({ "success": true, "affectedAccounts": affected })))
}

pub async fn clear_warn(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AccountBody>,
) -> ApiResult<Json<Value>> {
    let account = account_ref(body.email.as_deref(), body.username.as_deref())?;
    state.moderation.clear_warn(&account).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn set_ban(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<DeviceBody>,
) -> ApiResult<Json<Value>> {
    let is_banned = body.is_banned.ok_or(FieldError::missing("isBanned"))?;
    state
        .moderation
        .set_ban(body.device_id.as_deref().unwrap_or_default(), is_banned)
        .await?;
    Ok(Json(json!({ "success": true, "isBanned": is_banned })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    limit: Option<usize>,
}

pub async fn search_devices(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Value>> {
    let items = state
        .moderation
        .search(query.q.as_deref().unwrap_or_default(), query.limit)
        .await?;
    Ok(Json(json!({ "success": true, "items": items })))
}

// ── Cloud saves ──

pub async fn list_emails(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let items = state.saves.list_emails().await?;
    Ok(Json(json!({ "success": true, "items": items })))
}

#[derive(Debug, Deserialize)]
pub struct SavesQuery {
    email: Option<String>,
    username: Option<String>,
}

pub async fn list_saves(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SavesQuery>,
) -> ApiResult<Json<Value>> {
    let email = query.email.unwrap_or_default();
    let entries = state.saves.list_by_email(&email).await?;
    Ok(Json(json!({
        "success": true,
        "email": empire_types::normalize_email(&email),
        "entries": entries,
    })))
}

pub async fn delete_save(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SavesQuery>,
) -> ApiResult<Json<Value>> {
    let account = account_ref(query.email.as_deref(), query.username.as_deref())?;
    state.saves.delete(&account).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Value>> {
    let deleted = state.saves.delete_all_for_email(&email).await?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}
