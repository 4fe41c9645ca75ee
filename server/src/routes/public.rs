//! Routes called by the game client and the storefront.

use super::{account_ref, AccountBody};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use empire_accounts::ReportEvent;
use empire_types::FieldError;
use serde::Deserialize;
use serde_json::{json, Value};

pub const SERVICE_NAME: &str = "empire-backoffice";

pub async fn root() -> Json<Value> {
    Json(json!({ "ok": true, "service": SERVICE_NAME }))
}

pub async fn status(State(state): State<AppState>) -> Response {
    match state.db.ping().await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => {
            tracing::error!("Store probe failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "ok": false, "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

// ── Cloud saves ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBody {
    email: Option<String>,
    username: Option<String>,
    save_json: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    email: Option<String>,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    email: Option<String>,
}

pub async fn sync_save(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SyncBody>,
) -> ApiResult<Json<Value>> {
    let account = account_ref(body.email.as_deref(), body.username.as_deref())?;
    // Clients send either the serialized save or the save object itself.
    let save_json = match body.save_json {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let receipt = state.saves.sync(&account, &save_json).await?;
    Ok(Json(json!({
        "success": true,
        "id": receipt.id,
        "email": receipt.email,
        "username": receipt.username,
        "updatedAt": receipt.updated_at,
    })))
}

pub async fn fetch_save(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AccountQuery>,
) -> ApiResult<Json<Value>> {
    let account = account_ref(query.email.as_deref(), query.username.as_deref())?;
    let save = state.saves.fetch(&account).await?;
    Ok(Json(json!({
        "success": true,
        "email": save.email,
        "username": save.username,
        "saveJson": save.save_json,
        "updatedAt": save.updated_at,
    })))
}

pub async fn list_saves_by_email(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EmailQuery>,
) -> ApiResult<Json<Value>> {
    let email = query.email.unwrap_or_default();
    let entries = state.saves.list_by_email(&email).await?;
    Ok(Json(json!({
        "success": true,
        "email": empire_types::normalize_email(&email),
        "entries": entries,
    })))
}

// ── Orders and licenses ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody {
    email: Option<String>,
    order_code: Option<String>,
    amount: Option<i64>,
}

pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateOrderBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let order = state
        .orders
        .create_order(
            body.email.as_deref().unwrap_or_default(),
            body.order_code.as_deref().unwrap_or_default(),
            body.amount.unwrap_or(0),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "order": order })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateBody {
    key: Option<String>,
    device_hash: Option<String>,
}

pub async fn activate_license(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ActivateBody>,
) -> ApiResult<Json<Value>> {
    let result = state
        .activator
        .activate(
            body.key.as_deref().unwrap_or_default(),
            body.device_hash.as_deref(),
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "valid": result.valid,
        "reason": result.reason,
        "activatedAt": result.activated_at,
    })))
}

// ── Gameplay reports ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
    email: Option<String>,
    username: Option<String>,
    device_id: Option<String>,
    achievement_key: Option<String>,
}

pub async fn report(
    State(state): State<AppState>,
    Path(event): Path<String>,
    ApiJson(body): ApiJson<ReportBody>,
) -> ApiResult<Json<Value>> {
    let event = match event.as_str() {
        "register" => ReportEvent::Register,
        "win" => ReportEvent::Win,
        "lose" => ReportEvent::Lose,
        "achievement" => ReportEvent::Achievement(body.achievement_key.unwrap_or_default()),
        other => {
            return Err(ApiError::not_found(
                "unknown_event",
                format!("unknown report event: {other}"),
            ));
        }
    };
    let account = account_ref(body.email.as_deref(), body.username.as_deref())?;

    let report = state
        .reports
        .record(&account, body.device_id.as_deref().unwrap_or_default(), event)
        .await?;
    Ok(Json(json!({ "success": true, "report": report })))
}

// ── Moderation (client side) ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatusQuery {
    email: Option<String>,
    username: Option<String>,
    device_id: Option<String>,
}

pub async fn device_status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DeviceStatusQuery>,
) -> ApiResult<Json<Value>> {
    let account = account_ref(query.email.as_deref(), query.username.as_deref())?;
    let device_id = query
        .device_id
        .as_deref()
        .ok_or(FieldError::missing("deviceId"))?;

    let status = state.moderation.device_status(&account, device_id).await?;
    Ok(Json(json!({
        "success": true,
        "isBanned": status.is_banned,
        "isWarned": status.is_warned,
    })))
}

pub async fn ack_warning(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AccountBody>,
) -> ApiResult<Json<Value>> {
    let account = account_ref(body.email.as_deref(), body.username.as_deref())?;
    state.moderation.ack_warning(&account).await?;
    Ok(Json(json!({ "success": true })))
}
