// Admin oversight endpoints: account management, tenant verification,
// and the payment-claim review queue.

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::TransactionStatus,
    state::{
        AppState, approve_transaction, create_admin, current_month_year, delete_admin,
        get_admin_by_id, impose_fine, list_admins, list_transactions_with_tenants,
        mark_tenant_fully_paid, reject_transaction, verify_tenant,
    },
};

use super::parse_object_id;

pub async fn admin_profile(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let id = parse_object_id(&auth.subject, "admin id")?;
    let admin = get_admin_by_id(&state, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("admin".into()))?;
    Ok(Json(json!({
        "success": true,
        "admin": {
            "_id": admin.id,
            "email": admin.email,
            "name": admin.name,
            "role": admin.role,
        },
    })))
}

#[derive(Deserialize)]
pub struct CreateAdminRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

pub async fn admins_create(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let admin = create_admin(&state, &payload.email, &payload.name, &payload.password).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Admin added successfully",
        "admin": { "_id": admin.id, "email": admin.email, "name": admin.name },
    })))
}

pub async fn admins_index(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let admins: Vec<_> = list_admins(&state)
        .await?
        .into_iter()
        .map(|a| {
            json!({
                "_id": a.id,
                "email": a.email,
                "name": a.name,
                "role": a.role,
                "createdAt": a.created_at,
            })
        })
        .collect();
    Ok(Json(json!({ "success": true, "admins": admins })))
}

pub async fn admins_delete(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let id = parse_object_id(&id, "admin id")?;
    delete_admin(&state, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Admin deleted successfully",
    })))
}

pub async fn tenants_verify(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let id = parse_object_id(&id, "tenant id")?;
    verify_tenant(&state, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Tenant verified successfully",
    })))
}

#[derive(Deserialize)]
pub struct TransactionListQuery {
    #[serde(default)]
    pub status: Option<TransactionStatus>,
}

pub async fn transactions_index(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<TransactionListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let transactions = list_transactions_with_tenants(&state, query.status).await?;
    Ok(Json(json!({ "success": true, "transactions": transactions })))
}

pub async fn transactions_pending(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let transactions =
        list_transactions_with_tenants(&state, Some(TransactionStatus::Pending)).await?;
    Ok(Json(json!({ "success": true, "transactions": transactions })))
}

pub async fn transactions_approve(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let id = parse_object_id(&id, "transaction id")?;
    let transaction = approve_transaction(&state, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Transaction approved",
        "transaction": transaction,
    })))
}

pub async fn transactions_reject(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let id = parse_object_id(&id, "transaction id")?;
    let transaction = reject_transaction(&state, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Transaction rejected",
        "transaction": transaction,
    })))
}

pub async fn tenants_mark_paid(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(tid): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let tenant = mark_tenant_fully_paid(&state, tid).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Tenant marked as fully paid",
        "totalAmountDue": tenant.total_amount_due,
    })))
}

#[derive(Deserialize)]
pub struct ImposeFineRequest {
    /// Billing period the fine applies to; defaults to the current one.
    #[serde(default)]
    pub period: Option<String>,
}

pub async fn tenants_impose_fine(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(tid): Path<i64>,
    Json(payload): Json<ImposeFineRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let period = payload.period.unwrap_or_else(current_month_year);
    let tenant = impose_fine(&state, tid, &period).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Fine imposed for {period}"),
        "electricityFine": tenant.electricity_fine,
        "totalAmountDue": tenant.total_amount_due,
    })))
}
