// Tenant endpoints: admin CRUD, the tenant dashboard, payment history,
// and the multipart payment-claim submission.

use std::sync::Arc;

use axum::extract::{Json, Multipart, Path, Query, State};
use axum::response::IntoResponse;
use mongodb::bson::DateTime;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ApiError,
    state::{
        AppState, SubmitTransaction, TenantUpsert, create_tenant, delete_tenant,
        get_tenant_by_tid, list_invoices_for_tenant, list_tenants,
        list_transactions_for_tenant, submit_transaction, update_tenant,
    },
};

use super::parse_date_field;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantListQuery {
    #[serde(default)]
    pub pg_id: Option<String>,
}

pub async fn tenants_create(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TenantUpsert>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let tenant = create_tenant(&state, payload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Tenant added successfully",
        "tenant": redacted(&tenant),
    })))
}

pub async fn tenants_index(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<TenantListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let tenants = list_tenants(&state, query.pg_id.as_deref()).await?;
    let tenants: Vec<_> = tenants.iter().map(redacted).collect();
    Ok(Json(json!({ "success": true, "tenants": tenants })))
}

pub async fn tenants_update(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(tid): Path<i64>,
    Json(payload): Json<TenantUpsert>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let tenant = update_tenant(&state, tid, payload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Tenant updated successfully",
        "tenant": redacted(&tenant),
    })))
}

pub async fn tenants_delete(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(tid): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    delete_tenant(&state, tid).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Tenant deleted successfully",
    })))
}

/// The tenant's own view: balances plus their invoice history.
pub async fn tenants_dashboard(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let tid = auth
        .tid
        .ok_or_else(|| ApiError::Forbidden("tenant token required".into()))?;
    let tenant = get_tenant_by_tid(&state, tid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("tenant {tid}")))?;
    let invoices = list_invoices_for_tenant(&state, tid).await?;

    Ok(Json(json!({
        "name": tenant.tname,
        "mobile": tenant.mobile_number,
        "rentDue": tenant.total_amount_due,
        "maintenanceDue": tenant.maintenance_amount,
        "electricityDue": tenant.due_electricity_bill,
        "dueDate": tenant.due_date,
        "invoices": invoices,
    })))
}

pub async fn tenants_transactions(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(tid): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_tenant_self(tid)?;
    get_tenant_by_tid(&state, tid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("tenant {tid}")))?;
    let transactions = list_transactions_for_tenant(&state, tid).await?;
    Ok(Json(json!({ "transactions": transactions })))
}

/// Multipart payment-claim submission: form fields plus a jpeg/png proof
/// screenshot, relocated under the uploads directory with a
/// month-prefixed unique name.
pub async fn tenants_submit_transaction(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(tid): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_tenant_self(tid)?;

    let mut amount: Option<f64> = None;
    let mut utr_number: Option<String> = None;
    let mut payment_date: Option<DateTime> = None;
    let mut next_due_date: Option<DateTime> = None;
    let mut screenshot: Option<Screenshot> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::InvalidInput(format!("malformed multipart body: {err}")))?
    {
        match field.name().unwrap_or_default() {
            "amount" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::InvalidInput(err.to_string()))?;
                amount = Some(text.trim().parse().map_err(|_| {
                    ApiError::InvalidInput(format!("invalid amount: {text}"))
                })?);
            }
            "utrNumber" => {
                utr_number = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| ApiError::InvalidInput(err.to_string()))?,
                );
            }
            "paymentDate" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::InvalidInput(err.to_string()))?;
                payment_date = Some(parse_date_field(&text, "paymentDate")?);
            }
            "nextDueDate" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::InvalidInput(err.to_string()))?;
                next_due_date = Some(parse_date_field(&text, "nextDueDate")?);
            }
            "screenshot" => {
                screenshot = Some(buffer_screenshot(field).await?);
            }
            _ => {}
        }
    }

    let mut missing = Vec::new();
    if amount.is_none() {
        missing.push("amount".to_string());
    }
    if utr_number.as_deref().unwrap_or("").trim().is_empty() {
        missing.push("utrNumber".to_string());
    }
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }

    // The proof file only lands on disk once validation has passed, and is
    // removed again if the ledger insert fails (duplicate UTR etc.).
    let screenshot_path = match screenshot {
        Some(shot) => Some(save_screenshot(shot).await?),
        None => None,
    };

    let result = submit_transaction(
        &state,
        SubmitTransaction {
            tid,
            amount: amount.unwrap_or_default(),
            utr_number: utr_number.unwrap_or_default(),
            screenshot_path: screenshot_path.clone(),
            payment_date: payment_date.unwrap_or_else(DateTime::now),
            next_due_date,
        },
    )
    .await;

    let transaction = match result {
        Ok(txn) => txn,
        Err(err) => {
            if let Some(path) = screenshot_path {
                let _ = tokio::fs::remove_file(&path).await;
            }
            return Err(err);
        }
    };

    Ok(Json(json!({
        "success": true,
        "message": "Payment claim submitted",
        "transaction": transaction,
    })))
}

struct Screenshot {
    ext: String,
    bytes: axum::body::Bytes,
}

async fn buffer_screenshot(
    field: axum::extract::multipart::Field<'_>,
) -> Result<Screenshot, ApiError> {
    let original = field.file_name().unwrap_or("screenshot").to_string();
    let ext = original
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if !matches!(ext.as_str(), "jpg" | "jpeg" | "png") {
        return Err(ApiError::InvalidInput(
            "only JPEG/PNG screenshots are allowed".into(),
        ));
    }

    let bytes = field
        .bytes()
        .await
        .map_err(|err| ApiError::InvalidInput(format!("screenshot upload failed: {err}")))?;
    Ok(Screenshot { ext, bytes })
}

async fn save_screenshot(shot: Screenshot) -> Result<String, ApiError> {
    let month = chrono::Utc::now().format("%B").to_string().to_lowercase();
    let dir = std::path::PathBuf::from(
        std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
    )
    .join("payments");
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|err| ApiError::Internal(err.into()))?;

    let path = dir.join(format!("{month}-{}.{}", Uuid::new_v4(), shot.ext));
    tokio::fs::write(&path, &shot.bytes)
        .await
        .map_err(|err| ApiError::Internal(err.into()))?;
    Ok(path.to_string_lossy().into_owned())
}

/// Tenant JSON view with the credential hash stripped.
fn redacted(tenant: &crate::models::Tenant) -> serde_json::Value {
    let mut value = serde_json::to_value(tenant).unwrap_or_default();
    if let Some(map) = value.as_object_mut() {
        map.remove("password");
    }
    value
}
