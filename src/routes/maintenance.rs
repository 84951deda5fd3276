// Maintenance ticket endpoints: tenants raise and rate, admins triage.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::MaintenanceStatus,
    state::{
        AppState, create_maintenance_request, get_tenant_by_tid, list_maintenance,
        list_maintenance_for_tenant, update_maintenance_feedback, update_maintenance_status,
    },
};

use super::{parse_date_field, parse_object_id};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaintenanceRequest {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub available_date: Option<String>,
}

pub async fn maintenance_create(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateMaintenanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tid = auth
        .tid
        .ok_or_else(|| ApiError::Forbidden("tenant token required".into()))?;
    let tenant = get_tenant_by_tid(&state, tid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("tenant {tid}")))?;
    let available_date = match payload.available_date.as_deref() {
        Some(raw) => parse_date_field(raw, "availableDate")?,
        None => mongodb::bson::DateTime::now(),
    };
    let request = create_maintenance_request(
        &state,
        &tenant,
        &payload.category,
        &payload.description,
        available_date,
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Maintenance request submitted",
        "request": request,
    })))
}

pub async fn maintenance_for_tenant(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let tid = auth
        .tid
        .ok_or_else(|| ApiError::Forbidden("tenant token required".into()))?;
    let requests = list_maintenance_for_tenant(&state, tid).await?;
    Ok(Json(json!({ "success": true, "requests": requests })))
}

pub async fn maintenance_index(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let requests = list_maintenance(&state).await?;
    Ok(Json(json!({ "success": true, "requests": requests })))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: MaintenanceStatus,
}

pub async fn maintenance_update_status(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let id = parse_object_id(&id, "maintenance id")?;
    let request = update_maintenance_status(&state, &id, payload.status).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Status updated",
        "request": request,
    })))
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub remarks: String,
    pub rating: i32,
}

pub async fn maintenance_feedback(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tid = auth
        .tid
        .ok_or_else(|| ApiError::Forbidden("tenant token required".into()))?;
    let id = parse_object_id(&id, "maintenance id")?;
    let request =
        update_maintenance_feedback(&state, &id, tid, &payload.remarks, payload.rating).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Feedback recorded",
        "request": request,
    })))
}
