// Login endpoints. Both paths verify an argon2 hash and hand back an
// HS256 bearer token carrying the caller's role.

use std::sync::Arc;

use axum::extract::{Json, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    auth::issue_token,
    errors::ApiError,
    models::Role,
    state::{AppState, authenticate_admin, authenticate_tenant},
};

#[derive(Deserialize)]
pub struct TenantLoginRequest {
    /// Email or mobile number.
    pub identifier: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    #[serde(flatten)]
    pub who: Value,
}

pub async fn tenant_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TenantLoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let tenant = authenticate_tenant(&state, &payload.identifier, &payload.password).await?;
    let subject = tenant
        .id
        .map(|id| id.to_hex())
        .unwrap_or_else(|| tenant.tid.to_string());
    let token = issue_token(&subject, Role::Tenant, Some(tenant.tid))?;
    Ok(Json(LoginResponse {
        success: true,
        token,
        who: json!({ "tenant": {
            "tid": tenant.tid,
            "name": tenant.tname,
            "email": tenant.email,
            "mobileNumber": tenant.mobile_number,
        }}),
    }))
}

pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let admin = authenticate_admin(&state, &payload.email, &payload.password).await?;
    let subject = admin.id.map(|id| id.to_hex()).unwrap_or_default();
    let token = issue_token(&subject, admin.role, None)?;
    Ok(Json(LoginResponse {
        success: true,
        token,
        who: json!({ "admin": {
            "id": subject,
            "name": admin.name,
            "email": admin.email,
            "role": admin.role.as_str(),
        }}),
    }))
}
