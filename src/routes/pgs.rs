// PG property CRUD, all admin-scoped.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;
use serde_json::json;

use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::Pg,
    state::{AppState, create_pg, delete_pg, get_pg, list_pgs, update_pg},
};

pub async fn pgs_create(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Pg>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let mut missing = Vec::new();
    if payload.pg_id.trim().is_empty() {
        missing.push("pgId".to_string());
    }
    if payload.name.trim().is_empty() {
        missing.push("name".to_string());
    }
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }
    let pg = create_pg(&state, payload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "PG added successfully",
        "pg": pg,
    })))
}

pub async fn pgs_index(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let pgs = list_pgs(&state).await?;
    Ok(Json(json!({ "success": true, "pgs": pgs })))
}

pub async fn pgs_show(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(pg_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let pg = get_pg(&state, &pg_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("PG {pg_id}")))?;
    Ok(Json(json!({ "success": true, "pg": pg })))
}

pub async fn pgs_update(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(pg_id): Path<String>,
    Json(payload): Json<Pg>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    let pg = update_pg(&state, &pg_id, payload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "PG updated successfully",
        "pg": pg,
    })))
}

pub async fn pgs_delete(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(pg_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;
    delete_pg(&state, &pg_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "PG deleted successfully",
    })))
}
