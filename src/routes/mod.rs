// routes/mod.rs
// Public re-exports of all route handlers, plus small parsing helpers
// shared across them.

pub mod admin;
pub mod auth;
pub mod invoices;
pub mod maintenance;
pub mod pgs;
pub mod tenants;

pub use admin::*;
pub use auth::*;
pub use invoices::*;
pub use maintenance::*;
pub use pgs::*;
pub use tenants::*;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use mongodb::bson::{DateTime, oid::ObjectId};
use std::{str::FromStr, sync::Arc};

use crate::{errors::ApiError, state::AppState};

/// The full API router. The two login routes are public; everything else
/// requires a bearer token.
pub fn app(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        // tenants
        .route("/tenants", get(tenants_index).post(tenants_create))
        .route(
            "/tenants/{tid}",
            put(tenants_update).delete(tenants_delete),
        )
        .route("/tenants/me/dashboard", get(tenants_dashboard))
        .route(
            "/tenants/{tid}/transactions",
            get(tenants_transactions).post(tenants_submit_transaction),
        )
        // invoices
        .route("/invoices/generate", post(invoices_generate))
        .route("/invoices/calculate-invoices", put(invoices_calculate))
        .route("/invoices", get(invoices_index))
        .route("/invoices/{invoiceId}", get(invoices_show))
        .route("/invoices/by-room/{pgId}/{roomNo}", get(invoices_by_room))
        .route("/invoices/{invoiceId}/mark-paid", put(invoices_mark_paid))
        .route(
            "/invoices/download/{pgId}/{roomNo}",
            get(invoices_download),
        )
        // pgs
        .route("/pgs", get(pgs_index).post(pgs_create))
        .route(
            "/pgs/{pgId}",
            get(pgs_show).put(pgs_update).delete(pgs_delete),
        )
        // maintenance
        .route("/maintenance", get(maintenance_index).post(maintenance_create))
        .route("/maintenance/mine", get(maintenance_for_tenant))
        .route("/maintenance/{id}/status", put(maintenance_update_status))
        .route("/maintenance/{id}/feedback", put(maintenance_feedback))
        // admin oversight
        .route("/admin/profile", get(admin_profile))
        .route("/admin/admins", get(admins_index).post(admins_create))
        .route("/admin/admins/{id}", delete(admins_delete))
        .route("/admin/verify-tenant/{tenantId}", post(tenants_verify))
        .route("/admin/transactions", get(transactions_index))
        .route("/admin/pending-transactions", get(transactions_pending))
        .route(
            "/admin/approve-transaction/{transactionId}",
            post(transactions_approve),
        )
        .route(
            "/admin/reject-transaction/{transactionId}",
            delete(transactions_reject),
        )
        .route("/admin/tenant/mark-as-paid/{tid}", post(tenants_mark_paid))
        .route(
            "/admin/tenant/{tid}/impose-fine",
            post(tenants_impose_fine),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ));

    Router::new()
        .route("/auth/tenant/login", post(tenant_login))
        .route("/auth/admin/login", post(admin_login))
        .merge(protected)
        .with_state(state)
}

pub(crate) fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::from_str(raw).map_err(|_| ApiError::InvalidInput(format!("invalid {what} id")))
}

/// Accepts RFC 3339 or plain `YYYY-MM-DD`.
pub(crate) fn parse_date_field(raw: &str, field: &str) -> Result<DateTime, ApiError> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(DateTime::from_chrono(dt.with_timezone(&Utc)));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::InvalidInput(format!("invalid date in {field}: {raw}")))?;
    let dt = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    Ok(DateTime::from_chrono(dt))
}
