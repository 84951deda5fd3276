// Invoice endpoints: generation, listing, mark-paid, and the document
// download that reconstructs the deterministic pdf path.

use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::Invoice,
    pdf::invoice_pdf_path,
    state::{
        AppState, GenerateInvoiceRequest, GeneratedInvoice, generate_invoice,
        generate_invoices_bulk, get_invoice_by_id, list_invoices, list_invoices_by_room,
        mark_invoice_paid,
    },
};

use super::parse_object_id;

pub async fn invoices_generate(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateInvoiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Tenants may only bill themselves; admins may bill anyone.
    auth.require_tenant_self(payload.tid)?;

    let generated = generate_invoice(&state, &payload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Invoice generated successfully",
        "invoiceId": generated.invoice_id,
        "invoiceNumber": generated.invoice_number,
        "pdfPath": generated.pdf_path,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateInvoicesRequest {
    #[serde(default)]
    pub pg_id: Option<String>,
    #[serde(default)]
    pub cost_per_unit: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateInvoicesResponse {
    pub success: bool,
    pub message: String,
    pub invoices: Vec<GeneratedInvoice>,
}

pub async fn invoices_calculate(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CalculateInvoicesRequest>,
) -> Result<Json<CalculateInvoicesResponse>, ApiError> {
    auth.require_admin()?;

    let invoices =
        generate_invoices_bulk(&state, payload.pg_id.as_deref(), payload.cost_per_unit).await?;
    Ok(Json(CalculateInvoicesResponse {
        success: true,
        message: "Invoices calculated and generated".into(),
        invoices,
    }))
}

#[derive(Serialize)]
pub struct InvoiceListResponse {
    pub success: bool,
    pub invoices: Vec<Invoice>,
}

pub async fn invoices_index(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<InvoiceListResponse>, ApiError> {
    let invoices = list_invoices(&state).await?;
    Ok(Json(InvoiceListResponse {
        success: true,
        invoices,
    }))
}

pub async fn invoices_show(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_object_id(&invoice_id, "invoice")?;
    let invoice = get_invoice_by_id(&state, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("invoice".into()))?;
    Ok(Json(json!({ "success": true, "invoice": invoice })))
}

pub async fn invoices_by_room(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((pg_id, room_no)): Path<(String, String)>,
) -> Result<Json<InvoiceListResponse>, ApiError> {
    let invoices = list_invoices_by_room(&state, &pg_id, &room_no).await?;
    if invoices.is_empty() {
        return Err(ApiError::NotFound("invoices".into()));
    }
    Ok(Json(InvoiceListResponse {
        success: true,
        invoices,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidRequest {
    pub utr_number: Option<String>,
    pub payment_screenshot: Option<String>,
}

pub async fn invoices_mark_paid(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(invoice_id): Path<String>,
    Json(payload): Json<MarkPaidRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;

    let mut missing = Vec::new();
    if payload.utr_number.as_deref().unwrap_or("").is_empty() {
        missing.push("utrNumber".to_string());
    }
    if payload.payment_screenshot.as_deref().unwrap_or("").is_empty() {
        missing.push("paymentScreenshot".to_string());
    }
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }

    let id = parse_object_id(&invoice_id, "invoice")?;
    let invoice = mark_invoice_paid(
        &state,
        &id,
        payload.utr_number.as_deref().unwrap_or_default(),
        payload.payment_screenshot.as_deref().unwrap_or_default(),
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Invoice marked as paid",
        "invoice": invoice,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    pub month_year: String,
}

/// Streams the rendered pdf back. The path is rebuilt from the billing
/// period, pg and room rather than looked up in the store.
pub async fn invoices_download(
    _auth: AuthUser,
    Path((pg_id, room_no)): Path<(String, String)>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let base = PathBuf::from(
        std::env::var("INVOICE_DIR").unwrap_or_else(|_| "invoices".to_string()),
    );
    let path = invoice_pdf_path(&base, &query.month_year, &pg_id, &room_no);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("invoice file".into()));
        }
        Err(err) => return Err(ApiError::Internal(err.into())),
    };

    let filename = format!("invoice_{room_no}_{}.pdf", query.month_year);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}
