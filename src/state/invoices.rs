// Invoice ledger and the generation pipeline: validate -> compute ->
// number -> render -> persist -> write the result back to the tenant.
// Rendering happens before anything is persisted, so a render failure
// leaves no orphaned invoice record.

use chrono::{Datelike, TimeZone, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    billing::{BillingInputs, DEFAULT_COST_PER_UNIT, compute_bill},
    errors::{ApiError, Result},
    models::{Invoice, InvoiceStatus, Tenant},
};

use super::{AppState, get_tenant_by_tid, mutate_tenant, next_sequence};

/// Billing request for one tenant. Overrides are optional; absent values
/// fall back to the tenant record's stored billing inputs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInvoiceRequest {
    pub tid: i64,
    #[serde(default)]
    pub main_last_month: Option<f64>,
    #[serde(default)]
    pub main_current_month: Option<f64>,
    #[serde(default)]
    pub inverter_last_month: Option<f64>,
    #[serde(default)]
    pub inverter_current_month: Option<f64>,
    #[serde(default)]
    pub motor_units: Option<f64>,
    #[serde(default)]
    pub cost_per_unit: Option<f64>,
    #[serde(default)]
    pub due_date: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedInvoice {
    pub invoice_id: ObjectId,
    pub invoice_number: String,
    pub pdf_path: String,
}

pub async fn generate_invoice(
    state: &AppState,
    request: &GenerateInvoiceRequest,
) -> Result<GeneratedInvoice> {
    let tenant = get_tenant_by_tid(state, request.tid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("tenant {}", request.tid)))?;

    let invoice = build_invoice(state, &tenant, request).await?;

    // All-or-nothing per tenant: render first, persist only on success.
    let pdf_path = state.renderer.render(&invoice)?;
    let mut invoice = invoice;
    invoice.pdf_path = pdf_path.to_string_lossy().into_owned();

    let res = state.invoices.insert_one(&invoice).await?;
    let invoice_id = res
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("invoice insert missing _id")))?;

    // Mirror the computed charges onto the tenant's live balance.
    let due_date = invoice.due_date;
    let electricity_due = invoice.due_electricity_bill;
    let total_due = invoice.total_amount_due;
    mutate_tenant(state, tenant.tid, move |t| {
        t.due_electricity_bill = electricity_due;
        t.total_amount_due = total_due;
        t.due_date = Some(due_date);
        t.invoices.push(invoice_id);
        Ok(())
    })
    .await?;

    info!(
        tid = tenant.tid,
        invoice_number = %invoice.invoice_number,
        total = invoice.total_amount_due,
        "generated invoice"
    );

    Ok(GeneratedInvoice {
        invoice_id,
        invoice_number: invoice.invoice_number,
        pdf_path: invoice.pdf_path,
    })
}

/// Bulk recomputation: one pipeline run per tenant matching the optional
/// pg filter. A failing tenant is logged and skipped; the batch never
/// aborts and is not atomic across tenants.
pub async fn generate_invoices_bulk(
    state: &AppState,
    pg_id: Option<&str>,
    cost_per_unit: Option<f64>,
) -> Result<Vec<GeneratedInvoice>> {
    let tenants = super::list_tenants(state, pg_id).await?;
    if tenants.is_empty() {
        return Err(ApiError::NotFound("tenants".into()));
    }

    let mut generated = Vec::new();
    for tenant in tenants {
        let request = GenerateInvoiceRequest {
            tid: tenant.tid,
            cost_per_unit: cost_per_unit.or(Some(DEFAULT_COST_PER_UNIT)),
            ..Default::default()
        };
        match generate_invoice(state, &request).await {
            Ok(result) => generated.push(result),
            Err(err) => {
                warn!(tid = tenant.tid, error = %err, "skipping tenant in bulk invoice run");
            }
        }
    }
    Ok(generated)
}

/// Resolves inputs (overrides over stored readings), batch-validates the
/// required fields, runs the calculator and assembles the snapshot with a
/// fresh sequence number. Does not persist anything.
async fn build_invoice(
    state: &AppState,
    tenant: &Tenant,
    request: &GenerateInvoiceRequest,
) -> Result<Invoice> {
    let main_last = request.main_last_month.or(tenant.main_last_month);
    let main_current = request.main_current_month.or(tenant.main_current_month);
    let inverter_last = request.inverter_last_month.or(tenant.inverter_last_month);
    let inverter_current = request
        .inverter_current_month
        .or(tenant.inverter_current_month);
    let cost_per_unit = request.cost_per_unit.or(tenant.cost_per_unit);

    // Batch validation: report every absent field, not just the first.
    let mut missing = Vec::new();
    if tenant.pg_id.is_none() {
        missing.push("pgId".to_string());
    }
    if tenant.room_no.is_none() {
        missing.push("roomNo".to_string());
    }
    if tenant.pg_name.is_none() {
        missing.push("pgName".to_string());
    }
    if main_last.is_none() {
        missing.push("mainLastMonth".to_string());
    }
    if main_current.is_none() {
        missing.push("mainCurrentMonth".to_string());
    }
    if inverter_last.is_none() {
        missing.push("inverterLastMonth".to_string());
    }
    if inverter_current.is_none() {
        missing.push("inverterCurrentMonth".to_string());
    }
    if cost_per_unit.is_none() {
        missing.push("costPerUnit".to_string());
    }
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }

    let inputs = BillingInputs {
        main_last_month: main_last.unwrap_or_default(),
        main_current_month: main_current.unwrap_or_default(),
        inverter_last_month: inverter_last.unwrap_or_default(),
        inverter_current_month: inverter_current.unwrap_or_default(),
        motor_units: request.motor_units.unwrap_or(tenant.motor_units),
        cost_per_unit: cost_per_unit.unwrap_or_default(),
        rent: tenant.rent,
        maintenance_amount: tenant.maintenance_amount,
        existing_fine: tenant.electricity_fine,
    };
    let charges = compute_bill(&inputs)?;

    let due_date = match request.due_date {
        Some(date) => date,
        None => first_of_next_month()?,
    };
    let month_year = current_month_year();

    // Duplicate-free numbering: atomic sequence per (pgId, tid) pair.
    let pg_id = tenant.pg_id.clone().unwrap_or_default();
    let seq = next_sequence(state, &format!("invoice:{pg_id}:{}", tenant.tid)).await?;
    let invoice_number = format!("{pg_id}{}{seq}", tenant.tid);

    Ok(Invoice {
        id: None,
        invoice_number,
        tid: tenant.tid,
        pg_id,
        room_no: tenant.room_no.clone().unwrap_or_default(),
        pg_name: tenant.pg_name.clone().unwrap_or_default(),
        tenant_name: tenant.tname.clone(),
        rent: inputs.rent,
        maintenance_amount: inputs.maintenance_amount,
        main_last_month: inputs.main_last_month,
        main_current_month: inputs.main_current_month,
        inverter_last_month: inputs.inverter_last_month,
        inverter_current_month: inputs.inverter_current_month,
        motor_units: inputs.motor_units,
        cost_per_unit: inputs.cost_per_unit,
        electricity_fine: inputs.existing_fine,
        due_electricity_bill: charges.electricity_due,
        total_amount_due: charges.total_due,
        due_date,
        month_year,
        pdf_path: String::new(),
        status: InvoiceStatus::Pending,
        utr_number: None,
        payment_screenshot: None,
        paid_at: None,
        generated_at: DateTime::now(),
    })
}

pub async fn list_invoices(state: &AppState) -> Result<Vec<Invoice>> {
    let mut cursor = state.invoices.find(doc! {}).await?;
    let mut items = Vec::new();
    while let Some(invoice) = cursor.try_next().await? {
        items.push(invoice);
    }
    Ok(items)
}

pub async fn list_invoices_for_tenant(state: &AppState, tid: i64) -> Result<Vec<Invoice>> {
    let mut cursor = state
        .invoices
        .find(doc! { "tid": tid })
        .sort(doc! { "generatedAt": -1 })
        .await?;
    let mut items = Vec::new();
    while let Some(invoice) = cursor.try_next().await? {
        items.push(invoice);
    }
    Ok(items)
}

pub async fn get_invoice_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Invoice>> {
    state
        .invoices
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn list_invoices_by_room(
    state: &AppState,
    pg_id: &str,
    room_no: &str,
) -> Result<Vec<Invoice>> {
    let mut cursor = state
        .invoices
        .find(doc! { "pgId": pg_id, "roomNo": room_no })
        .await?;
    let mut items = Vec::new();
    while let Some(invoice) = cursor.try_next().await? {
        items.push(invoice);
    }
    Ok(items)
}

/// Conditional Pending -> Paid flip; the snapshot fields stay frozen and
/// only payment metadata is written. Also settles the tenant's live dues,
/// the offline counterpart of claim approval.
pub async fn mark_invoice_paid(
    state: &AppState,
    id: &ObjectId,
    utr_number: &str,
    payment_screenshot: &str,
) -> Result<Invoice> {
    let invoice = get_invoice_by_id(state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("invoice".into()))?;

    let res = state
        .invoices
        .update_one(
            doc! { "_id": id, "status": bson::to_bson(&InvoiceStatus::Pending)? },
            doc! { "$set": {
                "status": bson::to_bson(&InvoiceStatus::Paid)?,
                "utrNumber": utr_number,
                "paymentScreenshot": payment_screenshot,
                "paidAt": DateTime::now(),
            } },
        )
        .await?;
    if res.modified_count == 0 {
        return Err(ApiError::AlreadyProcessed(format!(
            "invoice {} is not pending",
            invoice.invoice_number
        )));
    }

    if let Err(err) = mutate_tenant(state, invoice.tid, |tenant| {
        tenant.due_electricity_bill = 0.0;
        tenant.total_amount_due = 0.0;
        tenant.maintenance_amount = 0.0;
        Ok(())
    })
    .await
    {
        // The invoice is paid either way; a vanished tenant only loses
        // the balance reset.
        warn!(tid = invoice.tid, error = %err, "could not settle tenant dues on mark-paid");
    }

    get_invoice_by_id(state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("invoice".into()))
}

fn first_of_next_month() -> Result<DateTime> {
    let now = Utc::now();
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    let due = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("invalid due date")))?;
    Ok(DateTime::from_chrono(due))
}

/// Billing-period key, e.g. "March2026". Part of the document path
/// contract shared with the download endpoint.
pub fn current_month_year() -> String {
    Utc::now().format("%B%Y").to_string()
}
