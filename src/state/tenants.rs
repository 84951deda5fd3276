// Tenant store operations. Every mutation of billing state goes through
// a compare-and-swap on the tenant's version field so a stale read never
// overwrites a concurrent update.

use anyhow::anyhow;
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use tracing::info;

use crate::{
    auth::hash_password,
    billing::fine_amount,
    errors::{ApiError, Result, is_duplicate_key},
    models::{Tenant, TransactionStatus},
};

use super::{AppState, next_sequence};

const CAS_MAX_RETRIES: usize = 8;

/// Fields a caller may set when creating or updating a tenant. Derived
/// billing state (dues, fine, version) is never written directly.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantUpsert {
    pub tname: String,
    pub email: String,
    #[serde(default)]
    pub mobile_number: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub pg_id: Option<String>,
    #[serde(default)]
    pub pg_name: Option<String>,
    #[serde(default)]
    pub room_no: Option<String>,
    #[serde(default)]
    pub rent: Option<f64>,
    #[serde(default)]
    pub security_amount: Option<f64>,
    #[serde(default)]
    pub maintenance_amount: Option<f64>,
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
}

pub async fn create_tenant(state: &AppState, input: TenantUpsert) -> Result<Tenant> {
    let password = match input.password.as_deref() {
        Some(raw) if !raw.is_empty() => hash_password(raw)?,
        _ => return Err(ApiError::MissingFields(vec!["password".into()])),
    };
    let tid = next_sequence(state, "tenant:tid").await?;

    let tenant = Tenant {
        id: None,
        tid,
        tname: input.tname,
        email: input.email,
        mobile_number: input.mobile_number,
        password,
        pg_id: input.pg_id,
        pg_name: input.pg_name,
        room_no: input.room_no,
        rent: input.rent.unwrap_or(0.0),
        security_amount: input.security_amount,
        maintenance_amount: input.maintenance_amount.unwrap_or(0.0),
        main_last_month: input.main_last_month,
        main_current_month: input.main_current_month,
        inverter_last_month: input.inverter_last_month,
        inverter_current_month: input.inverter_current_month,
        motor_units: input.motor_units.unwrap_or(0.0),
        cost_per_unit: input.cost_per_unit,
        electricity_fine: 0.0,
        due_electricity_bill: 0.0,
        total_amount_due: 0.0,
        due_date: None,
        fine_applied_for: None,
        is_verified: false,
        invoices: Vec::new(),
        version: 0,
        created_at: DateTime::now(),
    };

    let res = state.tenants.insert_one(&tenant).await.map_err(|err| {
        if is_duplicate_key(&err) {
            ApiError::InvalidInput("a tenant with this email or tid already exists".into())
        } else {
            err.into()
        }
    })?;

    let mut created = tenant;
    created.id = res.inserted_id.as_object_id();
    Ok(created)
}

pub async fn list_tenants(state: &AppState, pg_id: Option<&str>) -> Result<Vec<Tenant>> {
    let filter = match pg_id {
        Some(pg) => doc! { "pgId": pg },
        None => doc! {},
    };
    let mut cursor = state.tenants.find(filter).await?;
    let mut items = Vec::new();
    while let Some(tenant) = cursor.try_next().await? {
        items.push(tenant);
    }
    Ok(items)
}

pub async fn get_tenant_by_tid(state: &AppState, tid: i64) -> Result<Option<Tenant>> {
    state
        .tenants
        .find_one(doc! { "tid": tid })
        .await
        .map_err(Into::into)
}

pub async fn get_tenant_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Tenant>> {
    state
        .tenants
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn find_tenant_by_identifier(state: &AppState, identifier: &str) -> Result<Option<Tenant>> {
    state
        .tenants
        .find_one(doc! { "$or": [
            { "email": identifier },
            { "mobileNumber": identifier },
        ]})
        .await
        .map_err(Into::into)
}

/// Applies profile/billing-input updates from an admin. Derived fields are
/// untouched; the write is version-checked like every other mutation.
pub async fn update_tenant(state: &AppState, tid: i64, input: TenantUpsert) -> Result<Tenant> {
    let password = match input.password.as_deref() {
        Some(raw) if !raw.is_empty() => Some(hash_password(raw)?),
        _ => None,
    };

    mutate_tenant(state, tid, move |tenant| {
        tenant.tname = input.tname.clone();
        tenant.email = input.email.clone();
        if let Some(ref hash) = password {
            tenant.password = hash.clone();
        }
        // Merge like the meter fields below: an absent field keeps its
        // stored value rather than clearing it.
        if input.mobile_number.is_some() {
            tenant.mobile_number = input.mobile_number.clone();
        }
        if input.pg_id.is_some() {
            tenant.pg_id = input.pg_id.clone();
        }
        if input.pg_name.is_some() {
            tenant.pg_name = input.pg_name.clone();
        }
        if input.room_no.is_some() {
            tenant.room_no = input.room_no.clone();
        }
        if let Some(rent) = input.rent {
            tenant.rent = rent;
        }
        tenant.security_amount = input.security_amount.or(tenant.security_amount);
        if let Some(m) = input.maintenance_amount {
            tenant.maintenance_amount = m;
        }
        tenant.main_last_month = input.main_last_month.or(tenant.main_last_month);
        tenant.main_current_month = input.main_current_month.or(tenant.main_current_month);
        tenant.inverter_last_month = input.inverter_last_month.or(tenant.inverter_last_month);
        tenant.inverter_current_month =
            input.inverter_current_month.or(tenant.inverter_current_month);
        if let Some(units) = input.motor_units {
            tenant.motor_units = units;
        }
        tenant.cost_per_unit = input.cost_per_unit.or(tenant.cost_per_unit);
        Ok(())
    })
    .await
}

/// Hard delete by explicit admin action. Invoices are historical records
/// and are intentionally left in the ledger.
pub async fn delete_tenant(state: &AppState, tid: i64) -> Result<()> {
    let res = state.tenants.delete_one(doc! { "tid": tid }).await?;
    if res.deleted_count == 0 {
        return Err(ApiError::NotFound(format!("tenant {tid}")));
    }
    Ok(())
}

pub async fn verify_tenant(state: &AppState, id: &ObjectId) -> Result<()> {
    let res = state
        .tenants
        .update_one(doc! { "_id": id }, doc! { "$set": { "isVerified": true } })
        .await?;
    if res.matched_count == 0 {
        return Err(ApiError::NotFound("tenant".into()));
    }
    Ok(())
}

/// Imposes the 10% electricity fine for the given billing period. Guarded
/// by the per-period marker: imposing twice for the same period fails,
/// while distinct periods compound by design.
pub async fn impose_fine(state: &AppState, tid: i64, period: &str) -> Result<Tenant> {
    let period = period.to_string();
    let updated = mutate_tenant(state, tid, move |tenant| {
        if tenant.fine_applied_for.as_deref() == Some(period.as_str()) {
            return Err(ApiError::AlreadyProcessed(format!(
                "fine already imposed for {period}"
            )));
        }
        let fine = fine_amount(tenant.due_electricity_bill);
        tenant.electricity_fine += fine;
        tenant.due_electricity_bill += fine;
        tenant.total_amount_due += fine;
        tenant.fine_applied_for = Some(period.clone());
        Ok(())
    })
    .await?;
    info!(tid, fine = updated.electricity_fine, "imposed electricity fine");
    Ok(updated)
}

/// Administrative full settlement: zeroes every due field in one
/// version-checked write and rejects the tenant's still-pending payment
/// claims, bypassing individual approval.
pub async fn mark_tenant_fully_paid(state: &AppState, tid: i64) -> Result<Tenant> {
    let updated = mutate_tenant(state, tid, |tenant| {
        tenant.maintenance_amount = 0.0;
        tenant.due_electricity_bill = 0.0;
        tenant.electricity_fine = 0.0;
        tenant.total_amount_due = 0.0;
        Ok(())
    })
    .await?;

    let discarded = state
        .transactions
        .update_many(
            doc! { "tid": tid, "status": bson::to_bson(&TransactionStatus::Pending)? },
            doc! { "$set": { "status": bson::to_bson(&TransactionStatus::Rejected)? } },
        )
        .await?;
    info!(
        tid,
        discarded = discarded.modified_count,
        "tenant marked as fully paid"
    );
    Ok(updated)
}

/// Read-modify-write with optimistic concurrency: the replacement only
/// lands if the version read is still current, retried a bounded number
/// of times.
pub async fn mutate_tenant<F>(state: &AppState, tid: i64, mutate: F) -> Result<Tenant>
where
    F: Fn(&mut Tenant) -> Result<()>,
{
    for _ in 0..CAS_MAX_RETRIES {
        let current = get_tenant_by_tid(state, tid)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("tenant {tid}")))?;

        let mut updated = current.clone();
        mutate(&mut updated)?;
        updated.version = current.version + 1;

        let res = state
            .tenants
            .replace_one(
                doc! { "tid": tid, "version": current.version },
                &updated,
            )
            .await?;
        if res.modified_count == 1 {
            return Ok(updated);
        }
        // Lost the race; re-read and try again.
    }
    Err(ApiError::Internal(anyhow!(
        "tenant {tid} is being modified concurrently; giving up after {CAS_MAX_RETRIES} attempts"
    )))
}
