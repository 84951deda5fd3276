// models.rs
// MongoDB document types. Field names are camelCase on the wire and in the
// store, matching the JSON the API speaks.

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Roles carried inside bearer tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tenant,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tenant => "tenant",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

/// Admin account document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub name: String,
    /// Argon2 hash, never the raw secret.
    pub password: String,
    pub role: Role,
    pub created_at: DateTime,
}

/// Tenant document. Meter readings and cost-per-unit are explicit
/// `Option`s: absent means "not yet entered", never zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub tid: i64,
    pub tname: String,
    pub email: String,
    #[serde(default)]
    pub mobile_number: Option<String>,
    /// Argon2 hash.
    pub password: String,
    #[serde(default)]
    pub pg_id: Option<String>,
    #[serde(default)]
    pub pg_name: Option<String>,
    #[serde(default)]
    pub room_no: Option<String>,
    #[serde(default)]
    pub rent: f64,
    #[serde(default)]
    pub security_amount: Option<f64>,
    #[serde(default)]
    pub maintenance_amount: f64,
    #[serde(default)]
    pub main_last_month: Option<f64>,
    #[serde(default)]
    pub main_current_month: Option<f64>,
    #[serde(default)]
    pub inverter_last_month: Option<f64>,
    #[serde(default)]
    pub inverter_current_month: Option<f64>,
    #[serde(default)]
    pub motor_units: f64,
    #[serde(default)]
    pub cost_per_unit: Option<f64>,
    #[serde(default)]
    pub electricity_fine: f64,
    #[serde(default)]
    pub due_electricity_bill: f64,
    #[serde(default)]
    pub total_amount_due: f64,
    #[serde(default)]
    pub due_date: Option<DateTime>,
    /// Billing period ("March2026") the 10% fine was last imposed for.
    #[serde(default)]
    pub fine_applied_for: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub invoices: Vec<ObjectId>,
    /// Optimistic-concurrency token; every mutation is a CAS on this.
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

/// Invoice ledger entry: an immutable snapshot of one billing computation.
/// Only `status` and the payment metadata change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub invoice_number: String,
    pub tid: i64,
    pub pg_id: String,
    pub room_no: String,
    pub pg_name: String,
    pub tenant_name: String,
    pub rent: f64,
    pub maintenance_amount: f64,
    pub main_last_month: f64,
    pub main_current_month: f64,
    pub inverter_last_month: f64,
    pub inverter_current_month: f64,
    pub motor_units: f64,
    pub cost_per_unit: f64,
    pub electricity_fine: f64,
    pub due_electricity_bill: f64,
    pub total_amount_due: f64,
    pub due_date: DateTime,
    /// Billing period the invoice belongs to, e.g. "March2026". Keys the
    /// directory the rendered document lives in.
    pub month_year: String,
    pub pdf_path: String,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub utr_number: Option<String>,
    #[serde(default)]
    pub payment_screenshot: Option<String>,
    #[serde(default)]
    pub paid_at: Option<DateTime>,
    pub generated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
}

/// Tenant-submitted payment claim. `utrNumber` is unique system-wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub tid: i64,
    pub amount: f64,
    pub utr_number: String,
    #[serde(default)]
    pub screenshot_path: Option<String>,
    pub payment_date: DateTime,
    #[serde(default)]
    pub next_due_date: Option<DateTime>,
    pub status: TransactionStatus,
    pub created_at: DateTime,
}

/// Room entry embedded in a PG document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_no: String,
    #[serde(default)]
    pub electricity_past_month: f64,
    #[serde(default)]
    pub electricity_present_month: f64,
    #[serde(default)]
    pub maintenance_amount: f64,
}

/// Paying-guest housing unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pg {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub pg_id: String,
    pub name: String,
    pub address: String,
    pub owner_name: String,
    pub contact: String,
    #[serde(default)]
    pub rent: f64,
    #[serde(default)]
    pub vacant_rooms: i64,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MaintenanceStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Rejected,
}

/// Maintenance ticket. Feedback (rating + remarks) is only accepted once
/// the ticket is Completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub tid: i64,
    pub pg_name: String,
    pub room_no: String,
    pub mobile_number: String,
    pub category: String,
    pub description: String,
    pub status: MaintenanceStatus,
    pub available_date: DateTime,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub rating: Option<i32>,
    pub created_at: DateTime,
}

/// Atomic sequence document backing invoice numbering and tid assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub seq: i64,
}
