// state module: AppState, initialization, and re-exports of submodules.

use std::{env, sync::Arc};

use anyhow::{Context, Result};
use mongodb::{
    Client, Collection, IndexModel,
    bson::{DateTime, doc},
    options::IndexOptions,
};
use tracing::info;

use crate::{
    auth::hash_password,
    models::{Admin, Counter, Invoice, Maintenance, Pg, Role, Tenant, Transaction},
    pdf::{InvoiceRenderer, TypstRenderer},
};

mod admins;
mod invoices;
mod maintenance;
mod pgs;
mod tenants;
mod transactions;

pub use admins::*;
pub use invoices::*;
pub use maintenance::*;
pub use pgs::*;
pub use tenants::*;
pub use transactions::*;

#[derive(Clone)]
pub struct AppState {
    pub admins: Collection<Admin>,
    pub tenants: Collection<Tenant>,
    pub invoices: Collection<Invoice>,
    pub transactions: Collection<Transaction>,
    pub pgs: Collection<Pg>,
    pub maintenance: Collection<Maintenance>,
    pub counters: Collection<Counter>,
    pub renderer: Arc<dyn InvoiceRenderer>,
}

pub async fn init_state() -> Result<AppState> {
    init_state_with_renderer(Arc::new(TypstRenderer::from_env())).await
}

pub async fn init_state_with_renderer(renderer: Arc<dyn InvoiceRenderer>) -> Result<AppState> {
    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = env::var("MONGODB_DB").unwrap_or_else(|_| "rentdesk".to_string());

    let client = Client::with_uri_str(uri).await?;
    let db = client.database(&db_name);

    let state = AppState {
        admins: db.collection::<Admin>("admins"),
        tenants: db.collection::<Tenant>("tenants"),
        invoices: db.collection::<Invoice>("invoices"),
        transactions: db.collection::<Transaction>("transactions"),
        pgs: db.collection::<Pg>("pgs"),
        maintenance: db.collection::<Maintenance>("maintenance"),
        counters: db.collection::<Counter>("counters"),
        renderer,
    };

    ensure_indexes(&state).await?;
    seed_default_admin(&state).await?;

    Ok(state)
}

/// Unique indexes the workflows rely on: reference-code and tid
/// uniqueness are enforced here, not in application code.
async fn ensure_indexes(state: &AppState) -> Result<()> {
    fn unique(keys: mongodb::bson::Document) -> IndexModel {
        IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build()
    }

    state
        .transactions
        .create_index(unique(doc! { "utrNumber": 1 }))
        .await?;
    state.tenants.create_index(unique(doc! { "tid": 1 })).await?;
    state
        .tenants
        .create_index(unique(doc! { "email": 1 }))
        .await?;
    state.pgs.create_index(unique(doc! { "pgId": 1 })).await?;
    state
        .admins
        .create_index(unique(doc! { "email": 1 }))
        .await?;

    Ok(())
}

/// Seeds a superadmin the first time the app runs against an empty
/// database, so the admin API is reachable.
async fn seed_default_admin(state: &AppState) -> Result<()> {
    if state.admins.find_one(doc! {}).await?.is_some() {
        return Ok(());
    }

    let email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@rentdesk.local".to_string());
    let password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());
    let hashed = hash_password(&password).map_err(|err| anyhow::anyhow!("{err}"))?;

    state
        .admins
        .insert_one(Admin {
            id: None,
            email: email.clone(),
            name: "Superadmin".to_string(),
            password: hashed,
            role: Role::Superadmin,
            created_at: DateTime::now(),
        })
        .await?;
    info!(email, "seeded default superadmin");
    Ok(())
}

/// Atomically increments and returns the named sequence. Backs invoice
/// numbering (per pg/tenant pair) and fresh tid assignment; the upsert
/// makes the first call create the counter at 1.
pub async fn next_sequence(state: &AppState, key: &str) -> crate::errors::Result<i64> {
    let counter = state
        .counters
        .find_one_and_update(doc! { "_id": key }, doc! { "$inc": { "seq": 1_i64 } })
        .upsert(true)
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .context("counter upsert returned no document")?;
    Ok(counter.seq)
}
