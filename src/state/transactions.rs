// Payment-claim ledger. The ledger is the single source of truth for
// payment history; tenant-facing views are queries, not embedded copies.
// State flips are conditional single-document updates, so a claim can be
// decided exactly once.

use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, info};

use crate::{
    billing::apply_payment,
    errors::{ApiError, Result, is_duplicate_key},
    models::{Tenant, Transaction, TransactionStatus},
};

use super::{AppState, get_tenant_by_tid, list_tenants, mutate_tenant};

#[derive(Debug, Clone)]
pub struct SubmitTransaction {
    pub tid: i64,
    pub amount: f64,
    pub utr_number: String,
    pub screenshot_path: Option<String>,
    pub payment_date: DateTime,
    pub next_due_date: Option<DateTime>,
}

/// Records a tenant's payment claim. The unique index on utrNumber makes
/// reference-code reuse fail atomically at the store.
pub async fn submit_transaction(
    state: &AppState,
    claim: SubmitTransaction,
) -> Result<Transaction> {
    get_tenant_by_tid(state, claim.tid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("tenant {}", claim.tid)))?;

    if claim.amount <= 0.0 {
        return Err(ApiError::InvalidInput("amount must be positive".into()));
    }
    if claim.utr_number.trim().is_empty() {
        return Err(ApiError::MissingFields(vec!["utrNumber".into()]));
    }

    let transaction = Transaction {
        id: None,
        tid: claim.tid,
        amount: claim.amount,
        utr_number: claim.utr_number.trim().to_string(),
        screenshot_path: claim.screenshot_path,
        payment_date: claim.payment_date,
        next_due_date: claim.next_due_date,
        status: TransactionStatus::Pending,
        created_at: DateTime::now(),
    };

    let res = state.transactions.insert_one(&transaction).await.map_err(|err| {
        if is_duplicate_key(&err) {
            ApiError::DuplicateReference(transaction.utr_number.clone())
        } else {
            err.into()
        }
    })?;

    let mut created = transaction;
    created.id = res.inserted_id.as_object_id();
    info!(tid = created.tid, utr = %created.utr_number, "payment claim submitted");
    Ok(created)
}

pub async fn get_transaction_by_id(
    state: &AppState,
    id: &ObjectId,
) -> Result<Option<Transaction>> {
    state
        .transactions
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

/// Tenant-facing history, newest first.
pub async fn list_transactions_for_tenant(
    state: &AppState,
    tid: i64,
) -> Result<Vec<Transaction>> {
    let mut cursor = state
        .transactions
        .find(doc! { "tid": tid })
        .sort(doc! { "paymentDate": -1 })
        .await?;
    let mut items = Vec::new();
    while let Some(txn) = cursor.try_next().await? {
        items.push(txn);
    }
    Ok(items)
}

/// Approves a pending claim: the Pending -> Approved flip is conditional,
/// then the tenant's balance drops by the claimed amount, floored at
/// zero, and the due date moves to the tenant-declared next due date.
pub async fn approve_transaction(state: &AppState, id: &ObjectId) -> Result<Transaction> {
    let transaction = get_transaction_by_id(state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("transaction".into()))?;

    // The tenant must still exist before the claim is consumed.
    get_tenant_by_tid(state, transaction.tid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("tenant {}", transaction.tid)))?;

    flip_status(state, id, TransactionStatus::Approved).await?;

    let amount = transaction.amount;
    let next_due = transaction.next_due_date;
    if let Err(err) = mutate_tenant(state, transaction.tid, move |tenant| {
        tenant.total_amount_due = apply_payment(tenant.total_amount_due, amount);
        if let Some(date) = next_due {
            tenant.due_date = Some(date);
        }
        Ok(())
    })
    .await
    {
        // The claim is already Approved at this point; without the balance
        // write the two disagree and need manual reconciliation.
        error!(
            transaction = %id,
            tid = transaction.tid,
            amount,
            error = %err,
            "claim approved but tenant balance not debited"
        );
        return Err(err);
    }

    info!(tid = transaction.tid, amount, "transaction approved");
    get_transaction_by_id(state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("transaction".into()))
}

/// Rejects a pending claim; no balance side effect.
pub async fn reject_transaction(state: &AppState, id: &ObjectId) -> Result<Transaction> {
    get_transaction_by_id(state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("transaction".into()))?;

    flip_status(state, id, TransactionStatus::Rejected).await?;

    get_transaction_by_id(state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("transaction".into()))
}

async fn flip_status(state: &AppState, id: &ObjectId, to: TransactionStatus) -> Result<()> {
    let res = state
        .transactions
        .update_one(
            doc! { "_id": id, "status": bson::to_bson(&TransactionStatus::Pending)? },
            doc! { "$set": { "status": bson::to_bson(&to)? } },
        )
        .await?;
    if res.modified_count == 0 {
        return Err(ApiError::AlreadyProcessed(
            "transaction has already been processed".into(),
        ));
    }
    Ok(())
}

/// Admin listing row: a claim joined with the tenant's display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub tid: i64,
    pub amount: f64,
    pub utr_number: String,
    pub screenshot_path: Option<String>,
    pub payment_date: DateTime,
    pub status: TransactionStatus,
    pub tname: String,
    pub pg_name: String,
    pub room_no: String,
    pub pg_id: String,
}

pub async fn list_transactions_with_tenants(
    state: &AppState,
    status: Option<TransactionStatus>,
) -> Result<Vec<TransactionView>> {
    let filter = match status {
        Some(s) => doc! { "status": bson::to_bson(&s)? },
        None => doc! {},
    };
    let mut cursor = state.transactions.find(filter).await?;

    let tenant_map: HashMap<i64, Tenant> = list_tenants(state, None)
        .await?
        .into_iter()
        .map(|t| (t.tid, t))
        .collect();

    let mut views = Vec::new();
    while let Some(txn) = cursor.try_next().await? {
        let tenant = tenant_map.get(&txn.tid);
        views.push(TransactionView {
            id: txn.id,
            tid: txn.tid,
            amount: txn.amount,
            utr_number: txn.utr_number,
            screenshot_path: txn.screenshot_path,
            payment_date: txn.payment_date,
            status: txn.status,
            tname: tenant.map(|t| t.tname.clone()).unwrap_or_else(|| "Unknown".into()),
            pg_name: tenant
                .and_then(|t| t.pg_name.clone())
                .unwrap_or_else(|| "N/A".into()),
            room_no: tenant
                .and_then(|t| t.room_no.clone())
                .unwrap_or_else(|| "N/A".into()),
            pg_id: tenant
                .and_then(|t| t.pg_id.clone())
                .unwrap_or_else(|| "N/A".into()),
        });
    }
    Ok(views)
}
