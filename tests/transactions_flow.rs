use mongodb::bson::DateTime;

use rentdesk::errors::ApiError;
use rentdesk::models::TransactionStatus;
use rentdesk::state::{
    AppState, SubmitTransaction, TenantUpsert, approve_transaction, create_tenant, delete_tenant,
    get_tenant_by_tid, get_transaction_by_id, impose_fine, mark_tenant_fully_paid, mutate_tenant,
    reject_transaction, submit_transaction, update_tenant,
};

#[path = "common/mod.rs"]
mod common;

fn tenant_input(email: &str) -> TenantUpsert {
    TenantUpsert {
        tname: "Ravi Kumar".into(),
        email: email.into(),
        password: Some("pass1234".into()),
        pg_id: Some("PG2".into()),
        pg_name: Some("Lakeview PG".into()),
        room_no: Some("202".into()),
        rent: Some(4000.0),
        ..Default::default()
    }
}

fn claim(tid: i64, amount: f64, utr: &str) -> SubmitTransaction {
    SubmitTransaction {
        tid,
        amount,
        utr_number: utr.into(),
        screenshot_path: None,
        payment_date: DateTime::now(),
        next_due_date: None,
    }
}

async fn set_balance(state: &AppState, tid: i64, electricity: f64, total: f64) {
    mutate_tenant(state, tid, move |t| {
        t.due_electricity_bill = electricity;
        t.total_amount_due = total;
        Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn duplicate_reference_code_is_rejected() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let tenant = create_tenant(&state, tenant_input("dup@example.com"))
        .await
        .unwrap();
    submit_transaction(&state, claim(tenant.tid, 1000.0, "UTR-111"))
        .await
        .unwrap();

    let err = submit_transaction(&state, claim(tenant.tid, 2000.0, "UTR-111"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::DuplicateReference(_)));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn approval_clamps_balance_at_zero() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let tenant = create_tenant(&state, tenant_input("clamp@example.com"))
        .await
        .unwrap();
    set_balance(&state, tenant.tid, 0.0, 500.0).await;

    let next_due = DateTime::now();
    let mut overpay = claim(tenant.tid, 700.0, "UTR-200");
    overpay.next_due_date = Some(next_due);
    let txn = submit_transaction(&state, overpay).await.unwrap();

    let approved = approve_transaction(&state, &txn.id.unwrap()).await.unwrap();
    assert_eq!(approved.status, TransactionStatus::Approved);

    let after = get_tenant_by_tid(&state, tenant.tid).await.unwrap().unwrap();
    assert_eq!(after.total_amount_due, 0.0);
    assert_eq!(after.due_date, Some(next_due));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn rejection_leaves_balance_untouched() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let tenant = create_tenant(&state, tenant_input("reject@example.com"))
        .await
        .unwrap();
    set_balance(&state, tenant.tid, 0.0, 3000.0).await;

    let txn = submit_transaction(&state, claim(tenant.tid, 3000.0, "UTR-300"))
        .await
        .unwrap();
    let rejected = reject_transaction(&state, &txn.id.unwrap()).await.unwrap();
    assert_eq!(rejected.status, TransactionStatus::Rejected);

    let after = get_tenant_by_tid(&state, tenant.tid).await.unwrap().unwrap();
    assert_eq!(after.total_amount_due, 3000.0);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn decided_claim_cannot_be_decided_again() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let tenant = create_tenant(&state, tenant_input("double@example.com"))
        .await
        .unwrap();
    set_balance(&state, tenant.tid, 0.0, 1000.0).await;

    let txn = submit_transaction(&state, claim(tenant.tid, 1000.0, "UTR-400"))
        .await
        .unwrap();
    let id = txn.id.unwrap();
    approve_transaction(&state, &id).await.unwrap();

    let again = approve_transaction(&state, &id).await.unwrap_err();
    assert!(matches!(again, ApiError::AlreadyProcessed(_)));
    let flip = reject_transaction(&state, &id).await.unwrap_err();
    assert!(matches!(flip, ApiError::AlreadyProcessed(_)));

    // The balance was debited exactly once.
    let after = get_tenant_by_tid(&state, tenant.tid).await.unwrap().unwrap();
    assert_eq!(after.total_amount_due, 0.0);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn approving_claim_of_deleted_tenant_fails_cleanly() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let tenant = create_tenant(&state, tenant_input("gone@example.com"))
        .await
        .unwrap();
    let txn = submit_transaction(&state, claim(tenant.tid, 800.0, "UTR-500"))
        .await
        .unwrap();
    delete_tenant(&state, tenant.tid).await.unwrap();

    let id = txn.id.unwrap();
    let err = approve_transaction(&state, &id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    // The claim stays pending; nothing was consumed.
    let still = get_transaction_by_id(&state, &id).await.unwrap().unwrap();
    assert_eq!(still.status, TransactionStatus::Pending);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn partial_update_keeps_housing_and_contact_fields() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let mut input = tenant_input("partial@example.com");
    input.mobile_number = Some("9876500002".into());
    let tenant = create_tenant(&state, input).await.unwrap();

    // Rename only; everything omitted must survive.
    let updated = update_tenant(
        &state,
        tenant.tid,
        TenantUpsert {
            tname: "Ravi K. Sharma".into(),
            email: "partial@example.com".into(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.tname, "Ravi K. Sharma");
    assert_eq!(updated.pg_id.as_deref(), Some("PG2"));
    assert_eq!(updated.pg_name.as_deref(), Some("Lakeview PG"));
    assert_eq!(updated.room_no.as_deref(), Some("202"));
    assert_eq!(updated.mobile_number.as_deref(), Some("9876500002"));

    // A provided field still overwrites.
    let moved = update_tenant(
        &state,
        tenant.tid,
        TenantUpsert {
            tname: "Ravi K. Sharma".into(),
            email: "partial@example.com".into(),
            room_no: Some("305".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(moved.room_no.as_deref(), Some("305"));
    assert_eq!(moved.pg_id.as_deref(), Some("PG2"));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn fine_is_once_per_period_and_compounds_across_periods() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let tenant = create_tenant(&state, tenant_input("fine@example.com"))
        .await
        .unwrap();
    set_balance(&state, tenant.tid, 1000.0, 1000.0).await;

    let first = impose_fine(&state, tenant.tid, "March2026").await.unwrap();
    assert_eq!(first.due_electricity_bill, 1100.0);
    assert_eq!(first.electricity_fine, 100.0);
    assert_eq!(first.total_amount_due, 1100.0);

    let repeat = impose_fine(&state, tenant.tid, "March2026")
        .await
        .unwrap_err();
    assert!(matches!(repeat, ApiError::AlreadyProcessed(_)));

    // A later period fines the already-fined balance.
    let second = impose_fine(&state, tenant.tid, "April2026").await.unwrap();
    assert_eq!(second.due_electricity_bill, 1210.0);
    assert_eq!(second.electricity_fine, 210.0);
    assert_eq!(second.total_amount_due, 1210.0);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn mark_fully_paid_zeroes_dues_and_discards_pending_claims() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let tenant = create_tenant(&state, tenant_input("settle@example.com"))
        .await
        .unwrap();
    set_balance(&state, tenant.tid, 650.0, 6150.0).await;
    let txn = submit_transaction(&state, claim(tenant.tid, 6150.0, "UTR-600"))
        .await
        .unwrap();

    let settled = mark_tenant_fully_paid(&state, tenant.tid).await.unwrap();
    assert_eq!(settled.total_amount_due, 0.0);
    assert_eq!(settled.due_electricity_bill, 0.0);
    assert_eq!(settled.electricity_fine, 0.0);
    assert_eq!(settled.maintenance_amount, 0.0);

    let discarded = get_transaction_by_id(&state, &txn.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(discarded.status, TransactionStatus::Rejected);

    common::teardown(Some(ctx)).await;
}
