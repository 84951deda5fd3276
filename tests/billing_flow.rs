use rentdesk::errors::ApiError;
use rentdesk::models::InvoiceStatus;
use rentdesk::state::{
    AppState, GenerateInvoiceRequest, TenantUpsert, create_tenant, generate_invoice,
    generate_invoices_bulk, get_invoice_by_id, get_tenant_by_tid, list_invoices,
    list_invoices_for_tenant, mark_invoice_paid,
};

#[path = "common/mod.rs"]
mod common;

fn billed_tenant(email: &str) -> TenantUpsert {
    TenantUpsert {
        tname: "Asha Verma".into(),
        email: email.into(),
        mobile_number: Some("9876500001".into()),
        password: Some("pass1234".into()),
        pg_id: Some("PG1".into()),
        pg_name: Some("Sunrise Residency".into()),
        room_no: Some("101".into()),
        rent: Some(5000.0),
        maintenance_amount: Some(500.0),
        main_last_month: Some(100.0),
        main_current_month: Some(150.0),
        inverter_last_month: Some(200.0),
        inverter_current_month: Some(215.0),
        motor_units: Some(0.0),
        cost_per_unit: Some(10.0),
        ..Default::default()
    }
}

async fn generate(state: &AppState, tid: i64) -> Result<rentdesk::state::GeneratedInvoice, ApiError> {
    generate_invoice(
        state,
        &GenerateInvoiceRequest {
            tid,
            ..Default::default()
        },
    )
    .await
}

#[tokio::test]
async fn invoice_snapshot_matches_calculator() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let tenant = create_tenant(&state, billed_tenant("asha@example.com"))
        .await
        .unwrap();
    let generated = generate(&state, tenant.tid).await.unwrap();

    // (50 main + 15 inverter) * 10 = 650; 5000 rent + 650 + 500 maintenance.
    let invoices = list_invoices_for_tenant(&state, tenant.tid).await.unwrap();
    assert_eq!(invoices.len(), 1);
    let invoice = &invoices[0];
    assert_eq!(invoice.due_electricity_bill, 650.0);
    assert_eq!(invoice.total_amount_due, 6150.0);
    assert_eq!(invoice.invoice_number, format!("PG1{}1", tenant.tid));
    assert_eq!(generated.invoice_number, invoice.invoice_number);

    // The rendered document exists at the advertised path.
    assert!(std::path::Path::new(&generated.pdf_path).exists());

    // Tenant balance mirrors the snapshot.
    let after = get_tenant_by_tid(&state, tenant.tid).await.unwrap().unwrap();
    assert_eq!(after.total_amount_due, 6150.0);
    assert_eq!(after.due_electricity_bill, 650.0);
    assert!(after.due_date.is_some());
    assert_eq!(after.invoices.len(), 1);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn invoice_numbers_are_sequential() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let tenant = create_tenant(&state, billed_tenant("seq@example.com"))
        .await
        .unwrap();

    let first = generate(&state, tenant.tid).await.unwrap();
    let second = generate(&state, tenant.tid).await.unwrap();
    let third = generate(&state, tenant.tid).await.unwrap();

    assert_eq!(first.invoice_number, format!("PG1{}1", tenant.tid));
    assert_eq!(second.invoice_number, format!("PG1{}2", tenant.tid));
    assert_eq!(third.invoice_number, format!("PG1{}3", tenant.tid));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn concurrent_generation_yields_unique_numbers() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let tenant = create_tenant(&state, billed_tenant("race@example.com"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let state = state.clone();
        let tid = tenant.tid;
        handles.push(tokio::spawn(async move { generate(&state, tid).await }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap().invoice_number);
    }
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 4, "invoice numbers must never collide");

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn missing_inputs_are_reported_in_batch() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let mut input = billed_tenant("bare@example.com");
    input.cost_per_unit = None;
    input.inverter_last_month = None;
    input.inverter_current_month = None;
    let tenant = create_tenant(&state, input).await.unwrap();

    let err = generate(&state, tenant.tid).await.unwrap_err();
    match err {
        ApiError::MissingFields(fields) => {
            assert!(fields.contains(&"costPerUnit".to_string()));
            assert!(fields.contains(&"inverterLastMonth".to_string()));
            assert!(fields.contains(&"inverterCurrentMonth".to_string()));
        }
        other => panic!("expected MissingFields, got {other:?}"),
    }

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn unknown_tenant_is_not_found() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let err = generate(&state, 424242).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn render_failure_persists_nothing() {
    let ctx = match common::setup_state_failing_renderer().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let tenant = create_tenant(&state, billed_tenant("norender@example.com"))
        .await
        .unwrap();

    let err = generate(&state, tenant.tid).await.unwrap_err();
    assert!(matches!(err, ApiError::Render(_)));

    // No invoice record, no balance change.
    assert!(list_invoices(&state).await.unwrap().is_empty());
    let after = get_tenant_by_tid(&state, tenant.tid).await.unwrap().unwrap();
    assert_eq!(after.total_amount_due, 0.0);
    assert!(after.invoices.is_empty());

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn mark_paid_settles_invoice_and_tenant_exactly_once() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let tenant = create_tenant(&state, billed_tenant("paid@example.com"))
        .await
        .unwrap();
    let generated = generate(&state, tenant.tid).await.unwrap();

    let paid = mark_invoice_paid(&state, &generated.invoice_id, "UTR-700", "proof.png")
        .await
        .unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(paid.utr_number.as_deref(), Some("UTR-700"));
    assert_eq!(paid.payment_screenshot.as_deref(), Some("proof.png"));
    assert!(paid.paid_at.is_some());

    // The snapshot charges stay frozen; only the tenant's live dues reset.
    assert_eq!(paid.total_amount_due, 6150.0);
    let after = get_tenant_by_tid(&state, tenant.tid).await.unwrap().unwrap();
    assert_eq!(after.total_amount_due, 0.0);
    assert_eq!(after.due_electricity_bill, 0.0);
    assert_eq!(after.maintenance_amount, 0.0);

    let again = mark_invoice_paid(&state, &generated.invoice_id, "UTR-701", "proof2.png")
        .await
        .unwrap_err();
    assert!(matches!(again, ApiError::AlreadyProcessed(_)));

    // The failed second call changed nothing.
    let still = get_invoice_by_id(&state, &generated.invoice_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(still.utr_number.as_deref(), Some("UTR-700"));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn bulk_run_skips_failing_tenants() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let complete = create_tenant(&state, billed_tenant("ok@example.com"))
        .await
        .unwrap();
    let mut incomplete = billed_tenant("broken@example.com");
    incomplete.main_last_month = None;
    incomplete.main_current_month = None;
    create_tenant(&state, incomplete).await.unwrap();

    let generated = generate_invoices_bulk(&state, Some("PG1"), None).await.unwrap();
    assert_eq!(generated.len(), 1);
    assert!(generated[0].invoice_number.starts_with("PG1"));
    assert_eq!(
        list_invoices_for_tenant(&state, complete.tid)
            .await
            .unwrap()
            .len(),
        1
    );
    // The skipped tenant never reached the renderer.
    assert_eq!(ctx.renderer.as_ref().unwrap().count(), 1);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn bulk_run_with_no_tenants_is_not_found() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();

    let err = generate_invoices_bulk(&state, Some("PG404"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    common::teardown(Some(ctx)).await;
}
