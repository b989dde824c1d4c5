//! Collection case coordinator integration tests.
//! Covers idempotent opening, the reminder ladder, manual escalation,
//! pause/resume, broken promises, and the closing invariant.

mod common;

use common::{date, today, TestEngine};

use chrono::Duration;
use collections_service::models::{CaseStage, CaseStatus, InvoiceStatus, Role};
use collections_service::store::CollectionCaseStore;
use service_core::error::AppError;

#[tokio::test]
async fn opening_a_case_is_idempotent() {
    let engine = TestEngine::new();
    let ctx = engine.ctx(Role::Member);

    let invoice = engine.pending_invoice("CASE-1").await;
    let first = engine
        .store
        .open_case_for_invoice(engine.organization_id, invoice.invoice_id)
        .await
        .unwrap()
        .unwrap();

    let second = engine.coordinator.open_case(&ctx, &invoice).await.unwrap();
    assert_eq!(second.case_id, first.case_id, "existing case is returned");

    let cases = engine
        .coordinator
        .list_cases(&ctx, &Default::default())
        .await
        .unwrap();
    assert_eq!(cases.len(), 1);
}

#[tokio::test]
async fn initial_schedule_follows_the_playbook() {
    let engine = TestEngine::new();

    let invoice = engine.pending_invoice("CASE-2").await;
    let case = engine
        .store
        .open_case_for_invoice(engine.organization_id, invoice.invoice_id)
        .await
        .unwrap()
        .unwrap();

    // Default playbook: first action three days after opening.
    assert_eq!(
        case.next_action_utc,
        Some(case.created_utc + Duration::days(3))
    );
}

#[tokio::test]
async fn overdue_advances_the_reminder_ladder() {
    let engine = TestEngine::new();
    let ctx = engine.ctx(Role::Member);

    let invoice = engine.pending_invoice("CASE-3").await;
    engine
        .lifecycle
        .mark_overdue(&ctx, invoice.invoice_id)
        .await
        .unwrap();

    let case = engine
        .store
        .open_case_for_invoice(engine.organization_id, invoice.invoice_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(case.stage, CaseStage::Reminder1);
    assert_eq!(
        case.next_action_utc,
        Some(case.updated_utc + Duration::days(7))
    );
}

#[tokio::test]
async fn manual_escalation_is_gated_and_single_shot() {
    let engine = TestEngine::new();

    let invoice = engine.pending_invoice("CASE-4").await;
    let case = engine
        .store
        .open_case_for_invoice(engine.organization_id, invoice.invoice_id)
        .await
        .unwrap()
        .unwrap();

    let err = engine
        .coordinator
        .escalate_case(&engine.ctx(Role::Viewer), case.case_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));

    let escalated = engine
        .coordinator
        .escalate_case(&engine.ctx(Role::Member), case.case_id)
        .await
        .unwrap();
    assert_eq!(escalated.stage, CaseStage::Escalated);
    assert!(escalated.escalation_utc.is_some());
    assert_eq!(
        escalated.next_action_utc,
        Some(escalated.updated_utc + Duration::days(14))
    );

    // Escalated -> Escalated is not an edge.
    let err = engine
        .coordinator
        .escalate_case(&engine.ctx(Role::Member), case.case_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
}

#[tokio::test]
async fn pause_and_resume_manage_the_schedule() {
    let engine = TestEngine::new();

    let invoice = engine.pending_invoice("CASE-5").await;
    let case = engine
        .store
        .open_case_for_invoice(engine.organization_id, invoice.invoice_id)
        .await
        .unwrap()
        .unwrap();

    let err = engine
        .coordinator
        .pause_case(&engine.ctx(Role::Member), case.case_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));

    let paused = engine
        .coordinator
        .pause_case(&engine.ctx(Role::Admin), case.case_id)
        .await
        .unwrap();
    assert_eq!(paused.status, CaseStatus::Paused);
    assert!(paused.next_action_utc.is_none());

    let err = engine
        .coordinator
        .pause_case(&engine.ctx(Role::Admin), case.case_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));

    let resumed = engine
        .coordinator
        .resume_case(&engine.ctx(Role::Admin), case.case_id)
        .await
        .unwrap();
    assert_eq!(resumed.status, CaseStatus::Active);
    assert!(resumed.next_action_utc.is_some());
}

#[tokio::test]
async fn broken_promise_drops_back_to_escalated() {
    let engine = TestEngine::new();
    let ctx = engine.ctx(Role::Member);

    let invoice = engine.pending_invoice("CASE-6").await;
    engine
        .lifecycle
        .record_payment_promise(&ctx, invoice.invoice_id, date(2026, 3, 15), today(), None)
        .await
        .unwrap();

    let case = engine
        .store
        .open_case_for_invoice(engine.organization_id, invoice.invoice_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(case.stage, CaseStage::PromiseToPay);

    let broken = engine
        .coordinator
        .record_broken_promise(&ctx, case.case_id)
        .await
        .unwrap();
    assert_eq!(broken.stage, CaseStage::Escalated);
    assert!(broken.escalation_utc.is_some());
}

#[tokio::test]
async fn broken_promise_requires_a_promise() {
    let engine = TestEngine::new();
    let ctx = engine.ctx(Role::Member);

    let invoice = engine.pending_invoice("CASE-7").await;
    let case = engine
        .store
        .open_case_for_invoice(engine.organization_id, invoice.invoice_id)
        .await
        .unwrap()
        .unwrap();

    let err = engine
        .coordinator
        .record_broken_promise(&ctx, case.case_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
}

#[tokio::test]
async fn payment_resolves_the_case_from_any_stage() {
    let engine = TestEngine::new();
    let ctx = engine.ctx(Role::Member);

    let invoice = engine.pending_invoice("CASE-8").await;
    let case = engine
        .store
        .open_case_for_invoice(engine.organization_id, invoice.invoice_id)
        .await
        .unwrap()
        .unwrap();
    engine
        .coordinator
        .escalate_case(&ctx, case.case_id)
        .await
        .unwrap();

    engine
        .lifecycle
        .mark_as_paid(&ctx, invoice.invoice_id, None)
        .await
        .unwrap();

    let closed = engine
        .coordinator
        .get_case(&ctx, case.case_id)
        .await
        .unwrap();
    assert_eq!(closed.status, CaseStatus::Closed);
    assert_eq!(closed.stage, CaseStage::Resolved);
    assert!(closed.closed_utc.is_some(), "closing stamps closed_utc");
    assert_eq!(closed.summary.as_deref(), Some("Resolved by payment"));

    let invoice = engine
        .lifecycle
        .get_invoice(&ctx, invoice.invoice_id)
        .await
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn the_store_enforces_one_open_case_per_invoice() {
    let engine = TestEngine::new();

    let invoice = engine.pending_invoice("CASE-9").await;
    let competing = collections_service::models::CollectionCase::new(
        engine.organization_id,
        invoice.invoice_id,
        invoice.company_id,
    );
    let err = engine.store.upsert_case(&competing).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn case_reads_are_tenant_scoped() {
    let engine = TestEngine::new();

    let invoice = engine.pending_invoice("CASE-10").await;
    let case = engine
        .store
        .open_case_for_invoice(engine.organization_id, invoice.invoice_id)
        .await
        .unwrap()
        .unwrap();

    let err = engine
        .coordinator
        .get_case(&engine.foreign_ctx(Role::Owner), case.case_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
