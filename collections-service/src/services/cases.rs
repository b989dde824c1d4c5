//! Collection case coordinator - derives case stage and schedule from
//! invoice events.
//!
//! Stage advancement is monotonic along the reminder ladder. The two
//! sanctioned exceptions: a broken promise drops PromiseToPay back to
//! Escalated, and payment or cancellation resolves the case from any
//! stage. Opening is idempotent - an existing open case is returned
//! untouched.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::PlaybookConfig;
use crate::models::{
    CaseStage, CaseStatus, CollectionCase, Invoice, ListCasesFilter, RequestContext,
};
use crate::services::metrics::CASE_STAGE_TOTAL;
use crate::services::permissions::{require_allowed, Action};
use crate::store::CollectionCaseStore;

/// Collection-relevant invoice changes reported by the lifecycle service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceEvent {
    BecamePending,
    BecameOverdue,
    PromiseRecorded { promise_date: NaiveDate },
    PaymentReceived,
    Cancelled,
    ExpectedDateChanged { expected: Option<NaiveDate> },
    ContactLogged,
}

pub struct CollectionCaseCoordinator<S> {
    store: Arc<S>,
    playbook: PlaybookConfig,
}

impl<S: CollectionCaseStore> CollectionCaseCoordinator<S> {
    pub fn new(store: Arc<S>, playbook: PlaybookConfig) -> Self {
        Self { store, playbook }
    }

    /// Next absolute action timestamp for a stage, from the playbook
    /// day-offsets. None for stages that schedule nothing.
    pub fn next_action_for(
        &self,
        stage: CaseStage,
        from: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        self.playbook
            .offset_days(stage)
            .map(|days| from + Duration::days(days))
    }

    fn fresh_case(&self, invoice: &Invoice) -> CollectionCase {
        let mut case = CollectionCase::new(
            invoice.organization_id,
            invoice.invoice_id,
            invoice.company_id,
        );
        case.next_action_utc = self.next_action_for(CaseStage::Initial, case.created_utc);
        case
    }

    fn advance(
        &self,
        case: &mut CollectionCase,
        stage: CaseStage,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if !case.stage.can_transition_to(stage) {
            return Err(AppError::InvalidTransition(anyhow!(
                "Case {} cannot move from '{}' to '{}'",
                case.case_id,
                case.stage.as_str(),
                stage.as_str()
            )));
        }
        case.stage = stage;
        case.next_action_utc = self.next_action_for(stage, now);
        case.updated_utc = now;
        Ok(())
    }

    fn close(case: &mut CollectionCase, summary: &str, now: DateTime<Utc>) {
        case.stage = CaseStage::Resolved;
        case.status = CaseStatus::Closed;
        case.closed_utc = Some(now);
        case.next_action_utc = None;
        case.summary = Some(summary.to_string());
        case.updated_utc = now;
    }

    async fn load_case(
        &self,
        ctx: &RequestContext,
        case_id: Uuid,
    ) -> Result<CollectionCase, AppError> {
        self.store
            .get_case(ctx.organization_id, case_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Collection case {} not found", case_id)))
    }

    /// Compute the case mutation an invoice event implies, without
    /// persisting it. The lifecycle service writes the returned case in
    /// the same transaction as the invoice; None means no case change.
    pub async fn derive_case_update(
        &self,
        ctx: &RequestContext,
        invoice: &Invoice,
        event: InvoiceEvent,
    ) -> Result<Option<CollectionCase>, AppError> {
        let existing = self
            .store
            .open_case_for_invoice(ctx.organization_id, invoice.invoice_id)
            .await?;
        let now = Utc::now();

        match (event, existing) {
            (InvoiceEvent::BecamePending, None) | (InvoiceEvent::BecameOverdue, None) => {
                Ok(Some(self.fresh_case(invoice)))
            }
            (InvoiceEvent::BecamePending, Some(_)) => Ok(None),
            (InvoiceEvent::BecameOverdue, Some(mut case)) => match case.stage.next_reminder() {
                Some(stage) => {
                    self.advance(&mut case, stage, now)?;
                    Ok(Some(case))
                }
                None => Ok(None),
            },
            (InvoiceEvent::PromiseRecorded { promise_date }, existing) => {
                let mut case = existing.unwrap_or_else(|| self.fresh_case(invoice));
                if case.stage != CaseStage::PromiseToPay {
                    self.advance(&mut case, CaseStage::PromiseToPay, now)?;
                }
                case.next_action_utc = Some(promise_date.and_time(NaiveTime::MIN).and_utc());
                case.updated_utc = now;
                Ok(Some(case))
            }
            (InvoiceEvent::PaymentReceived, Some(mut case)) => {
                Self::close(&mut case, "Resolved by payment", now);
                Ok(Some(case))
            }
            (InvoiceEvent::Cancelled, Some(mut case)) => {
                Self::close(&mut case, "Resolved by cancellation", now);
                Ok(Some(case))
            }
            (InvoiceEvent::PaymentReceived, None) | (InvoiceEvent::Cancelled, None) => Ok(None),
            (InvoiceEvent::ExpectedDateChanged { expected }, Some(mut case)) => {
                case.next_action_utc = match expected {
                    Some(date) => Some(date.and_time(NaiveTime::MIN).and_utc()),
                    None => self.next_action_for(case.stage, now),
                };
                case.updated_utc = now;
                Ok(Some(case))
            }
            (InvoiceEvent::ExpectedDateChanged { .. }, None) => Ok(None),
            (InvoiceEvent::ContactLogged, Some(mut case)) => {
                case.last_communication_utc = Some(now);
                case.updated_utc = now;
                Ok(Some(case))
            }
            (InvoiceEvent::ContactLogged, None) => Ok(None),
        }
    }

    /// Open a case for an invoice. Idempotent: an existing open case is
    /// returned as-is, including when a concurrent open wins the race.
    #[instrument(skip(self, ctx, invoice), fields(organization_id = %ctx.organization_id, invoice_id = %invoice.invoice_id))]
    pub async fn open_case(
        &self,
        ctx: &RequestContext,
        invoice: &Invoice,
    ) -> Result<CollectionCase, AppError> {
        if let Some(existing) = self
            .store
            .open_case_for_invoice(ctx.organization_id, invoice.invoice_id)
            .await?
        {
            return Ok(existing);
        }

        let case = self.fresh_case(invoice);
        match self.store.upsert_case(&case).await {
            Ok(()) => {
                CASE_STAGE_TOTAL
                    .with_label_values(&[case.stage.as_str()])
                    .inc();
                info!(case_id = %case.case_id, "Collection case opened");
                Ok(case)
            }
            Err(AppError::Conflict(_)) => {
                // Lost the open race: the winner's case is the case.
                self.store
                    .open_case_for_invoice(ctx.organization_id, invoice.invoice_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Conflict(anyhow!(
                            "Concurrent case write on invoice {}",
                            invoice.invoice_id
                        ))
                    })
            }
            Err(err) => Err(err),
        }
    }

    /// Manually escalate an active case.
    #[instrument(skip(self, ctx), fields(organization_id = %ctx.organization_id, case_id = %case_id))]
    pub async fn escalate_case(
        &self,
        ctx: &RequestContext,
        case_id: Uuid,
    ) -> Result<CollectionCase, AppError> {
        require_allowed(ctx.role, Action::CasesEscalate)?;

        let mut case = self.load_case(ctx, case_id).await?;
        if case.status != CaseStatus::Active {
            return Err(AppError::InvalidTransition(anyhow!(
                "Only active cases can be escalated"
            )));
        }
        let now = Utc::now();
        self.advance(&mut case, CaseStage::Escalated, now)?;
        case.escalation_utc = Some(now);
        self.store.upsert_case(&case).await?;

        CASE_STAGE_TOTAL
            .with_label_values(&[case.stage.as_str()])
            .inc();
        info!(case_id = %case.case_id, "Collection case escalated");
        Ok(case)
    }

    /// Report a promise whose date passed without payment. Scheduler
    /// entry point; drops the case back to Escalated.
    #[instrument(skip(self, ctx), fields(organization_id = %ctx.organization_id, case_id = %case_id))]
    pub async fn record_broken_promise(
        &self,
        ctx: &RequestContext,
        case_id: Uuid,
    ) -> Result<CollectionCase, AppError> {
        require_allowed(ctx.role, Action::CasesEscalate)?;

        let mut case = self.load_case(ctx, case_id).await?;
        if case.status != CaseStatus::Active {
            return Err(AppError::InvalidTransition(anyhow!(
                "Only active cases can record a broken promise"
            )));
        }
        if case.stage != CaseStage::PromiseToPay {
            return Err(AppError::InvalidTransition(anyhow!(
                "Case {} holds no promise to break",
                case.case_id
            )));
        }
        let now = Utc::now();
        self.advance(&mut case, CaseStage::Escalated, now)?;
        case.escalation_utc = Some(now);
        self.store.upsert_case(&case).await?;

        CASE_STAGE_TOTAL
            .with_label_values(&[case.stage.as_str()])
            .inc();
        info!(case_id = %case.case_id, "Payment promise broken");
        Ok(case)
    }

    /// Pause reminder activity on an active case.
    #[instrument(skip(self, ctx), fields(organization_id = %ctx.organization_id, case_id = %case_id))]
    pub async fn pause_case(
        &self,
        ctx: &RequestContext,
        case_id: Uuid,
    ) -> Result<CollectionCase, AppError> {
        require_allowed(ctx.role, Action::CasesPause)?;

        let mut case = self.load_case(ctx, case_id).await?;
        if case.status != CaseStatus::Active {
            return Err(AppError::InvalidTransition(anyhow!(
                "Only active cases can be paused"
            )));
        }
        case.status = CaseStatus::Paused;
        case.next_action_utc = None;
        case.updated_utc = Utc::now();
        self.store.upsert_case(&case).await?;

        info!(case_id = %case.case_id, "Collection case paused");
        Ok(case)
    }

    /// Resume a paused case; the schedule restarts from now.
    #[instrument(skip(self, ctx), fields(organization_id = %ctx.organization_id, case_id = %case_id))]
    pub async fn resume_case(
        &self,
        ctx: &RequestContext,
        case_id: Uuid,
    ) -> Result<CollectionCase, AppError> {
        require_allowed(ctx.role, Action::CasesResume)?;

        let mut case = self.load_case(ctx, case_id).await?;
        if case.status != CaseStatus::Paused {
            return Err(AppError::InvalidTransition(anyhow!(
                "Only paused cases can be resumed"
            )));
        }
        let now = Utc::now();
        case.status = CaseStatus::Active;
        case.next_action_utc = self.next_action_for(case.stage, now);
        case.updated_utc = now;
        self.store.upsert_case(&case).await?;

        info!(case_id = %case.case_id, "Collection case resumed");
        Ok(case)
    }

    pub async fn get_case(
        &self,
        ctx: &RequestContext,
        case_id: Uuid,
    ) -> Result<CollectionCase, AppError> {
        require_allowed(ctx.role, Action::CasesView)?;
        self.load_case(ctx, case_id).await
    }

    pub async fn list_cases(
        &self,
        ctx: &RequestContext,
        filter: &ListCasesFilter,
    ) -> Result<Vec<CollectionCase>, AppError> {
        require_allowed(ctx.role, Action::CasesView)?;
        self.store.list_cases(ctx.organization_id, filter).await
    }
}
