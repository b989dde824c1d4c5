//! Invoice lifecycle service - owns every invoice mutation.
//!
//! Each operation gates on the permission oracle, validates, loads the
//! invoice tenant-scoped, and persists the invoice together with the
//! derived collection-case update through a single repository call, so a
//! transition either fully applies or fully fails.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::CollectionsConfig;
use crate::models::{
    CollectionCase, ContactChannel, ContactResult, CreateInvoice, ExpectedDateOrigin, Invoice,
    InvoiceStatus, ListInvoicesFilter, RequestContext,
};
use crate::services::bulk::{execute_bulk, BulkOutcome};
use crate::services::cases::{CollectionCaseCoordinator, InvoiceEvent};
use crate::services::metrics::{CASE_STAGE_TOTAL, INVOICES_TOTAL, INVOICE_TRANSITIONS_TOTAL};
use crate::services::permissions::{require_allowed, Action};
use crate::services::validation::{
    is_valid_amount, is_valid_currency, is_valid_invoice_number, is_valid_promise_date,
    is_valid_status_transition, normalize_currency, normalize_invoice_number,
    validate_date_origin, validate_invoice_dates,
};
use crate::store::{CollectionCaseStore, InvoiceStore};

pub struct InvoiceLifecycleService<S> {
    store: Arc<S>,
    coordinator: CollectionCaseCoordinator<S>,
}

impl<S: InvoiceStore + CollectionCaseStore> InvoiceLifecycleService<S> {
    pub fn new(store: Arc<S>, config: &CollectionsConfig) -> Self {
        Self {
            coordinator: CollectionCaseCoordinator::new(store.clone(), config.playbook.clone()),
            store,
        }
    }

    /// The coordinator bound to the same store, for direct case
    /// operations (manual escalation, pause, listings).
    pub fn coordinator(&self) -> &CollectionCaseCoordinator<S> {
        &self.coordinator
    }

    async fn load_invoice(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
    ) -> Result<Invoice, AppError> {
        // Cross-tenant rows come back as None from the store, so another
        // tenant's invoice is indistinguishable from a missing one.
        self.store
            .get_invoice(ctx.organization_id, invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Invoice {} not found", invoice_id)))
    }

    fn ensure_transition(invoice: &Invoice, to: InvoiceStatus) -> Result<(), AppError> {
        if !is_valid_status_transition(invoice.status, to) {
            return Err(AppError::InvalidTransition(anyhow!(
                "Invoice {} cannot move from '{}' to '{}'",
                invoice.invoice_id,
                invoice.status.as_str(),
                to.as_str()
            )));
        }
        Ok(())
    }

    async fn commit(
        &self,
        from: Option<InvoiceStatus>,
        invoice: &Invoice,
        case: Option<&CollectionCase>,
    ) -> Result<(), AppError> {
        self.store.persist_invoice(invoice, case).await?;
        if let Some(from) = from {
            INVOICE_TRANSITIONS_TOTAL
                .with_label_values(&[from.as_str(), invoice.status.as_str()])
                .inc();
        }
        if let Some(case) = case {
            CASE_STAGE_TOTAL
                .with_label_values(&[case.stage.as_str()])
                .inc();
        }
        Ok(())
    }

    /// Create an invoice as Draft or Pending. A Pending creation opens a
    /// collection case immediately.
    #[instrument(skip(self, ctx, input), fields(organization_id = %ctx.organization_id))]
    pub async fn create_invoice(
        &self,
        ctx: &RequestContext,
        input: &CreateInvoice,
    ) -> Result<Invoice, AppError> {
        require_allowed(ctx.role, Action::InvoicesCreate)?;

        if !matches!(input.status, InvoiceStatus::Draft | InvoiceStatus::Pending) {
            return Err(AppError::InvalidInput(anyhow!(
                "Invoices are created as draft or pending, not '{}'",
                input.status.as_str()
            )));
        }
        let invoice_number = normalize_invoice_number(&input.invoice_number);
        if !is_valid_invoice_number(&invoice_number) {
            return Err(AppError::InvalidInput(anyhow!(
                "Invalid invoice number '{}'",
                input.invoice_number
            )));
        }
        if !is_valid_amount(input.amount) {
            return Err(AppError::InvalidInput(anyhow!(
                "Invalid invoice amount '{}'",
                input.amount
            )));
        }
        if !is_valid_currency(&input.currency) {
            return Err(AppError::InvalidInput(anyhow!(
                "Unsupported currency '{}'",
                input.currency
            )));
        }
        validate_invoice_dates(input.issue_date, input.due_date, input.expected_payment_date)
            .map_err(|violation| AppError::InvalidInput(anyhow!(violation)))?;
        validate_date_origin(input.expected_payment_date, input.expected_date_origin)
            .map_err(|violation| AppError::InvalidInput(anyhow!(violation)))?;

        let invoice = Invoice::new(
            ctx.organization_id,
            input,
            invoice_number,
            normalize_currency(&input.currency),
        );
        let case = if invoice.status == InvoiceStatus::Pending {
            self.coordinator
                .derive_case_update(ctx, &invoice, InvoiceEvent::BecamePending)
                .await?
        } else {
            None
        };
        self.commit(None, &invoice, case.as_ref()).await?;
        INVOICES_TOTAL
            .with_label_values(&[invoice.status.as_str()])
            .inc();

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            status = invoice.status.as_str(),
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Move a draft invoice into collection (Draft -> Pending).
    #[instrument(skip(self, ctx), fields(organization_id = %ctx.organization_id, invoice_id = %invoice_id))]
    pub async fn submit_invoice(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
    ) -> Result<Invoice, AppError> {
        require_allowed(ctx.role, Action::InvoicesUpdate)?;

        let mut invoice = self.load_invoice(ctx, invoice_id).await?;
        Self::ensure_transition(&invoice, InvoiceStatus::Pending)?;
        let from = invoice.status;
        invoice.status = InvoiceStatus::Pending;
        invoice.updated_utc = Utc::now();

        let case = self
            .coordinator
            .derive_case_update(ctx, &invoice, InvoiceEvent::BecamePending)
            .await?;
        self.commit(Some(from), &invoice, case.as_ref()).await?;

        info!(invoice_id = %invoice.invoice_id, "Invoice submitted");
        Ok(invoice)
    }

    /// Settle an invoice. Closes the active collection case.
    #[instrument(skip(self, ctx), fields(organization_id = %ctx.organization_id, invoice_id = %invoice_id))]
    pub async fn mark_as_paid(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
        payment_reference: Option<&str>,
    ) -> Result<Invoice, AppError> {
        require_allowed(ctx.role, Action::InvoicesMarkPaid)?;

        let mut invoice = self.load_invoice(ctx, invoice_id).await?;
        Self::ensure_transition(&invoice, InvoiceStatus::Paid)?;
        let from = invoice.status;
        let now = Utc::now();
        invoice.status = InvoiceStatus::Paid;
        invoice.paid_utc = Some(now);
        invoice.payment_reference = payment_reference.map(str::to_string);
        invoice.updated_utc = now;

        let case = self
            .coordinator
            .derive_case_update(ctx, &invoice, InvoiceEvent::PaymentReceived)
            .await?;
        self.commit(Some(from), &invoice, case.as_ref()).await?;

        info!(invoice_id = %invoice.invoice_id, "Invoice paid");
        Ok(invoice)
    }

    /// Record a partial payment (Pending -> PartiallyPaid). The case
    /// keeps running.
    #[instrument(skip(self, ctx), fields(organization_id = %ctx.organization_id, invoice_id = %invoice_id))]
    pub async fn record_partial_payment(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
        payment_reference: Option<&str>,
    ) -> Result<Invoice, AppError> {
        require_allowed(ctx.role, Action::InvoicesMarkPaid)?;

        let mut invoice = self.load_invoice(ctx, invoice_id).await?;
        Self::ensure_transition(&invoice, InvoiceStatus::PartiallyPaid)?;
        let from = invoice.status;
        invoice.status = InvoiceStatus::PartiallyPaid;
        if payment_reference.is_some() {
            invoice.payment_reference = payment_reference.map(str::to_string);
        }
        invoice.updated_utc = Utc::now();

        self.commit(Some(from), &invoice, None).await?;

        info!(invoice_id = %invoice.invoice_id, "Partial payment recorded");
        Ok(invoice)
    }

    /// Flag an invoice past due. Scheduler entry point: opens a case when
    /// none is running, otherwise walks the reminder ladder one rung.
    #[instrument(skip(self, ctx), fields(organization_id = %ctx.organization_id, invoice_id = %invoice_id))]
    pub async fn mark_overdue(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
    ) -> Result<Invoice, AppError> {
        require_allowed(ctx.role, Action::InvoicesUpdate)?;

        let mut invoice = self.load_invoice(ctx, invoice_id).await?;
        Self::ensure_transition(&invoice, InvoiceStatus::Overdue)?;
        let from = invoice.status;
        invoice.status = InvoiceStatus::Overdue;
        invoice.updated_utc = Utc::now();

        let case = self
            .coordinator
            .derive_case_update(ctx, &invoice, InvoiceEvent::BecameOverdue)
            .await?;
        self.commit(Some(from), &invoice, case.as_ref()).await?;

        info!(invoice_id = %invoice.invoice_id, "Invoice overdue");
        Ok(invoice)
    }

    /// Cancel an invoice. Terminal; the reason is mandatory and the
    /// active case resolves.
    #[instrument(skip(self, ctx, reason), fields(organization_id = %ctx.organization_id, invoice_id = %invoice_id))]
    pub async fn cancel(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
        reason: &str,
    ) -> Result<Invoice, AppError> {
        require_allowed(ctx.role, Action::InvoicesCancel)?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidInput(anyhow!(
                "Cancellation requires a reason"
            )));
        }

        let mut invoice = self.load_invoice(ctx, invoice_id).await?;
        Self::ensure_transition(&invoice, InvoiceStatus::Cancelled)?;
        let from = invoice.status;
        let now = Utc::now();
        invoice.status = InvoiceStatus::Cancelled;
        invoice.cancel_reason = Some(reason.to_string());
        invoice.cancelled_utc = Some(now);
        invoice.updated_utc = now;

        let case = self
            .coordinator
            .derive_case_update(ctx, &invoice, InvoiceEvent::Cancelled)
            .await?;
        self.commit(Some(from), &invoice, case.as_ref()).await?;

        info!(invoice_id = %invoice.invoice_id, reason = reason, "Invoice cancelled");
        Ok(invoice)
    }

    /// Reverse a misapplied payment (Paid -> Pending). The only backward
    /// transition; owner-only and audited, and collection restarts with a
    /// fresh case.
    #[instrument(skip(self, ctx, reason), fields(organization_id = %ctx.organization_id, invoice_id = %invoice_id, actor_id = %ctx.actor_id))]
    pub async fn reverse_to_pending(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
        reason: &str,
    ) -> Result<Invoice, AppError> {
        require_allowed(ctx.role, Action::InvoicesReversePayment)?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidInput(anyhow!(
                "Payment reversal requires a reason"
            )));
        }

        let mut invoice = self.load_invoice(ctx, invoice_id).await?;
        Self::ensure_transition(&invoice, InvoiceStatus::Pending)?;
        let from = invoice.status;
        invoice.status = InvoiceStatus::Pending;
        invoice.paid_utc = None;
        invoice.reversal_reason = Some(reason.to_string());
        invoice.updated_utc = Utc::now();

        let case = self
            .coordinator
            .derive_case_update(ctx, &invoice, InvoiceEvent::BecamePending)
            .await?;
        self.commit(Some(from), &invoice, case.as_ref()).await?;

        info!(
            invoice_id = %invoice.invoice_id,
            actor_id = %ctx.actor_id,
            reason = reason,
            "Payment reversed"
        );
        Ok(invoice)
    }

    /// Correct the amount on an unsettled invoice.
    #[instrument(skip(self, ctx), fields(organization_id = %ctx.organization_id, invoice_id = %invoice_id))]
    pub async fn update_amount(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
        amount: Decimal,
    ) -> Result<Invoice, AppError> {
        require_allowed(ctx.role, Action::InvoicesUpdateAmount)?;

        if !is_valid_amount(amount) {
            return Err(AppError::InvalidInput(anyhow!(
                "Invalid invoice amount '{}'",
                amount
            )));
        }

        let mut invoice = self.load_invoice(ctx, invoice_id).await?;
        if matches!(
            invoice.status,
            InvoiceStatus::Paid | InvoiceStatus::Cancelled
        ) {
            return Err(AppError::InvalidTransition(anyhow!(
                "Amount of a settled invoice cannot change"
            )));
        }
        let previous = invoice.amount;
        invoice.amount = amount;
        invoice.updated_utc = Utc::now();

        self.commit(None, &invoice, None).await?;

        info!(
            invoice_id = %invoice.invoice_id,
            previous = %previous,
            new = %amount,
            actor_id = %ctx.actor_id,
            "Invoice amount updated"
        );
        Ok(invoice)
    }

    /// Set or clear the expected payment date. Does not touch status;
    /// reschedules the active case.
    #[instrument(skip(self, ctx, reason), fields(organization_id = %ctx.organization_id, invoice_id = %invoice_id))]
    pub async fn update_expected_payment_date(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
        expected_payment_date: Option<NaiveDate>,
        origin: Option<ExpectedDateOrigin>,
        reason: Option<&str>,
    ) -> Result<Invoice, AppError> {
        require_allowed(ctx.role, Action::InvoicesSetExpectedDate)?;

        validate_date_origin(expected_payment_date, origin)
            .map_err(|violation| AppError::InvalidInput(anyhow!(violation)))?;

        let mut invoice = self.load_invoice(ctx, invoice_id).await?;
        if invoice.status == InvoiceStatus::Cancelled {
            return Err(AppError::InvalidTransition(anyhow!(
                "Expected payment date of a cancelled invoice cannot change"
            )));
        }
        validate_invoice_dates(invoice.issue_date, invoice.due_date, expected_payment_date)
            .map_err(|violation| AppError::InvalidInput(anyhow!(violation)))?;

        let previous = invoice.expected_payment_date;
        invoice.expected_payment_date = expected_payment_date;
        invoice.expected_date_origin = origin;
        invoice.updated_utc = Utc::now();

        let case = self
            .coordinator
            .derive_case_update(
                ctx,
                &invoice,
                InvoiceEvent::ExpectedDateChanged {
                    expected: expected_payment_date,
                },
            )
            .await?;
        self.commit(None, &invoice, case.as_ref()).await?;

        info!(
            invoice_id = %invoice.invoice_id,
            previous = ?previous,
            new = ?expected_payment_date,
            actor_id = %ctx.actor_id,
            reason = reason.unwrap_or(""),
            "Expected payment date updated"
        );
        Ok(invoice)
    }

    /// Record a customer promise to pay. The promise must not predate the
    /// caller's reference day; the case advances to PromiseToPay.
    #[instrument(skip(self, ctx, reason), fields(organization_id = %ctx.organization_id, invoice_id = %invoice_id))]
    pub async fn record_payment_promise(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
        promise_date: NaiveDate,
        today: NaiveDate,
        reason: Option<&str>,
    ) -> Result<Invoice, AppError> {
        require_allowed(ctx.role, Action::InvoicesRecordPromise)?;

        if !is_valid_promise_date(promise_date, today) {
            return Err(AppError::InvalidInput(anyhow!(
                "Promise date {} is in the past",
                promise_date
            )));
        }

        let mut invoice = self.load_invoice(ctx, invoice_id).await?;
        if !invoice.status.is_collectible() {
            return Err(AppError::InvalidTransition(anyhow!(
                "Payment promises apply to open invoices, not '{}'",
                invoice.status.as_str()
            )));
        }
        invoice.payment_promise_date = Some(promise_date);
        invoice.expected_payment_date = Some(promise_date);
        invoice.expected_date_origin = Some(ExpectedDateOrigin::PromiseToPay);
        invoice.updated_utc = Utc::now();

        let case = self
            .coordinator
            .derive_case_update(
                ctx,
                &invoice,
                InvoiceEvent::PromiseRecorded { promise_date },
            )
            .await?;
        self.commit(None, &invoice, case.as_ref()).await?;

        info!(
            invoice_id = %invoice.invoice_id,
            promise_date = %promise_date,
            reason = reason.unwrap_or(""),
            "Payment promise recorded"
        );
        Ok(invoice)
    }

    /// Stamp the outcome of an outreach attempt on the invoice and the
    /// case.
    #[instrument(skip(self, ctx), fields(organization_id = %ctx.organization_id, invoice_id = %invoice_id))]
    pub async fn record_contact_attempt(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
        channel: ContactChannel,
        result: ContactResult,
    ) -> Result<Invoice, AppError> {
        require_allowed(ctx.role, Action::InvoicesRecordContact)?;

        let mut invoice = self.load_invoice(ctx, invoice_id).await?;
        invoice.last_channel = Some(channel);
        invoice.last_result = Some(result);
        invoice.updated_utc = Utc::now();

        let case = self
            .coordinator
            .derive_case_update(ctx, &invoice, InvoiceEvent::ContactLogged)
            .await?;
        self.commit(None, &invoice, case.as_ref()).await?;

        info!(
            invoice_id = %invoice.invoice_id,
            channel = channel.as_str(),
            result = result.as_str(),
            "Contact attempt recorded"
        );
        Ok(invoice)
    }

    pub async fn get_invoice(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
    ) -> Result<Invoice, AppError> {
        require_allowed(ctx.role, Action::InvoicesView)?;
        self.load_invoice(ctx, invoice_id).await
    }

    pub async fn list_invoices(
        &self,
        ctx: &RequestContext,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        require_allowed(ctx.role, Action::InvoicesView)?;
        self.store.list_invoices(ctx.organization_id, filter).await
    }

    /// Mark a batch of invoices paid. Per-item failures are captured, not
    /// propagated.
    #[instrument(skip(self, ctx, invoice_ids), fields(organization_id = %ctx.organization_id, count = invoice_ids.len()))]
    pub async fn bulk_mark_as_paid(
        &self,
        ctx: &RequestContext,
        invoice_ids: &[Uuid],
        payment_reference: Option<&str>,
    ) -> Result<BulkOutcome<Invoice>, AppError> {
        require_allowed(ctx.role, Action::InvoicesMarkPaid)?;

        let outcome = execute_bulk(invoice_ids, |invoice_id| {
            self.mark_as_paid(ctx, invoice_id, payment_reference)
        })
        .await?;

        info!(
            updated = outcome.updated_count(),
            failed = outcome.failed_count(),
            total = outcome.total(),
            "Bulk mark-as-paid settled"
        );
        Ok(outcome)
    }

    /// Set the expected payment date on a batch of invoices.
    #[instrument(skip(self, ctx, invoice_ids, reason), fields(organization_id = %ctx.organization_id, count = invoice_ids.len()))]
    pub async fn bulk_update_expected_dates(
        &self,
        ctx: &RequestContext,
        invoice_ids: &[Uuid],
        expected_payment_date: Option<NaiveDate>,
        origin: Option<ExpectedDateOrigin>,
        reason: Option<&str>,
    ) -> Result<BulkOutcome<Invoice>, AppError> {
        require_allowed(ctx.role, Action::InvoicesSetExpectedDate)?;

        let outcome = execute_bulk(invoice_ids, |invoice_id| {
            self.update_expected_payment_date(ctx, invoice_id, expected_payment_date, origin, reason)
        })
        .await?;

        info!(
            updated = outcome.updated_count(),
            failed = outcome.failed_count(),
            total = outcome.total(),
            "Bulk expected-date update settled"
        );
        Ok(outcome)
    }
}
