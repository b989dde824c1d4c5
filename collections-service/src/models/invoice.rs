//! Invoice model for collections-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    PartiallyPaid,
    Overdue,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "pending" => InvoiceStatus::Pending,
            "partially_paid" => InvoiceStatus::PartiallyPaid,
            "overdue" => InvoiceStatus::Overdue,
            "paid" => InvoiceStatus::Paid,
            "cancelled" => InvoiceStatus::Cancelled,
            _ => InvoiceStatus::Draft,
        }
    }

    /// Legal next statuses. Any pair not listed here is rejected.
    ///
    /// Paid -> Pending is the single backward edge: misapplied payments
    /// must be correctable, and the reversal is gated behind the
    /// strictest permission tier.
    pub fn allowed_transitions(&self) -> &'static [InvoiceStatus] {
        match self {
            InvoiceStatus::Draft => &[
                InvoiceStatus::Pending,
                InvoiceStatus::Paid,
                InvoiceStatus::Cancelled,
            ],
            InvoiceStatus::Pending => &[
                InvoiceStatus::PartiallyPaid,
                InvoiceStatus::Paid,
                InvoiceStatus::Overdue,
                InvoiceStatus::Cancelled,
            ],
            InvoiceStatus::PartiallyPaid => &[
                InvoiceStatus::Paid,
                InvoiceStatus::Overdue,
                InvoiceStatus::Cancelled,
            ],
            InvoiceStatus::Overdue => &[InvoiceStatus::Paid, InvoiceStatus::Cancelled],
            InvoiceStatus::Paid => &[InvoiceStatus::Pending],
            InvoiceStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, to: InvoiceStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Cancelled invoices accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Statuses for which collections activity is running.
    pub fn is_collectible(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Pending | InvoiceStatus::PartiallyPaid | InvoiceStatus::Overdue
        )
    }
}

/// Where an expected payment date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedDateOrigin {
    CustomerCommitment,
    InternalEstimate,
    PromiseToPay,
}

impl ExpectedDateOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpectedDateOrigin::CustomerCommitment => "customer_commitment",
            ExpectedDateOrigin::InternalEstimate => "internal_estimate",
            ExpectedDateOrigin::PromiseToPay => "promise_to_pay",
        }
    }
}

/// Channel of the last contact attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactChannel {
    Email,
    Phone,
    Sms,
    Letter,
}

impl ContactChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactChannel::Email => "email",
            ContactChannel::Phone => "phone",
            ContactChannel::Sms => "sms",
            ContactChannel::Letter => "letter",
        }
    }
}

/// Outcome of the last contact attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactResult {
    Reached,
    NoAnswer,
    PromiseObtained,
    Refused,
}

impl ContactResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactResult::Reached => "reached",
            ContactResult::NoAnswer => "no_answer",
            ContactResult::PromiseObtained => "promise_obtained",
            ContactResult::Refused => "refused",
        }
    }
}

/// Invoice record.
///
/// Invariants: `issue_date <= due_date`; `expected_payment_date` is never
/// before `issue_date`; `expected_date_origin` is present exactly when
/// `expected_payment_date` is. Mutations go through the lifecycle service,
/// and invoices are never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub organization_id: Uuid,
    pub company_id: Uuid,
    pub invoice_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub expected_payment_date: Option<NaiveDate>,
    pub expected_date_origin: Option<ExpectedDateOrigin>,
    pub payment_promise_date: Option<NaiveDate>,
    pub payment_reference: Option<String>,
    pub last_channel: Option<ContactChannel>,
    pub last_result: Option<ContactResult>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub reversal_reason: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub paid_utc: Option<DateTime<Utc>>,
    pub cancelled_utc: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Construct a new invoice record from validated, normalized input.
    pub fn new(
        organization_id: Uuid,
        input: &CreateInvoice,
        invoice_number: String,
        currency: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            invoice_id: Uuid::new_v4(),
            organization_id,
            company_id: input.company_id,
            invoice_number,
            amount: input.amount,
            currency,
            issue_date: input.issue_date,
            due_date: input.due_date,
            status: input.status,
            expected_payment_date: input.expected_payment_date,
            expected_date_origin: input.expected_date_origin,
            payment_promise_date: None,
            payment_reference: None,
            last_channel: None,
            last_result: None,
            notes: input.notes.clone(),
            cancel_reason: None,
            reversal_reason: None,
            created_utc: now,
            updated_utc: now,
            paid_utc: None,
            cancelled_utc: None,
        }
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub company_id: Uuid,
    pub invoice_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Invoices start life as `Draft` or `Pending` only.
    pub status: InvoiceStatus,
    pub expected_payment_date: Option<NaiveDate>,
    pub expected_date_origin: Option<ExpectedDateOrigin>,
    pub notes: Option<String>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
    pub company_id: Option<Uuid>,
    pub due_after: Option<NaiveDate>,
    pub due_before: Option<NaiveDate>,
}
