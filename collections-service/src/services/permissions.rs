//! Permission oracle - the role/action matrix as data.
//!
//! One table holds the whole permission surface. Adding an action means
//! adding an `Action` variant and one matrix row; an action without a row
//! is denied for every role.

use anyhow::anyhow;
use service_core::error::AppError;

use crate::models::Role;

/// Actions gated by the oracle. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    InvoicesView,
    InvoicesCreate,
    InvoicesUpdate,
    InvoicesUpdateAmount,
    InvoicesMarkPaid,
    InvoicesCancel,
    InvoicesSetExpectedDate,
    InvoicesRecordPromise,
    InvoicesRecordContact,
    InvoicesReversePayment,
    CasesView,
    CasesEscalate,
    CasesPause,
    CasesResume,
    ExportsGenerate,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::InvoicesView => "invoices:view",
            Action::InvoicesCreate => "invoices:create",
            Action::InvoicesUpdate => "invoices:update",
            Action::InvoicesUpdateAmount => "invoices:update_amount",
            Action::InvoicesMarkPaid => "invoices:mark_paid",
            Action::InvoicesCancel => "invoices:cancel",
            Action::InvoicesSetExpectedDate => "invoices:set_expected_date",
            Action::InvoicesRecordPromise => "invoices:record_promise",
            Action::InvoicesRecordContact => "invoices:record_contact",
            Action::InvoicesReversePayment => "invoices:reverse_payment",
            Action::CasesView => "cases:view",
            Action::CasesEscalate => "cases:escalate",
            Action::CasesPause => "cases:pause",
            Action::CasesResume => "cases:resume",
            Action::ExportsGenerate => "exports:generate",
        }
    }
}

/// Every Action variant, for matrix audits.
pub const ACTIONS: &[Action] = &[
    Action::InvoicesView,
    Action::InvoicesCreate,
    Action::InvoicesUpdate,
    Action::InvoicesUpdateAmount,
    Action::InvoicesMarkPaid,
    Action::InvoicesCancel,
    Action::InvoicesSetExpectedDate,
    Action::InvoicesRecordPromise,
    Action::InvoicesRecordContact,
    Action::InvoicesReversePayment,
    Action::CasesView,
    Action::CasesEscalate,
    Action::CasesPause,
    Action::CasesResume,
    Action::ExportsGenerate,
];

const ALL_ROLES: &[Role] = &[Role::Owner, Role::Admin, Role::Member, Role::Viewer];
const WRITERS: &[Role] = &[Role::Owner, Role::Admin, Role::Member];
const MANAGERS: &[Role] = &[Role::Owner, Role::Admin];
const OWNER_ONLY: &[Role] = &[Role::Owner];

/// The role-set admitted per action.
static PERMISSION_MATRIX: &[(Action, &[Role])] = &[
    (Action::InvoicesView, ALL_ROLES),
    (Action::InvoicesCreate, WRITERS),
    (Action::InvoicesUpdate, WRITERS),
    (Action::InvoicesUpdateAmount, MANAGERS),
    (Action::InvoicesMarkPaid, WRITERS),
    (Action::InvoicesCancel, MANAGERS),
    (Action::InvoicesSetExpectedDate, WRITERS),
    (Action::InvoicesRecordPromise, WRITERS),
    (Action::InvoicesRecordContact, WRITERS),
    (Action::InvoicesReversePayment, OWNER_ONLY),
    (Action::CasesView, ALL_ROLES),
    (Action::CasesEscalate, WRITERS),
    (Action::CasesPause, MANAGERS),
    (Action::CasesResume, MANAGERS),
    (Action::ExportsGenerate, ALL_ROLES),
];

pub fn is_allowed(role: Role, action: Action) -> bool {
    PERMISSION_MATRIX
        .iter()
        .find(|(entry, _)| *entry == action)
        .map(|(_, roles)| roles.contains(&role))
        .unwrap_or(false)
}

pub fn require_allowed(role: Role, action: Action) -> Result<(), AppError> {
    if is_allowed(role, action) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(anyhow!(
            "Role '{}' may not perform '{}'",
            role.as_str(),
            action.as_str()
        )))
    }
}
