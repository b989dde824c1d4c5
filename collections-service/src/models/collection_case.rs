//! Collection case model - the workflow object tracking collections
//! activity against one invoice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position in the reminder/escalation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStage {
    Initial,
    #[serde(rename = "reminder_1")]
    Reminder1,
    #[serde(rename = "reminder_2")]
    Reminder2,
    Escalated,
    PromiseToPay,
    Resolved,
}

impl CaseStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStage::Initial => "initial",
            CaseStage::Reminder1 => "reminder_1",
            CaseStage::Reminder2 => "reminder_2",
            CaseStage::Escalated => "escalated",
            CaseStage::PromiseToPay => "promise_to_pay",
            CaseStage::Resolved => "resolved",
        }
    }

    /// Legal next stages. Advancement is monotonic along the reminder
    /// ladder; the two exceptions are the broken-promise reset
    /// (PromiseToPay -> Escalated) and the unconditional terminal edge to
    /// Resolved from every stage.
    pub fn allowed_transitions(&self) -> &'static [CaseStage] {
        match self {
            CaseStage::Initial => &[
                CaseStage::Reminder1,
                CaseStage::Escalated,
                CaseStage::PromiseToPay,
                CaseStage::Resolved,
            ],
            CaseStage::Reminder1 => &[
                CaseStage::Reminder2,
                CaseStage::Escalated,
                CaseStage::PromiseToPay,
                CaseStage::Resolved,
            ],
            CaseStage::Reminder2 => &[
                CaseStage::Escalated,
                CaseStage::PromiseToPay,
                CaseStage::Resolved,
            ],
            CaseStage::Escalated => &[CaseStage::PromiseToPay, CaseStage::Resolved],
            CaseStage::PromiseToPay => &[CaseStage::Escalated, CaseStage::Resolved],
            CaseStage::Resolved => &[],
        }
    }

    pub fn can_transition_to(&self, to: CaseStage) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// The next rung on the reminder ladder, if any.
    pub fn next_reminder(&self) -> Option<CaseStage> {
        match self {
            CaseStage::Initial => Some(CaseStage::Reminder1),
            CaseStage::Reminder1 => Some(CaseStage::Reminder2),
            CaseStage::Reminder2 => Some(CaseStage::Escalated),
            _ => None,
        }
    }
}

/// Case status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Active,
    Paused,
    Closed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Active => "active",
            CaseStatus::Paused => "paused",
            CaseStatus::Closed => "closed",
        }
    }
}

/// Collection case record.
///
/// Invariants: a Closed case has `closed_utc` set and stage Resolved; at
/// most one non-closed case exists per invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionCase {
    pub case_id: Uuid,
    pub organization_id: Uuid,
    pub invoice_id: Uuid,
    pub company_id: Uuid,
    pub stage: CaseStage,
    pub status: CaseStatus,
    pub last_communication_utc: Option<DateTime<Utc>>,
    pub next_action_utc: Option<DateTime<Utc>>,
    pub escalation_utc: Option<DateTime<Utc>>,
    pub closed_utc: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl CollectionCase {
    /// Open a new case at the start of the reminder sequence.
    pub fn new(organization_id: Uuid, invoice_id: Uuid, company_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            case_id: Uuid::new_v4(),
            organization_id,
            invoice_id,
            company_id,
            stage: CaseStage::Initial,
            status: CaseStatus::Active,
            last_communication_utc: None,
            next_action_utc: None,
            escalation_utc: None,
            closed_utc: None,
            summary: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status != CaseStatus::Closed
    }
}

/// Filter parameters for listing cases.
#[derive(Debug, Clone, Default)]
pub struct ListCasesFilter {
    pub status: Option<CaseStatus>,
    pub stage: Option<CaseStage>,
    pub company_id: Option<Uuid>,
}
