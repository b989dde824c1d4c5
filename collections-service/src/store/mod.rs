//! Repository interfaces - the engine's persistence boundary.
//!
//! Implementations are expected to back these traits with a transactional
//! relational store. The engine relies on three storage-level guarantees:
//! tenant-keyed reads return None for rows owned by another organization,
//! multi-entity writes (`persist_invoice`, `create_with_owner`) apply
//! atomically, and the unique constraints (idempotency key, slug, one
//! open case per invoice) are enforced by the store rather than by
//! in-process locks.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    CollectionCase, Invoice, ListCasesFilter, ListInvoicesFilter, Membership, Organization,
};

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Tenant-scoped fetch. Absence and cross-tenant ownership are both
    /// None by design.
    async fn get_invoice(
        &self,
        organization_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, AppError>;

    async fn list_invoices(
        &self,
        organization_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError>;

    /// Write an invoice and, when present, its derived case mutation as a
    /// single transaction. Insert-or-replace keyed by id.
    async fn persist_invoice(
        &self,
        invoice: &Invoice,
        case: Option<&CollectionCase>,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait CollectionCaseStore: Send + Sync {
    async fn get_case(
        &self,
        organization_id: Uuid,
        case_id: Uuid,
    ) -> Result<Option<CollectionCase>, AppError>;

    /// The one non-closed case for an invoice, if any.
    async fn open_case_for_invoice(
        &self,
        organization_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<CollectionCase>, AppError>;

    /// Insert-or-replace keyed by case id. Fails with `Conflict` when the
    /// write would leave two open cases on one invoice.
    async fn upsert_case(&self, case: &CollectionCase) -> Result<(), AppError>;

    async fn list_cases(
        &self,
        organization_id: Uuid,
        filter: &ListCasesFilter,
    ) -> Result<Vec<CollectionCase>, AppError>;
}

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn find_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<(Organization, Membership)>, AppError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError>;

    /// Create the organization and its owning membership atomically.
    /// Fails with `Conflict` on a duplicate idempotency key or slug; a
    /// partially created tenant is never observable.
    async fn create_with_owner(
        &self,
        organization: &Organization,
        membership: &Membership,
    ) -> Result<(), AppError>;

    async fn get_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<Organization>, AppError>;

    async fn membership_for(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, AppError>;
}
