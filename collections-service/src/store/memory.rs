//! In-memory reference store.
//!
//! A single RwLock stands in for the relational store's transaction
//! boundary: every multi-entity write happens under one write guard, and
//! the unique constraints (idempotency key, slug, one open case per
//! invoice) are checked inside that guard.

use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use service_core::error::AppError;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    CaseStatus, CollectionCase, Invoice, ListCasesFilter, ListInvoicesFilter, Membership,
    Organization, Role,
};

use super::{CollectionCaseStore, InvoiceStore, OrganizationStore};

#[derive(Default)]
struct Inner {
    invoices: HashMap<Uuid, Invoice>,
    cases: HashMap<Uuid, CollectionCase>,
    organizations: HashMap<Uuid, Organization>,
    memberships: HashMap<Uuid, Membership>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn open_case_conflict(inner: &Inner, case: &CollectionCase) -> bool {
    case.status != CaseStatus::Closed
        && inner.cases.values().any(|existing| {
            existing.case_id != case.case_id
                && existing.invoice_id == case.invoice_id
                && existing.status != CaseStatus::Closed
        })
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn get_invoice(
        &self,
        organization_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .invoices
            .get(&invoice_id)
            .filter(|invoice| invoice.organization_id == organization_id)
            .cloned())
    }

    async fn list_invoices(
        &self,
        organization_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let inner = self.inner.read().await;
        let mut invoices: Vec<Invoice> = inner
            .invoices
            .values()
            .filter(|invoice| invoice.organization_id == organization_id)
            .filter(|invoice| filter.status.is_none_or(|s| invoice.status == s))
            .filter(|invoice| filter.company_id.is_none_or(|c| invoice.company_id == c))
            .filter(|invoice| filter.due_after.is_none_or(|d| invoice.due_date >= d))
            .filter(|invoice| filter.due_before.is_none_or(|d| invoice.due_date <= d))
            .cloned()
            .collect();
        invoices.sort_by_key(|invoice| (invoice.due_date, invoice.invoice_id));
        Ok(invoices)
    }

    async fn persist_invoice(
        &self,
        invoice: &Invoice,
        case: Option<&CollectionCase>,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if let Some(case) = case {
            if open_case_conflict(&inner, case) {
                return Err(AppError::Conflict(anyhow!(
                    "Invoice {} already has an open collection case",
                    case.invoice_id
                )));
            }
            inner.cases.insert(case.case_id, case.clone());
        }
        inner.invoices.insert(invoice.invoice_id, invoice.clone());
        Ok(())
    }
}

#[async_trait]
impl CollectionCaseStore for MemoryStore {
    async fn get_case(
        &self,
        organization_id: Uuid,
        case_id: Uuid,
    ) -> Result<Option<CollectionCase>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .cases
            .get(&case_id)
            .filter(|case| case.organization_id == organization_id)
            .cloned())
    }

    async fn open_case_for_invoice(
        &self,
        organization_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<CollectionCase>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .cases
            .values()
            .find(|case| {
                case.organization_id == organization_id
                    && case.invoice_id == invoice_id
                    && case.status != CaseStatus::Closed
            })
            .cloned())
    }

    async fn upsert_case(&self, case: &CollectionCase) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if open_case_conflict(&inner, case) {
            return Err(AppError::Conflict(anyhow!(
                "Invoice {} already has an open collection case",
                case.invoice_id
            )));
        }
        inner.cases.insert(case.case_id, case.clone());
        Ok(())
    }

    async fn list_cases(
        &self,
        organization_id: Uuid,
        filter: &ListCasesFilter,
    ) -> Result<Vec<CollectionCase>, AppError> {
        let inner = self.inner.read().await;
        let mut cases: Vec<CollectionCase> = inner
            .cases
            .values()
            .filter(|case| case.organization_id == organization_id)
            .filter(|case| filter.status.is_none_or(|s| case.status == s))
            .filter(|case| filter.stage.is_none_or(|s| case.stage == s))
            .filter(|case| filter.company_id.is_none_or(|c| case.company_id == c))
            .cloned()
            .collect();
        cases.sort_by_key(|case| (case.created_utc, case.case_id));
        Ok(cases)
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn find_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<(Organization, Membership)>, AppError> {
        let inner = self.inner.read().await;
        let Some(organization) = inner
            .organizations
            .values()
            .find(|org| org.idempotency_key == idempotency_key)
            .cloned()
        else {
            return Ok(None);
        };
        let membership = inner
            .memberships
            .values()
            .find(|m| {
                m.organization_id == organization.organization_id && m.role == Role::Owner
            })
            .cloned()
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow!(
                    "Organization {} has no owning membership",
                    organization.organization_id
                ))
            })?;
        Ok(Some((organization, membership)))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.organizations.values().any(|org| org.slug == slug))
    }

    async fn create_with_owner(
        &self,
        organization: &Organization,
        membership: &Membership,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if inner
            .organizations
            .values()
            .any(|org| org.idempotency_key == organization.idempotency_key)
        {
            return Err(AppError::Conflict(anyhow!(
                "Idempotency key already used"
            )));
        }
        if inner
            .organizations
            .values()
            .any(|org| org.slug == organization.slug)
        {
            return Err(AppError::Conflict(anyhow!(
                "Organization slug '{}' already exists",
                organization.slug
            )));
        }
        inner
            .organizations
            .insert(organization.organization_id, organization.clone());
        inner
            .memberships
            .insert(membership.membership_id, membership.clone());
        Ok(())
    }

    async fn get_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<Organization>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.organizations.get(&organization_id).cloned())
    }

    async fn membership_for(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .memberships
            .values()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .cloned())
    }
}
