//! Shared fixtures for collections-service integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use collections_service::config::CollectionsConfig;
use collections_service::models::{
    CreateInvoice, Invoice, InvoiceStatus, RequestContext, Role,
};
use collections_service::services::{
    CollectionCaseCoordinator, InvoiceLifecycleService, OrganizationProvisioningService,
};
use collections_service::store::MemoryStore;

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("Invalid decimal literal")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("Invalid date literal")
}

/// Fixed reference day for promise-date checks.
pub fn today() -> NaiveDate {
    date(2026, 3, 10)
}

/// Engine wired over a fresh in-memory store and a single organization.
pub struct TestEngine {
    pub store: Arc<MemoryStore>,
    pub lifecycle: InvoiceLifecycleService<MemoryStore>,
    pub coordinator: CollectionCaseCoordinator<MemoryStore>,
    pub provisioning: OrganizationProvisioningService<MemoryStore>,
    pub organization_id: Uuid,
}

impl TestEngine {
    pub fn new() -> Self {
        service_core::observability::init_tracing("collections-tests", "warn");
        let config = CollectionsConfig::default();
        let store = Arc::new(MemoryStore::new());
        Self {
            lifecycle: InvoiceLifecycleService::new(store.clone(), &config),
            coordinator: CollectionCaseCoordinator::new(store.clone(), config.playbook.clone()),
            provisioning: OrganizationProvisioningService::new(store.clone(), &config),
            organization_id: Uuid::new_v4(),
            store,
        }
    }

    pub fn ctx(&self, role: Role) -> RequestContext {
        RequestContext::new(self.organization_id, Uuid::new_v4(), role)
    }

    /// A context belonging to some other tenant.
    pub fn foreign_ctx(&self, role: Role) -> RequestContext {
        RequestContext::new(Uuid::new_v4(), Uuid::new_v4(), role)
    }

    pub fn invoice_input(&self, invoice_number: &str, status: InvoiceStatus) -> CreateInvoice {
        CreateInvoice {
            company_id: Uuid::new_v4(),
            invoice_number: invoice_number.to_string(),
            amount: dec("1250.00"),
            currency: "EUR".to_string(),
            issue_date: date(2026, 2, 1),
            due_date: date(2026, 3, 1),
            status,
            expected_payment_date: None,
            expected_date_origin: None,
            notes: None,
        }
    }

    pub async fn pending_invoice(&self, invoice_number: &str) -> Invoice {
        self.lifecycle
            .create_invoice(
                &self.ctx(Role::Member),
                &self.invoice_input(invoice_number, InvoiceStatus::Pending),
            )
            .await
            .expect("Failed to create pending invoice")
    }

    pub async fn draft_invoice(&self, invoice_number: &str) -> Invoice {
        self.lifecycle
            .create_invoice(
                &self.ctx(Role::Member),
                &self.invoice_input(invoice_number, InvoiceStatus::Draft),
            )
            .await
            .expect("Failed to create draft invoice")
    }
}
