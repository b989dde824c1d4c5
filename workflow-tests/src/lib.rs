//! Cross-service workflow integration tests library.
//!
//! Provides test infrastructure for running end-to-end collections
//! workflows: a provisioned tenant plus the full engine wired over one
//! in-memory store.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use collections_service::config::CollectionsConfig;
use collections_service::models::{
    CreateInvoice, CreateOrganizationRequest, InvoiceStatus, Membership, Organization,
    RequestContext, Role,
};
use collections_service::services::{
    CollectionCaseCoordinator, InvoiceLifecycleService, OrganizationProvisioningService,
};
use collections_service::store::MemoryStore;

/// The engine plus one provisioned organization, ready for workflows.
pub struct TestStack {
    pub store: Arc<MemoryStore>,
    pub lifecycle: InvoiceLifecycleService<MemoryStore>,
    pub coordinator: CollectionCaseCoordinator<MemoryStore>,
    pub provisioning: OrganizationProvisioningService<MemoryStore>,
    pub organization: Organization,
    pub owner_membership: Membership,
}

impl TestStack {
    /// Spin up the engine and provision a tenant named `org_name`.
    pub async fn provision(org_name: &str) -> Self {
        service_core::observability::init_tracing("workflow-tests", "warn");
        let config = CollectionsConfig::default();
        let store = Arc::new(MemoryStore::new());
        let lifecycle = InvoiceLifecycleService::new(store.clone(), &config);
        let coordinator =
            CollectionCaseCoordinator::new(store.clone(), config.playbook.clone());
        let provisioning = OrganizationProvisioningService::new(store.clone(), &config);

        let provisioned = provisioning
            .create_organization_with_owner(&CreateOrganizationRequest {
                user_id: Uuid::new_v4(),
                name: org_name.to_string(),
                country_code: Some("US".to_string()),
                default_currency: "USD".to_string(),
                idempotency_key: Uuid::new_v4().to_string(),
            })
            .await
            .expect("Failed to provision test organization");

        Self {
            store,
            lifecycle,
            coordinator,
            provisioning,
            organization: provisioned.organization,
            owner_membership: provisioned.membership,
        }
    }

    /// Context for the provisioned owner.
    pub fn owner_ctx(&self) -> RequestContext {
        RequestContext::new(
            self.organization.organization_id,
            self.owner_membership.user_id,
            Role::Owner,
        )
    }

    /// Context for an arbitrary actor in the tenant.
    pub fn ctx(&self, role: Role) -> RequestContext {
        RequestContext::new(self.organization.organization_id, Uuid::new_v4(), role)
    }

    pub fn invoice_input(&self, invoice_number: &str, amount: &str) -> CreateInvoice {
        CreateInvoice {
            company_id: Uuid::new_v4(),
            invoice_number: invoice_number.to_string(),
            amount: amount.parse::<Decimal>().expect("Invalid amount literal"),
            currency: self.organization.default_currency.clone(),
            issue_date: day(2026, 2, 1),
            due_date: day(2026, 3, 1),
            status: InvoiceStatus::Pending,
            expected_payment_date: None,
            expected_date_origin: None,
            notes: None,
        }
    }
}

pub fn day(year: i32, month: u32, dom: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, dom).expect("Invalid date literal")
}
