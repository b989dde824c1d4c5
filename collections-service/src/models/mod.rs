//! Domain models for collections-service.

mod collection_case;
mod context;
mod invoice;
mod organization;

pub use collection_case::{CaseStage, CaseStatus, CollectionCase, ListCasesFilter};
pub use context::RequestContext;
pub use invoice::{
    ContactChannel, ContactResult, CreateInvoice, ExpectedDateOrigin, Invoice, InvoiceStatus,
    ListInvoicesFilter,
};
pub use organization::{
    CreateOrganizationRequest, Membership, Organization, ProvisionedOrganization, Role,
};
