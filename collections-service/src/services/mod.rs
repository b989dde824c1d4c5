//! Services module for collections-service.

pub mod bulk;
pub mod cases;
pub mod lifecycle;
pub mod metrics;
pub mod permissions;
pub mod provisioning;
pub mod validation;

pub use bulk::{execute_bulk, BulkFailure, BulkOutcome};
pub use cases::{CollectionCaseCoordinator, InvoiceEvent};
pub use lifecycle::InvoiceLifecycleService;
pub use metrics::{get_metrics, init_metrics};
pub use permissions::{is_allowed, require_allowed, Action};
pub use provisioning::OrganizationProvisioningService;
