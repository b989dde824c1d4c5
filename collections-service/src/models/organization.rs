//! Organization and membership models - the tenant boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Membership role within an organization.
///
/// Privilege broadly orders Owner > Admin > Member > Viewer, but the
/// permission matrix is consulted per action - some actions skip Member
/// even though Member holds wider write access elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Viewer => "viewer",
        }
    }
}

/// Organization entity - the isolation boundary for every other record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
    pub country_code: Option<String>,
    pub default_currency: String,
    pub idempotency_key: String,
    pub created_utc: DateTime<Utc>,
}

impl Organization {
    /// Create a new organization.
    pub fn new(
        name: String,
        slug: String,
        country_code: Option<String>,
        default_currency: String,
        idempotency_key: String,
    ) -> Self {
        Self {
            organization_id: Uuid::new_v4(),
            name,
            slug,
            country_code,
            default_currency,
            idempotency_key,
            created_utc: Utc::now(),
        }
    }
}

/// Membership entity - binds a user to an organization with a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub membership_id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub created_utc: DateTime<Utc>,
}

impl Membership {
    /// Create a new membership.
    pub fn new(organization_id: Uuid, user_id: Uuid, role: Role) -> Self {
        Self {
            membership_id: Uuid::new_v4(),
            organization_id,
            user_id,
            role,
            created_utc: Utc::now(),
        }
    }
}

/// Request to provision an organization with its owning membership.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(equal = 2))]
    pub country_code: Option<String>,
    pub default_currency: String,
    #[validate(length(min = 1, max = 64))]
    pub idempotency_key: String,
}

/// Result of a provisioning call. `is_duplicate` marks a replayed
/// idempotency key: the original organization is returned instead of a
/// second tenant.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedOrganization {
    pub organization: Organization,
    pub membership: Membership,
    pub is_duplicate: bool,
}
