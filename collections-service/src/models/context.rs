//! Request context - tenant and actor identity carried by every operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Tenant-scoped caller identity. Supplied verbatim by the session layer;
/// the engine trusts it and scopes every read and write to
/// `organization_id`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RequestContext {
    pub organization_id: Uuid,
    pub actor_id: Uuid,
    pub role: Role,
}

impl RequestContext {
    pub fn new(organization_id: Uuid, actor_id: Uuid, role: Role) -> Self {
        Self {
            organization_id,
            actor_id,
            role,
        }
    }
}
