//! Capability checks guarding the aggregation and metadata queries.
//!
//! Verification mechanics (tokens, headers) belong to the transport
//! layer; the relay only consumes the proven level and applies these
//! preconditions before any guarded query runs.

use crate::error::AuthError;
use crate::relay::RelayConfig;
use crate::types::{AuthMetadata, CapabilityDescriptor};

/// Proven capability level of a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// May query aggregates and metadata for the bound host only.
    TenantUser { host: String },

    /// May query cross-tenant aggregates. Implies every tenant-user
    /// capability.
    Admin,
}

/// Require a capability bound to `host`.
///
/// Administrators pass unconditionally; a tenant-user passes only for
/// the host their capability is bound to.
pub fn require_tenant_user(caller: &Capability, host: &str) -> Result<(), AuthError> {
    match caller {
        Capability::Admin => Ok(()),
        Capability::TenantUser { host: bound } if bound == host => Ok(()),
        Capability::TenantUser { .. } => Err(AuthError::Unauthorized),
    }
}

/// Require the administrator capability.
pub fn require_admin(caller: &Capability) -> Result<(), AuthError> {
    match caller {
        Capability::Admin => Ok(()),
        Capability::TenantUser { .. } => Err(AuthError::Unauthorized),
    }
}

/// Build the static auth descriptor from configuration.
pub(crate) fn build_metadata(config: &RelayConfig) -> AuthMetadata {
    AuthMetadata {
        scheme: "bearer".to_string(),
        token_header: config.token_header.clone(),
        levels: vec![
            CapabilityDescriptor {
                level: "tenant-user".to_string(),
                proof: "hex HMAC-SHA256 of the tenant host under the shared tenant secret"
                    .to_string(),
            },
            CapabilityDescriptor {
                level: "admin".to_string(),
                proof: "configured administrator token".to_string(),
            },
        ],
    }
}
