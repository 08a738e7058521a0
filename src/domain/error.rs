use thiserror::Error;

use super::types::{RecordId, TenantId};

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("`{entity}` #{id} not found for tenant {tenant}")]
    NotFound {
        entity: &'static str,
        tenant: TenantId,
        id: RecordId,
    },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
    #[error("domain invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str, tenant: TenantId, id: RecordId) -> Self {
        Self::NotFound { entity, tenant, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}
