use thiserror::Error;

use crate::application::repos::RepoError;
use crate::cache::{CacheError, InvalidationError};
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Invalidation(#[from] InvalidationError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::Domain(DomainError::NotFound { .. }) | AppError::Repo(RepoError::NotFound)
        )
    }

    pub fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::Repo(RepoError::NotFound) => {
                "Resource not found"
            }
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Validation(_)
            | AppError::Repo(RepoError::InvalidInput { .. })
            | AppError::Repo(RepoError::Duplicate { .. }) => "Request could not be processed",
            AppError::Repo(RepoError::Timeout) => "Storage timed out",
            AppError::Repo(_) | AppError::Infra(InfraError::Database { .. }) => {
                "Service temporarily unavailable"
            }
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Cache(_) => "Cache unavailable",
            AppError::Invalidation(_) => "Cache invalidation incomplete",
            AppError::Domain(DomainError::Invariant { .. }) | AppError::Unexpected(_) => {
                "Unexpected error occurred"
            }
        }
    }

    /// Process exit status for the operator CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            _ if self.is_not_found() => 4,
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => 2,
            AppError::Repo(_) | AppError::Infra(InfraError::Database { .. }) => 3,
            AppError::Cache(_) | AppError::Invalidation(_) => 5,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TenantId;

    #[test]
    fn not_found_from_either_layer() {
        let domain = AppError::from(DomainError::not_found("project", TenantId::new(1), 9));
        let repo = AppError::from(RepoError::NotFound);
        assert!(domain.is_not_found());
        assert!(repo.is_not_found());
        assert_eq!(domain.exit_code(), 4);
        assert_eq!(repo.presentation_message(), "Resource not found");
    }

    #[test]
    fn persistence_failures_read_as_unavailable() {
        let err = AppError::from(RepoError::from_persistence("connection refused"));
        assert_eq!(err.presentation_message(), "Service temporarily unavailable");
        assert_eq!(err.exit_code(), 3);
    }
}
