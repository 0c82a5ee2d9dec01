//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::SnippetRecord;
use crate::domain::types::SnippetId;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("stored data could not be decoded: {message}")]
    Decode { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

/// Read access to stored snippet records.
///
/// Implementations must not depend on any host initialisation beyond what is needed
/// to reach the raw records; the sweep may run before the host is fully booted.
#[async_trait]
pub trait SnippetsRepo: Send + Sync {
    /// All records whose publication status is `publish`, in store order.
    async fn list_published(&self) -> Result<Vec<SnippetRecord>, RepoError>;

    /// A single snippet record by id, regardless of publication status.
    async fn find_snippet(&self, id: SnippetId) -> Result<Option<SnippetRecord>, RepoError>;
}
