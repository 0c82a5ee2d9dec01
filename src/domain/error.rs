use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid snippet id `{raw}`: {reason}")]
    InvalidSnippetId { raw: String, reason: String },
}

impl DomainError {
    pub fn invalid_snippet_id(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSnippetId {
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}
