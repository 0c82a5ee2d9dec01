use serde::Serialize;

use crate::domain::entities::{Snippet, SnippetRecord};
use crate::domain::types::{SnippetId, SnippetKind};

/// Everything the renderer needs to produce one snippet's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnippetUnit {
    pub id: SnippetId,
    pub kind: SnippetKind,
    pub code: String,
    pub title: String,
}

impl From<&Snippet> for SnippetUnit {
    fn from(snippet: &Snippet) -> Self {
        Self {
            id: snippet.id,
            kind: snippet.kind,
            code: snippet.code.clone(),
            title: snippet.title.clone(),
        }
    }
}

impl From<&SnippetRecord> for SnippetUnit {
    fn from(record: &SnippetRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            code: record.code.clone(),
            title: record.title.clone(),
        }
    }
}

/// How the renderer delivered a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Emitted,
    /// Nothing to emit: unknown type or an empty executable unit.
    Skipped,
    /// The executor faulted; the fault was logged and contained.
    Faulted,
}
