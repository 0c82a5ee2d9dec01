//! Domain entities mirrored from persistent storage.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::types::{ActiveFlag, DEFAULT_PRIORITY, PublishStatus, SnippetId, SnippetKind};

/// A snippet exactly as the store persists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetRecord {
    pub id: SnippetId,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: SnippetKind,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub hook: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default)]
    pub active: ActiveFlag,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub description: String,
}

impl SnippetRecord {
    pub fn new(id: SnippetId, kind: SnippetKind) -> Self {
        Self {
            id,
            title: String::new(),
            kind,
            code: String::new(),
            hook: String::new(),
            priority: None,
            active: ActiveFlag::Unset,
            status: PublishStatus::Publish,
            tags: BTreeSet::new(),
            description: String::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.resolve()
    }

    /// Effective priority. Only an absent value falls back to the default; an
    /// explicit `0` is kept.
    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    /// Projects the record onto the fields the dispatch path needs.
    pub fn to_snippet(&self) -> Snippet {
        Snippet {
            id: self.id,
            kind: self.kind,
            hook: self.hook.clone(),
            priority: self.effective_priority(),
            code: self.code.clone(),
            title: self.title.clone(),
            active: self.is_active(),
        }
    }
}

/// Dispatch view of a snippet with every default already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub id: SnippetId,
    pub kind: SnippetKind,
    pub hook: String,
    pub priority: i32,
    pub code: String,
    pub title: String,
    pub active: bool,
}
