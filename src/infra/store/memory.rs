use std::sync::RwLock;

use async_trait::async_trait;

use crate::application::repos::{RepoError, SnippetsRepo};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::SnippetRecord;
use crate::domain::types::{ActiveFlag, PublishStatus, SnippetId};

/// Mutable in-process store. Records keep insertion order; an upsert of an existing
/// id replaces it in place.
#[derive(Default)]
pub struct InMemorySnippetsRepo {
    records: RwLock<Vec<SnippetRecord>>,
}

impl InMemorySnippetsRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = SnippetRecord>) -> Self {
        let repo = Self::new();
        for record in records {
            repo.upsert(record);
        }
        repo
    }

    pub fn upsert(&self, record: SnippetRecord) {
        let mut records = rw_write(&self.records, "upsert");
        match records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    pub fn delete(&self, id: SnippetId) -> bool {
        let mut records = rw_write(&self.records, "delete");
        let before = records.len();
        records.retain(|record| record.id != id);
        records.len() != before
    }

    /// Returns false when no record has that id.
    pub fn set_active(&self, id: SnippetId, active: bool) -> bool {
        let mut records = rw_write(&self.records, "set_active");
        match records.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.active = ActiveFlag::from(active);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.records, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnippetsRepo for InMemorySnippetsRepo {
    async fn list_published(&self) -> Result<Vec<SnippetRecord>, RepoError> {
        let records = rw_read(&self.records, "list_published");
        Ok(records
            .iter()
            .filter(|record| record.status == PublishStatus::Publish)
            .cloned()
            .collect())
    }

    async fn find_snippet(&self, id: SnippetId) -> Result<Option<SnippetRecord>, RepoError> {
        let records = rw_read(&self.records, "find_snippet");
        Ok(records.iter().find(|record| record.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::domain::types::SnippetKind;
    use crate::infra::telemetry::capture::CaptureLayer;

    fn record(id: u64) -> SnippetRecord {
        SnippetRecord::new(SnippetId::new(id), SnippetKind::Css)
    }

    #[tokio::test]
    async fn upsert_replaces_in_place() {
        let repo = InMemorySnippetsRepo::with_records([record(1), record(2)]);
        let mut changed = record(1);
        changed.title = "changed".to_string();
        repo.upsert(changed);

        let listed = repo.list_published().await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "changed");
    }

    #[tokio::test]
    async fn drafts_are_findable_but_not_listed() {
        let mut draft = record(3);
        draft.status = PublishStatus::Draft;
        let repo = InMemorySnippetsRepo::with_records([draft]);

        assert!(repo.list_published().await.expect("list").is_empty());
        assert!(repo.find_snippet(SnippetId::new(3)).await.expect("find").is_some());
    }

    #[test]
    fn delete_and_toggle_report_missing_ids() {
        let repo = InMemorySnippetsRepo::with_records([record(1)]);
        assert!(repo.set_active(SnippetId::new(1), false));
        assert!(!repo.set_active(SnippetId::new(9), false));
        assert!(repo.delete(SnippetId::new(1)));
        assert!(!repo.delete(SnippetId::new(1)));
        assert!(repo.is_empty());
    }

    #[test]
    fn poisoned_store_keeps_serving_and_warns() {
        let repo = InMemorySnippetsRepo::with_records([record(1)]);
        let poisoned = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = repo.records.write().expect("fresh lock");
            panic!("writer died");
        }));
        assert!(poisoned.is_err());
        assert!(repo.records.is_poisoned());

        let (layer, events) = CaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            repo.upsert(record(2));
            assert_eq!(repo.len(), 2);
        });

        let warnings = events.matching(|event| {
            event.level == Level::WARN && event.field("result") == Some("poisoned_recovered")
        });
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].field("op"), Some("upsert"));
        assert_eq!(warnings[1].field("op"), Some("len"));
    }
}
