use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::repos::{RepoError, SnippetsRepo};
use crate::domain::entities::SnippetRecord;
use crate::domain::types::{PublishStatus, SnippetId};

pub const ARCHIVE_VERSION: u32 = 1;

/// On-disk archive shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetArchive {
    pub version: u32,
    #[serde(default)]
    pub snippets: Vec<SnippetRecord>,
}

impl SnippetArchive {
    pub fn new(snippets: Vec<SnippetRecord>) -> Self {
        Self {
            version: ARCHIVE_VERSION,
            snippets,
        }
    }
}

/// Store backed by a JSON archive file.
///
/// Every call reads the file again, so writes made by other processes are picked up
/// as soon as the active-snippet cache is invalidated. A missing file is an empty store.
#[derive(Debug, Clone)]
pub struct JsonFileSnippetsRepo {
    path: PathBuf,
}

impl JsonFileSnippetsRepo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_archive(&self) -> Result<SnippetArchive, RepoError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(
                    target = "infra::store::json_file",
                    op = "read_archive",
                    path = %self.path.display(),
                    result = "missing",
                    "Snippet archive not found; treating as empty"
                );
                return Ok(SnippetArchive::new(Vec::new()));
            }
            Err(err) => return Err(RepoError::from_persistence(err)),
        };

        let archive: SnippetArchive = serde_json::from_slice(&bytes).map_err(RepoError::decode)?;
        if archive.version != ARCHIVE_VERSION {
            return Err(RepoError::decode(format!(
                "unsupported archive version {} (expected {ARCHIVE_VERSION})",
                archive.version
            )));
        }
        Ok(archive)
    }
}

#[async_trait]
impl SnippetsRepo for JsonFileSnippetsRepo {
    async fn list_published(&self) -> Result<Vec<SnippetRecord>, RepoError> {
        let archive = self.read_archive().await?;
        Ok(archive
            .snippets
            .into_iter()
            .filter(|record| record.status == PublishStatus::Publish)
            .collect())
    }

    async fn find_snippet(&self, id: SnippetId) -> Result<Option<SnippetRecord>, RepoError> {
        let archive = self.read_archive().await?;
        Ok(archive.snippets.into_iter().find(|record| record.id == id))
    }
}
