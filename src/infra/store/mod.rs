//! Snippet store adapters.

mod json_file;
mod memory;

pub use json_file::{ARCHIVE_VERSION, JsonFileSnippetsRepo, SnippetArchive};
pub use memory::InMemorySnippetsRepo;
