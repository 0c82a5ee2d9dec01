//! Per-request view of the inbound signals the dispatch core reacts to.

use std::collections::HashMap;

/// Who is looking at the output being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewer {
    privileged: bool,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { privileged: false }
    }

    pub fn privileged() -> Self {
        Self { privileged: true }
    }

    /// Whether the viewer may see internal diagnostics and the safe-mode banner.
    pub fn is_privileged(self) -> bool {
        self.privileged
    }
}

/// Inbound request state: query parameters and the resolved viewer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: String,
    query: HashMap<String, String>,
    viewer: Viewer,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, viewer: Viewer) -> Self {
        Self {
            request_id: request_id.into(),
            query: HashMap::new(),
            viewer,
        }
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn viewer(&self) -> Viewer {
        self.viewer
    }
}
