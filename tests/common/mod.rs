#![allow(dead_code)]

use std::sync::Arc;

use sniphook::{
    application::{
        dispatch::{DispatchEngine, DispatchOptions},
        embed::EmbedResolver,
        executor::{CodeExecutor, ExecutionFault, FaultOrigin, OPEN_MARKER},
        page::PageService,
        render::SnippetRenderer,
        request::{RequestContext, Viewer},
        safe_mode::SafeModeGate,
    },
    cache::{ActiveSnippetCache, CacheConfig},
    domain::{
        entities::SnippetRecord,
        types::{ActiveFlag, SnippetId, SnippetKind},
    },
    infra::store::InMemorySnippetsRepo,
};

/// Echoes the unit body back. `fail(` raises a fault, `panic(` panics.
pub struct EchoExecutor;

impl CodeExecutor for EchoExecutor {
    fn execute(&self, source: &str, out: &mut String) -> Result<(), ExecutionFault> {
        let body = source
            .strip_prefix(OPEN_MARKER)
            .unwrap_or(source)
            .trim();
        if body.contains("panic(") {
            panic!("executor blew up");
        }
        if body.contains("fail(") {
            out.push_str("partial;");
            return Err(ExecutionFault::new("Call to undefined function fail()")
                .with_origin(FaultOrigin::new("snippet", Some(2))));
        }
        out.push_str(body);
        Ok(())
    }
}

pub fn record(id: u64, kind: SnippetKind, hook: &str, code: &str) -> SnippetRecord {
    let mut record = SnippetRecord::new(SnippetId::new(id), kind);
    record.hook = hook.to_string();
    record.code = code.to_string();
    record.title = format!("Snippet {id}");
    record
}

pub fn with_priority(mut record: SnippetRecord, priority: i32) -> SnippetRecord {
    record.priority = Some(priority);
    record
}

pub fn with_active(mut record: SnippetRecord, active: ActiveFlag) -> SnippetRecord {
    record.active = active;
    record
}

pub fn anonymous() -> RequestContext {
    RequestContext::new("test-request", Viewer::anonymous())
}

pub fn privileged() -> RequestContext {
    RequestContext::new("test-request", Viewer::privileged())
}

pub fn safe_mode(request: RequestContext) -> RequestContext {
    request.with_param("safe_mode", "1")
}

/// Every component wired over one in-memory store.
pub struct Harness {
    pub repo: Arc<InMemorySnippetsRepo>,
    pub cache: Arc<ActiveSnippetCache>,
    pub engine: Arc<DispatchEngine>,
    pub embeds: Arc<EmbedResolver>,
    pub pages: Arc<PageService>,
}

impl Harness {
    pub fn new(records: Vec<SnippetRecord>) -> Self {
        Self::with_content(records, "")
    }

    pub fn with_content(records: Vec<SnippetRecord>, content: &str) -> Self {
        let repo = Arc::new(InMemorySnippetsRepo::with_records(records));
        let cache = Arc::new(ActiveSnippetCache::new(repo.clone(), CacheConfig::default()));
        let renderer = SnippetRenderer::new(Arc::new(EchoExecutor));
        let gate = SafeModeGate::default();
        let engine = Arc::new(DispatchEngine::new(
            cache.clone(),
            renderer.clone(),
            gate.clone(),
            DispatchOptions::default(),
        ));
        let embeds = Arc::new(EmbedResolver::new(repo.clone(), renderer, gate));
        let pages = Arc::new(PageService::new(engine.clone(), embeds.clone(), content));
        Self {
            repo,
            cache,
            engine,
            embeds,
            pages,
        }
    }
}
