//! Host page assembly.
//!
//! Plays the host application's role: owns a fresh extension-point registry per
//! request, runs the sweep at the start, then fires the page's hooks in document order.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::error;

use crate::application::{
    dispatch::DispatchEngine,
    embed::EmbedResolver,
    error::AppError,
    hooks::{HookScope, PriorityHookRegistry},
    request::RequestContext,
};

pub const HEAD_HOOK: &str = "head";
pub const BODY_OPEN_HOOK: &str = "body_open";
pub const PAGE_FOOTER_HOOK: &str = "page_footer";
pub const ADMIN_HEAD_HOOK: &str = "admin_head";
pub const ADMIN_FOOTER_HOOK: &str = "admin_footer";

const SOURCE: &str = "application::page::PageService";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Public,
    Admin,
}

#[derive(Clone)]
pub struct PageService {
    engine: Arc<DispatchEngine>,
    embeds: Arc<EmbedResolver>,
    content: Arc<str>,
}

impl PageService {
    pub fn new(engine: Arc<DispatchEngine>, embeds: Arc<EmbedResolver>, content: impl Into<Arc<str>>) -> Self {
        Self {
            engine,
            embeds,
            content: content.into(),
        }
    }

    pub fn engine(&self) -> &DispatchEngine {
        &self.engine
    }

    /// Assemble on the blocking pool. Code snippets may block on an external
    /// interpreter, so a stalled snippet holds a blocking thread instead of a
    /// runtime worker.
    pub async fn assemble_detached(
        self: Arc<Self>,
        kind: PageKind,
        request: RequestContext,
    ) -> Result<String, AppError> {
        let handle = Handle::current();
        tokio::task::spawn_blocking(move || handle.block_on(self.assemble(kind, &request)))
            .await
            .map_err(|err| AppError::unexpected(format!("page assembly task failed: {err}")))?
    }

    /// Assemble one page for `request`.
    pub async fn assemble(&self, kind: PageKind, request: &RequestContext) -> Result<String, AppError> {
        let mut registry = PriorityHookRegistry::new();
        let mut early = String::new();
        self.engine
            .run_sweep(request, &mut registry, &mut early)
            .await
            .map_err(|err| {
                error!(
                    target = SOURCE,
                    op = "assemble",
                    request_id = request.request_id.as_str(),
                    error = %err,
                    "Snippet sweep could not read the store"
                );
                AppError::from(err)
            })?;

        let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n");
        match kind {
            PageKind::Public => {
                fire(&registry, HEAD_HOOK, request, &mut html);
                html.push_str("</head>\n<body>\n");
                html.push_str(&early);
                fire(&registry, BODY_OPEN_HOOK, request, &mut html);
                html.push_str("<main>");
                html.push_str(&self.embeds.expand(&self.content, request).await);
                html.push_str("</main>\n");
                fire(&registry, PAGE_FOOTER_HOOK, request, &mut html);
            }
            PageKind::Admin => {
                fire(&registry, ADMIN_HEAD_HOOK, request, &mut html);
                html.push_str("</head>\n<body class=\"admin\">\n");
                html.push_str(&early);
                html.push_str("<main><h1>Snippets</h1></main>\n");
                fire(&registry, ADMIN_FOOTER_HOOK, request, &mut html);
            }
        }
        html.push_str("</body>\n</html>\n");
        Ok(html)
    }
}

fn fire(registry: &PriorityHookRegistry, hook: &str, request: &RequestContext, html: &mut String) {
    let mut scope = HookScope::new(request.viewer(), html);
    registry.fire(hook, &mut scope);
    html.push('\n');
}
