//! Minimal HTTP host around the dispatch core.

mod admin;
mod middleware;
mod public;
pub mod shutdown;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware};

use crate::application::{page::PageService, privilege::PrivilegeGuard};
use crate::cache::ActiveSnippetCache;

pub use middleware::RequestId;

#[derive(Clone)]
pub struct HttpState {
    pub pages: Arc<PageService>,
    pub cache: Arc<ActiveSnippetCache>,
    pub privilege: Arc<PrivilegeGuard>,
}

pub fn build_router(state: HttpState) -> Router {
    public::routes()
        .merge(admin::routes())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_viewer,
        ))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
