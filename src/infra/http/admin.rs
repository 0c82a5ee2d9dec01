use std::collections::HashMap;

use axum::{
    Extension, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use tracing::info;

use crate::application::{error::AppError, page::PageKind, request::Viewer};

use super::{HttpState, RequestId, public::request_context};

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/admin", get(admin_page))
        .route("/admin/cache/invalidate", post(invalidate_cache))
}

fn require_privilege(viewer: Viewer) -> Result<(), AppError> {
    if viewer.is_privileged() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

async fn admin_page(
    State(state): State<HttpState>,
    Extension(request_id): Extension<RequestId>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Html<String>, AppError> {
    require_privilege(viewer)?;
    let request = request_context(&request_id, viewer, query);
    let html = state.pages.clone().assemble_detached(PageKind::Admin, request).await?;
    Ok(Html(html))
}

/// The write-side contract: anything that changes the store calls this afterwards.
async fn invalidate_cache(
    State(state): State<HttpState>,
    Extension(request_id): Extension<RequestId>,
    Extension(viewer): Extension<Viewer>,
) -> Result<StatusCode, AppError> {
    require_privilege(viewer)?;
    state.cache.invalidate();
    info!(
        target = "sniphook::http::admin",
        op = "invalidate_cache",
        request_id = request_id.0.as_str(),
        result = "ok",
        "Active-snippet cache invalidated on request"
    );
    Ok(StatusCode::NO_CONTENT)
}
