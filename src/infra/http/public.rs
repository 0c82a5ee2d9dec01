use std::collections::HashMap;

use axum::{
    Extension, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};

use crate::application::{
    error::AppError,
    page::PageKind,
    request::{RequestContext, Viewer},
};

use super::{HttpState, RequestId};

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/", get(index))
        .route("/_health", get(health))
}

pub(super) fn request_context(
    request_id: &RequestId,
    viewer: Viewer,
    query: HashMap<String, String>,
) -> RequestContext {
    RequestContext::new(request_id.0.clone(), viewer).with_query(query)
}

async fn index(
    State(state): State<HttpState>,
    Extension(request_id): Extension<RequestId>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Html<String>, AppError> {
    let request = request_context(&request_id, viewer, query);
    let html = state.pages.clone().assemble_detached(PageKind::Public, request).await?;
    Ok(Html(html))
}

async fn health() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
