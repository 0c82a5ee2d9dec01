use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::{error::ErrorReport, request::Viewer};

use super::HttpState;

pub(super) const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Clone)]
pub struct RequestId(pub String);

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = RequestId(Uuid::new_v4().to_string());
    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(request_id);
    response
}

/// Resolves the viewer from the presented admin token and stores it on the request.
pub async fn resolve_viewer(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let viewer = match presented_token(request.headers()) {
        Some(token) if state.privilege.verify(token) => Viewer::privileged(),
        Some(_) => {
            warn!(
                target = "sniphook::http::privilege",
                path = %request.uri().path(),
                result = "rejected",
                "Admin token did not match"
            );
            Viewer::anonymous()
        }
        None => Viewer::anonymous(),
    };
    request.extensions_mut().insert(viewer);
    next.run(request).await
}

fn presented_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .or_else(|| {
            headers
                .get(ADMIN_TOKEN_HEADER)
                .and_then(|value| value.to_str().ok())
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Logs every response; failures carry the diagnostic their handler attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let started_at = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_millis() as u64;

    if !status.is_client_error() && !status.is_server_error() {
        debug!(
            target = "sniphook::http::response",
            op = "respond",
            status = status.as_u16(),
            method = %method,
            path = path.as_str(),
            elapsed_ms,
            request_id = request_id.as_str(),
            "Request served"
        );
        return response;
    }

    let report = response.extensions_mut().remove::<ErrorReport>();
    let source = report.as_ref().map_or("unknown", |report| report.source);
    let chain = report.map(|report| report.messages).unwrap_or_default();
    let detail = chain
        .first()
        .map(String::as_str)
        .unwrap_or("no diagnostic available");

    if status.is_server_error() {
        error!(
            target = "sniphook::http::response",
            op = "respond",
            status = status.as_u16(),
            method = %method,
            path = path.as_str(),
            elapsed_ms,
            request_id = request_id.as_str(),
            source,
            detail,
            chain = ?chain,
            "Request failed"
        );
    } else {
        warn!(
            target = "sniphook::http::response",
            op = "respond",
            status = status.as_u16(),
            method = %method,
            path = path.as_str(),
            elapsed_ms,
            request_id = request_id.as_str(),
            source,
            detail,
            "Request rejected"
        );
    }
    response
}
