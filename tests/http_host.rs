mod common;

use std::{
    sync::{Arc, Mutex, mpsc},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header::AUTHORIZATION},
};
use sniphook::{
    application::{
        dispatch::{DispatchEngine, DispatchOptions},
        embed::EmbedResolver,
        executor::{CodeExecutor, ExecutionFault},
        page::PageService,
        privilege::PrivilegeGuard,
        render::SnippetRenderer,
        repos::{RepoError, SnippetsRepo},
        safe_mode::{SAFE_MODE_BANNER, SafeModeGate},
    },
    cache::{ActiveSnippetCache, CacheConfig},
    domain::{entities::SnippetRecord, types::{SnippetId, SnippetKind}},
    infra::{
        http::{HttpState, build_router},
        store::InMemorySnippetsRepo,
    },
};
use tokio::sync::Notify;
use tower::ServiceExt;

use common::{EchoExecutor, Harness, record};

const TOKEN: &str = "s3cret-admin-token";

fn app(harness: &Harness) -> Router {
    build_router(HttpState {
        pages: harness.pages.clone(),
        cache: harness.cache.clone(),
        privilege: Arc::new(PrivilegeGuard::new(Some(TOKEN.to_string()))),
    })
}

fn site() -> Harness {
    Harness::with_content(
        vec![
            record(1, SnippetKind::Html, "page_footer", "<p>footer</p>"),
            record(2, SnippetKind::Html, "admin_footer", "<p>admin</p>"),
        ],
        "content",
    )
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.expect("router should respond");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

fn get_as_admin(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .expect("request should build")
}

#[tokio::test]
async fn index_renders_deferred_snippets() {
    let harness = site();
    let (status, body) = send(app(&harness), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<main>content</main>"));
    assert!(body.contains("<p>footer</p>"));
}

#[tokio::test]
async fn safe_mode_query_hides_snippets() {
    let harness = site();

    let (_, anonymous) = send(app(&harness), get("/?safe_mode=1")).await;
    assert!(!anonymous.contains("<p>footer</p>"));
    assert!(!anonymous.contains(SAFE_MODE_BANNER));

    let (_, admin) = send(app(&harness), get_as_admin("/?safe_mode=1")).await;
    assert!(!admin.contains("<p>footer</p>"));
    assert!(admin.contains(SAFE_MODE_BANNER));

    let (_, not_one) = send(app(&harness), get("/?safe_mode=true")).await;
    assert!(not_one.contains("<p>footer</p>"));
}

#[tokio::test]
async fn admin_page_requires_the_token() {
    let harness = site();

    let (status, _) = send(app(&harness), get("/admin")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let wrong = Request::builder()
        .uri("/admin")
        .header("x-admin-token", "nope")
        .body(Body::empty())
        .expect("request should build");
    let (status, _) = send(app(&harness), wrong).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let header = Request::builder()
        .uri("/admin")
        .header("x-admin-token", TOKEN)
        .body(Body::empty())
        .expect("request should build");
    let (status, body) = send(app(&harness), header).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<p>admin</p>"));
}

#[tokio::test]
async fn invalidate_endpoint_evicts_the_cache() {
    let harness = site();
    let _ = send(app(&harness), get("/")).await;
    assert!(harness.cache.is_populated());

    let anonymous = Request::builder()
        .method(Method::POST)
        .uri("/admin/cache/invalidate")
        .body(Body::empty())
        .expect("request should build");
    let (status, _) = send(app(&harness), anonymous).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(harness.cache.is_populated());

    let admin = Request::builder()
        .method(Method::POST)
        .uri("/admin/cache/invalidate")
        .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .expect("request should build");
    let (status, _) = send(app(&harness), admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!harness.cache.is_populated());
}

#[tokio::test]
async fn health_is_no_content() {
    let (status, body) = send(app(&site()), get("/_health")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

struct UnreachableStore;

#[async_trait]
impl SnippetsRepo for UnreachableStore {
    async fn list_published(&self) -> Result<Vec<SnippetRecord>, RepoError> {
        Err(RepoError::from_persistence("connection refused"))
    }

    async fn find_snippet(&self, _id: SnippetId) -> Result<Option<SnippetRecord>, RepoError> {
        Err(RepoError::from_persistence("connection refused"))
    }
}

/// Router over an arbitrary store and executor, with no admin token configured.
fn router_over(repo: Arc<dyn SnippetsRepo>, executor: Arc<dyn CodeExecutor>) -> Router {
    let cache = Arc::new(ActiveSnippetCache::new(repo.clone(), CacheConfig::default()));
    let renderer = SnippetRenderer::new(executor);
    let gate = SafeModeGate::default();
    let engine = Arc::new(DispatchEngine::new(
        cache.clone(),
        renderer.clone(),
        gate.clone(),
        DispatchOptions::default(),
    ));
    let embeds = Arc::new(EmbedResolver::new(repo, renderer, gate));
    build_router(HttpState {
        pages: Arc::new(PageService::new(engine, embeds, "content")),
        cache,
        privilege: Arc::new(PrivilegeGuard::new(None)),
    })
}

#[tokio::test]
async fn unreachable_store_is_service_unavailable_without_detail() {
    let router = router_over(Arc::new(UnreachableStore), Arc::new(EchoExecutor));

    let (status, body) = send(router, get("/")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!body.contains("connection refused"));
}

/// Blocks the calling thread until released, like an interpreter that hangs.
struct StallingExecutor {
    entered: Arc<Notify>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl CodeExecutor for StallingExecutor {
    fn execute(&self, _source: &str, out: &mut String) -> Result<(), ExecutionFault> {
        self.entered.notify_one();
        let _ = self
            .release
            .lock()
            .expect("release lock")
            .recv_timeout(Duration::from_secs(10));
        out.push_str("slow");
        Ok(())
    }
}

#[tokio::test]
async fn stalled_snippet_does_not_hold_up_other_requests() {
    let entered = Arc::new(Notify::new());
    let (release, released) = mpsc::channel();
    let repo = Arc::new(InMemorySnippetsRepo::with_records([record(
        1,
        SnippetKind::Code,
        "page_footer",
        "hang();",
    )]));
    let router = router_over(
        repo,
        Arc::new(StallingExecutor {
            entered: entered.clone(),
            release: Mutex::new(released),
        }),
    );

    let started = Instant::now();
    let slow = tokio::spawn(router.clone().oneshot(get("/")));
    entered.notified().await;

    let (status, _) = send(router, get("/_health")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "health check waited for the stalled snippet"
    );

    release.send(()).expect("executor still waiting");
    let response = slow.await.expect("page task").expect("router should respond");
    assert_eq!(response.status(), StatusCode::OK);
}
