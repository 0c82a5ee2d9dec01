use std::{collections::HashMap, future::IntoFuture, process, sync::Arc};

use sniphook::{
    application::{
        dispatch::{DispatchEngine, DispatchOptions},
        embed::EmbedResolver,
        error::AppError,
        page::{PageKind, PageService},
        privilege::PrivilegeGuard,
        render::SnippetRenderer,
        repos::SnippetsRepo,
        request::{RequestContext, Viewer},
        safe_mode::SafeModeGate,
    },
    cache::{ActiveSnippetCache, CacheConfig},
    config,
    infra::{
        error::InfraError,
        executor::ProcessExecutor,
        http::{self, HttpState, shutdown},
        store::JsonFileSnippetsRepo,
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use uuid::Uuid;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(InfraError::from)?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
        config::Command::Plan(args) => run_plan(settings, args).await,
    }
}

/// Everything wired together once per process.
struct ApplicationContext {
    repo: Arc<dyn SnippetsRepo>,
    cache: Arc<ActiveSnippetCache>,
    pages: Arc<PageService>,
}

fn build_application_context(settings: &config::Settings) -> ApplicationContext {
    let repo: Arc<dyn SnippetsRepo> = Arc::new(JsonFileSnippetsRepo::new(settings.store.path.clone()));
    let cache = Arc::new(ActiveSnippetCache::new(
        repo.clone(),
        CacheConfig::from(&settings.cache),
    ));
    let renderer = SnippetRenderer::new(Arc::new(ProcessExecutor::from(&settings.executor)));
    let gate = SafeModeGate::new(settings.dispatch.safe_mode_param.clone());

    let engine = Arc::new(DispatchEngine::new(
        cache.clone(),
        renderer.clone(),
        gate.clone(),
        DispatchOptions::from(&settings.dispatch),
    ));
    let embeds = Arc::new(EmbedResolver::new(repo.clone(), renderer, gate));
    let pages = Arc::new(PageService::new(
        engine,
        embeds,
        settings.host.content.clone(),
    ));

    ApplicationContext { repo, cache, pages }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings);
    let privilege = PrivilegeGuard::new(settings.privilege.admin_token.clone());
    if !privilege.is_configured() {
        warn!(
            target = "sniphook::serve",
            "No admin token configured; no request will be treated as privileged"
        );
    }

    let router = http::build_router(HttpState {
        pages: app.pages,
        cache: app.cache,
        privilege: Arc::new(privilege),
    });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|source| InfraError::Bind {
            addr: settings.server.addr,
            source,
        })?;
    info!(
        target = "sniphook::serve",
        addr = %settings.server.addr,
        store = %settings.store.path.display(),
        "Listening"
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(target = "sniphook::serve", error = %err, "Failed to listen for shutdown signal");
            }
            let _ = shutdown_tx.send(());
        })
        .into_future();

    let outcome = shutdown::run_with_grace(server, shutdown_rx, settings.server.graceful_shutdown)
        .await
        .map_err(InfraError::Server)?;
    info!(target = "sniphook::serve", outcome = ?outcome, "Server stopped");
    Ok(())
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let app = build_application_context(&settings);

    let viewer = if args.privileged {
        Viewer::privileged()
    } else {
        Viewer::anonymous()
    };
    let mut query = HashMap::new();
    if args.safe_mode {
        query.insert(settings.dispatch.safe_mode_param.clone(), "1".to_string());
    }
    let request = RequestContext::new(Uuid::new_v4().to_string(), viewer).with_query(query);
    let kind = if args.admin {
        PageKind::Admin
    } else {
        PageKind::Public
    };

    let html = app.pages.assemble(kind, &request).await?;
    print!("{html}");
    Ok(())
}

async fn run_plan(settings: config::Settings, args: config::PlanArgs) -> Result<(), AppError> {
    let app = build_application_context(&settings);
    let planned = app.pages.engine().plan(app.repo.as_ref()).await?;

    if args.json {
        let body = serde_json::to_string_pretty(&planned)
            .map_err(|err| AppError::unexpected(format!("failed to encode plan: {err}")))?;
        println!("{body}");
        return Ok(());
    }

    println!("{:>6}  {:<7}  {:<20}  {:>8}  DECISION", "ID", "TYPE", "HOOK", "PRIORITY");
    for entry in planned {
        println!(
            "{:>6}  {:<7}  {:<20}  {:>8}  {}",
            entry.snippet.id.get(),
            entry.snippet.kind.as_str(),
            entry.snippet.hook,
            entry.snippet.priority,
            entry.decision.as_str()
        );
    }
    Ok(())
}
