//! Snippet dispatch engine.
//!
//! One sweep per request: read the active list, decide each snippet's fate, run the
//! ones bound to the sweep's own hook inline and register the rest with the host's
//! extension-point registry. Faults are contained by the renderer, so nothing here
//! handles them.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use serde::Serialize;
use tracing::{debug, info};

use crate::application::{
    hooks::{HookRegistry, HookScope},
    render::{SnippetRenderer, SnippetUnit},
    repos::{RepoError, SnippetsRepo},
    request::RequestContext,
    safe_mode::{SAFE_MODE_BANNER, SafeModeGate},
};
use crate::cache::ActiveSnippetCache;
use crate::domain::entities::Snippet;
use crate::domain::types::DEFAULT_PRIORITY;

pub const DEFAULT_SWEEP_HOOK: &str = "init";
pub const DEFAULT_BANNER_HOOKS: [&str; 2] = ["page_footer", "admin_footer"];

pub const METRIC_SWEEP_MS: &str = "sniphook_sweep_ms";

/// Where the engine sweeps and where the safe-mode banner goes.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub sweep_hook: String,
    pub banner_hooks: Vec<String>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            sweep_hook: DEFAULT_SWEEP_HOOK.to_string(),
            banner_hooks: DEFAULT_BANNER_HOOKS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl From<&crate::config::DispatchSettings> for DispatchOptions {
    fn from(settings: &crate::config::DispatchSettings) -> Self {
        Self {
            sweep_hook: settings.sweep_hook.clone(),
            banner_hooks: settings.banner_hooks.clone(),
        }
    }
}

/// Fate of one snippet in one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DispatchDecision {
    SkipInactive,
    /// Code or hook is empty: not configured yet, never an error.
    SkipEmpty,
    RunImmediate,
    RegisterDeferred { hook: String, priority: i32 },
}

impl DispatchDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchDecision::SkipInactive => "skip_inactive",
            DispatchDecision::SkipEmpty => "skip_empty",
            DispatchDecision::RunImmediate => "run_immediate",
            DispatchDecision::RegisterDeferred { .. } => "register_deferred",
        }
    }
}

/// Pure per-snippet decision. Safe mode is handled before any snippet is looked at.
pub fn decide(snippet: &Snippet, sweep_hook: &str) -> DispatchDecision {
    if !snippet.active {
        return DispatchDecision::SkipInactive;
    }
    if snippet.code.is_empty() || snippet.hook.is_empty() {
        return DispatchDecision::SkipEmpty;
    }
    if snippet.hook == sweep_hook {
        return DispatchDecision::RunImmediate;
    }
    DispatchDecision::RegisterDeferred {
        hook: snippet.hook.clone(),
        priority: snippet.priority,
    }
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub safe_mode: bool,
    pub immediate: usize,
    pub deferred: usize,
    pub skipped: usize,
    pub banners: usize,
}

/// A published record together with the decision a sweep would take for it.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedSnippet {
    pub snippet: Snippet,
    pub decision: DispatchDecision,
}

pub struct DispatchEngine {
    cache: Arc<ActiveSnippetCache>,
    renderer: SnippetRenderer,
    gate: SafeModeGate,
    options: DispatchOptions,
}

impl DispatchEngine {
    pub fn new(
        cache: Arc<ActiveSnippetCache>,
        renderer: SnippetRenderer,
        gate: SafeModeGate,
        options: DispatchOptions,
    ) -> Self {
        Self {
            cache,
            renderer,
            gate,
            options,
        }
    }

    /// Run the sweep for `request`.
    ///
    /// Output of snippets bound to the sweep hook is streamed into `out` as they run;
    /// everything else is registered into `registry` in list order.
    pub async fn run_sweep(
        &self,
        request: &RequestContext,
        registry: &mut dyn HookRegistry,
        out: &mut String,
    ) -> Result<SweepReport, RepoError> {
        let started_at = Instant::now();

        if self.gate.is_active(request) {
            let report = self.register_banner(request, registry);
            self.finish(request, &report, started_at);
            return Ok(report);
        }

        let snippets = self.cache.get_active_snippets().await?;
        let viewer = request.viewer();
        let mut report = SweepReport::default();

        for snippet in snippets.iter() {
            let decision = decide(snippet, &self.options.sweep_hook);
            debug!(
                target = "application::dispatch",
                op = "decide",
                request_id = request.request_id.as_str(),
                snippet_id = %snippet.id,
                hook = snippet.hook.as_str(),
                priority = snippet.priority,
                decision = decision.as_str(),
                "Snippet dispatch decided"
            );

            match decision {
                DispatchDecision::SkipInactive | DispatchDecision::SkipEmpty => report.skipped += 1,
                DispatchDecision::RunImmediate => {
                    self.renderer.render(&SnippetUnit::from(snippet), viewer, out);
                    report.immediate += 1;
                }
                DispatchDecision::RegisterDeferred { hook, priority } => {
                    let renderer = self.renderer.clone();
                    let unit = SnippetUnit::from(snippet);
                    registry.register(
                        &hook,
                        priority,
                        Box::new(move |scope: &mut HookScope<'_>| {
                            let viewer = scope.viewer();
                            renderer.render(&unit, viewer, scope.out());
                        }),
                    );
                    report.deferred += 1;
                }
            }
        }

        self.finish(request, &report, started_at);
        Ok(report)
    }

    /// Decision for every published record, inactive ones included.
    pub async fn plan(&self, repo: &dyn SnippetsRepo) -> Result<Vec<PlannedSnippet>, RepoError> {
        let records = repo.list_published().await?;
        Ok(records
            .iter()
            .map(|record| {
                let snippet = record.to_snippet();
                let decision = decide(&snippet, &self.options.sweep_hook);
                PlannedSnippet { snippet, decision }
            })
            .collect())
    }

    fn register_banner(&self, request: &RequestContext, registry: &mut dyn HookRegistry) -> SweepReport {
        let mut report = SweepReport {
            safe_mode: true,
            ..SweepReport::default()
        };
        if !request.viewer().is_privileged() {
            return report;
        }

        for hook in &self.options.banner_hooks {
            registry.register(
                hook,
                DEFAULT_PRIORITY,
                Box::new(|scope: &mut HookScope<'_>| {
                    if scope.viewer().is_privileged() {
                        scope.write_str(SAFE_MODE_BANNER);
                    }
                }),
            );
            report.banners += 1;
        }
        report
    }

    fn finish(&self, request: &RequestContext, report: &SweepReport, started_at: Instant) {
        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_SWEEP_MS).record(elapsed_ms);
        info!(
            target = "application::dispatch",
            op = "run_sweep",
            request_id = request.request_id.as_str(),
            safe_mode = report.safe_mode,
            immediate = report.immediate,
            deferred = report.deferred,
            skipped = report.skipped,
            banners = report.banners,
            elapsed_ms,
            "Snippet sweep finished"
        );
    }
}
