//! Snippet renderer.
//!
//! The renderer is the only place the untrusted execution capability is invoked,
//! so it is also the only place failures are handled: every fault raised by a
//! `code` snippet (returned error or panic) stops here, is logged once, and is
//! surfaced inline only to privileged viewers.

mod types;

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use metrics::counter;
use tracing::{debug, error};

use crate::application::{
    executor::{CodeExecutor, ExecutionFault, FaultOrigin, normalize_code},
    request::Viewer,
};
use crate::domain::types::SnippetKind;

pub use types::{RenderOutcome, SnippetUnit};

pub const METRIC_SNIPPET_FAULT_TOTAL: &str = "sniphook_snippet_fault_total";

#[derive(Clone)]
pub struct SnippetRenderer {
    executor: Arc<dyn CodeExecutor>,
}

impl SnippetRenderer {
    pub fn new(executor: Arc<dyn CodeExecutor>) -> Self {
        Self { executor }
    }

    /// Streams the unit's output into `out`.
    pub fn render(&self, unit: &SnippetUnit, viewer: Viewer, out: &mut String) -> RenderOutcome {
        match unit.kind {
            SnippetKind::Css => {
                out.push_str("<style id=\"sniphook-snippet-");
                out.push_str(&unit.id.to_string());
                out.push_str("\">");
                out.push_str(&unit.code);
                out.push_str("</style>");
                RenderOutcome::Emitted
            }
            SnippetKind::Html => {
                out.push_str(&unit.code);
                RenderOutcome::Emitted
            }
            SnippetKind::Code => self.run_code(unit, viewer, out),
            SnippetKind::Unknown => {
                debug!(
                    target = "application::render",
                    op = "render_snippet",
                    snippet_id = %unit.id,
                    result = "unknown_type",
                    "Snippet type not recognised; nothing rendered"
                );
                RenderOutcome::Skipped
            }
        }
    }

    /// Buffered variant used by the embed path.
    pub fn render_to_string(&self, unit: &SnippetUnit, viewer: Viewer) -> String {
        let mut out = String::new();
        self.render(unit, viewer, &mut out);
        out
    }

    fn run_code(&self, unit: &SnippetUnit, viewer: Viewer, out: &mut String) -> RenderOutcome {
        let source = normalize_code(&unit.code);
        if source.is_empty() {
            return RenderOutcome::Skipped;
        }

        let executor = &self.executor;
        let result = panic::catch_unwind(AssertUnwindSafe(|| executor.execute(&source, out)));

        let fault = match result {
            Ok(Ok(())) => return RenderOutcome::Emitted,
            Ok(Err(fault)) => fault,
            Err(payload) => ExecutionFault::new(panic_message(payload.as_ref()))
                .with_origin(FaultOrigin::new("executor panic", None)),
        };

        report_fault(unit, viewer, &fault, out);
        RenderOutcome::Faulted
    }
}

fn report_fault(unit: &SnippetUnit, viewer: Viewer, fault: &ExecutionFault, out: &mut String) {
    counter!(METRIC_SNIPPET_FAULT_TOTAL).increment(1);

    let origin = fault
        .origin
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown".to_string());
    error!(
        target = "application::render",
        op = "render_snippet",
        result = "fault",
        snippet_id = %unit.id,
        snippet_title = unit.title.as_str(),
        error = fault.message.as_str(),
        origin = origin.as_str(),
        "Snippet execution failed"
    );

    if viewer.is_privileged() {
        out.push_str("<!-- Snippet Error (ID: ");
        out.push_str(&unit.id.to_string());
        out.push_str("): ");
        out.push_str(&escape_html(&fault.message));
        out.push_str(" -->");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "executor panicked".to_string()
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::domain::types::SnippetId;
    use crate::infra::telemetry::capture::CaptureLayer;

    /// Records what it was asked to run and replays a scripted result.
    struct ScriptedExecutor {
        seen: Mutex<Vec<String>>,
        partial: &'static str,
        fault: Option<&'static str>,
        panic: bool,
    }

    impl ScriptedExecutor {
        fn ok(partial: &'static str) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                partial,
                fault: None,
                panic: false,
            }
        }

        fn failing(partial: &'static str, message: &'static str) -> Self {
            Self {
                fault: Some(message),
                ..Self::ok(partial)
            }
        }

        fn panicking() -> Self {
            Self {
                panic: true,
                ..Self::ok("")
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().expect("seen lock").clone()
        }
    }

    impl CodeExecutor for ScriptedExecutor {
        fn execute(&self, source: &str, out: &mut String) -> Result<(), ExecutionFault> {
            self.seen.lock().expect("seen lock").push(source.to_string());
            out.push_str(self.partial);
            if self.panic {
                panic!("interpreter crashed");
            }
            match self.fault {
                Some(message) => Err(ExecutionFault::new(message)
                    .with_origin(FaultOrigin::new("snippet", Some(2)))),
                None => Ok(()),
            }
        }
    }

    fn unit(kind: SnippetKind, code: &str) -> SnippetUnit {
        SnippetUnit {
            id: SnippetId::new(7),
            kind,
            code: code.to_string(),
            title: "Banner".to_string(),
        }
    }

    fn renderer(executor: ScriptedExecutor) -> (SnippetRenderer, Arc<ScriptedExecutor>) {
        let executor = Arc::new(executor);
        (SnippetRenderer::new(executor.clone()), executor)
    }

    #[test]
    fn css_is_wrapped_with_snippet_id() {
        let (renderer, _) = renderer(ScriptedExecutor::ok(""));
        let html = renderer.render_to_string(&unit(SnippetKind::Css, "body{color:red}"), Viewer::anonymous());
        assert_eq!(html, "<style id=\"sniphook-snippet-7\">body{color:red}</style>");
    }

    #[test]
    fn html_is_emitted_verbatim() {
        let (renderer, _) = renderer(ScriptedExecutor::ok(""));
        let html = renderer.render_to_string(&unit(SnippetKind::Html, "<b>\"raw\" & ok</b>"), Viewer::anonymous());
        assert_eq!(html, "<b>\"raw\" & ok</b>");
    }

    #[test]
    fn unknown_kind_renders_nothing() {
        let (renderer, executor) = renderer(ScriptedExecutor::ok("x"));
        let mut out = String::new();
        let outcome = renderer.render(&unit(SnippetKind::Unknown, "echo 1;"), Viewer::privileged(), &mut out);
        assert_eq!(outcome, RenderOutcome::Skipped);
        assert!(out.is_empty());
        assert!(executor.seen().is_empty());
    }

    #[test]
    fn code_without_marker_is_normalized_before_execution() {
        let (renderer, executor) = renderer(ScriptedExecutor::ok("1"));
        let html = renderer.render_to_string(&unit(SnippetKind::Code, "echo 1;"), Viewer::anonymous());
        assert_eq!(html, "1");
        assert_eq!(executor.seen(), vec!["<?php\necho 1;".to_string()]);
    }

    #[test]
    fn code_with_marker_runs_unmodified() {
        let (renderer, executor) = renderer(ScriptedExecutor::ok(""));
        renderer.render_to_string(&unit(SnippetKind::Code, "<?php echo 1;"), Viewer::anonymous());
        assert_eq!(executor.seen(), vec!["<?php echo 1;".to_string()]);
    }

    #[test]
    fn whitespace_code_is_not_executed() {
        let (renderer, executor) = renderer(ScriptedExecutor::ok("x"));
        let mut out = String::new();
        let outcome = renderer.render(&unit(SnippetKind::Code, "  \n"), Viewer::anonymous(), &mut out);
        assert_eq!(outcome, RenderOutcome::Skipped);
        assert!(executor.seen().is_empty());
    }

    #[test]
    fn fault_is_logged_once_and_hidden_from_visitors() {
        let (layer, capture) = CaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(layer);
        let (renderer, _) = renderer(ScriptedExecutor::failing("partial", "Undefined function"));

        let mut out = String::new();
        let outcome = tracing::subscriber::with_default(subscriber, || {
            renderer.render(&unit(SnippetKind::Code, "boom();"), Viewer::anonymous(), &mut out)
        });

        assert_eq!(outcome, RenderOutcome::Faulted);
        assert_eq!(out, "partial");
        let faults = capture.matching(|event| event.field("snippet_id") == Some("7"));
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].field("snippet_title"), Some("Banner"));
        assert_eq!(faults[0].field("error"), Some("Undefined function"));
        assert_eq!(faults[0].field("origin"), Some("snippet:2"));
    }

    #[test]
    fn fault_is_surfaced_inline_to_privileged_viewers() {
        let (renderer, _) = renderer(ScriptedExecutor::failing("", "bad <tag>"));
        let html = renderer.render_to_string(&unit(SnippetKind::Code, "boom();"), Viewer::privileged());
        assert_eq!(html, "<!-- Snippet Error (ID: 7): bad &lt;tag&gt; -->");
    }

    #[test]
    fn panicking_executor_is_contained() {
        let (renderer, _) = renderer(ScriptedExecutor::panicking());
        let html = renderer.render_to_string(&unit(SnippetKind::Code, "boom();"), Viewer::privileged());
        assert_eq!(html, "<!-- Snippet Error (ID: 7): interpreter crashed -->");
    }
}
