//! The dynamic-execution capability the renderer hands `code` snippets to.
//!
//! The capability is injected: the renderer only normalizes the payload, calls
//! [`CodeExecutor::execute`] and contains whatever comes back.

use std::fmt;

use thiserror::Error;

/// Canonical opening marker prepended to payloads that lack one.
pub const OPEN_MARKER: &str = "<?php";
/// Short opening marker; a payload starting with it already counts as opened.
pub const SHORT_OPEN_MARKER: &str = "<?";

/// Where a fault was raised, as reported by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultOrigin {
    pub location: String,
    pub line: Option<u32>,
}

impl FaultOrigin {
    pub fn new(location: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            location: location.into(),
            line,
        }
    }
}

impl fmt::Display for FaultOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}", self.location),
            None => f.write_str(&self.location),
        }
    }
}

/// Compile error or runtime fault raised while executing a unit.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExecutionFault {
    pub message: String,
    pub origin: Option<FaultOrigin>,
}

impl ExecutionFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: FaultOrigin) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// Host-provided capability that runs a normalized executable unit.
///
/// Output produced before a fault is written to `out` as it happens and is not
/// retracted by the caller.
pub trait CodeExecutor: Send + Sync {
    fn execute(&self, source: &str, out: &mut String) -> Result<(), ExecutionFault>;
}

/// Turns a raw payload into a well-formed executable unit.
///
/// Whitespace-only payloads normalize to an empty unit. A payload that already
/// begins with an opening marker (case-insensitive, ignoring leading whitespace)
/// is returned unchanged; anything else gets the canonical marker and a newline
/// prepended.
pub fn normalize_code(code: &str) -> String {
    let trimmed = code.trim_start();
    if trimmed.trim_end().is_empty() {
        return String::new();
    }

    if starts_with_ignore_case(trimmed, OPEN_MARKER)
        || starts_with_ignore_case(trimmed, SHORT_OPEN_MARKER)
    {
        return code.to_string();
    }

    format!("{OPEN_MARKER}\n{code}")
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
