//! Direct-embed resolution of `[snippet id=N]` tokens.
//!
//! Embeds bypass the active-snippet cache and read the single record straight from
//! the store. Every failure mode (unknown id, inactive record, safe mode, store
//! error) yields empty text.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::{
    render::{SnippetRenderer, SnippetUnit},
    repos::SnippetsRepo,
    request::RequestContext,
    safe_mode::SafeModeGate,
};
use crate::domain::types::SnippetId;

const TOKEN_OPEN: &str = "[snippet";

/// A piece of content split around embed tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedSegment<'a> {
    Text(&'a str),
    /// A complete token; `None` when its id is missing or malformed.
    Embed(Option<SnippetId>),
}

/// Split `content` into literal text and embed tokens.
///
/// A token is `[snippet` followed by whitespace or `]`, attributes, and a closing `]`.
/// An opening without a closing bracket is left as text.
pub fn parse_embeds(content: &str) -> Vec<EmbedSegment<'_>> {
    let mut segments = Vec::new();
    let mut rest = content;

    while let Some(start) = find_token_start(rest) {
        let after_open = &rest[start + TOKEN_OPEN.len()..];
        let Some(close) = after_open.find(']') else {
            break;
        };
        if start > 0 {
            segments.push(EmbedSegment::Text(&rest[..start]));
        }
        segments.push(EmbedSegment::Embed(token_id(&after_open[..close])));
        rest = &after_open[close + 1..];
    }

    if !rest.is_empty() {
        segments.push(EmbedSegment::Text(rest));
    }
    segments
}

fn find_token_start(haystack: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(found) = haystack[offset..].find(TOKEN_OPEN) {
        let start = offset + found;
        let next = haystack[start + TOKEN_OPEN.len()..].chars().next();
        if matches!(next, Some(c) if c == ']' || c.is_whitespace()) {
            return Some(start);
        }
        offset = start + TOKEN_OPEN.len();
    }
    None
}

fn token_id(attributes: &str) -> Option<SnippetId> {
    attribute_pairs(attributes)
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("id"))
        .and_then(|(_, value)| value.parse().ok())
}

/// `key=value` pairs; values may be wrapped in single or double quotes.
fn attribute_pairs(attributes: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    let mut rest = attributes.trim_start();

    while !rest.is_empty() {
        let key_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let key = &rest[..key_end];
        rest = &rest[key_end..];

        if let Some(after_eq) = rest.strip_prefix('=') {
            let (value, remaining) = match after_eq.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    match body.find(quote) {
                        Some(end) => (&body[..end], &body[end + 1..]),
                        None => (body, ""),
                    }
                }
                _ => {
                    let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                    (&after_eq[..end], &after_eq[end..])
                }
            };
            pairs.push((key, value));
            rest = remaining;
        }
        rest = rest.trim_start();
    }
    pairs
}

pub struct EmbedResolver {
    repo: Arc<dyn SnippetsRepo>,
    renderer: SnippetRenderer,
    gate: SafeModeGate,
}

impl EmbedResolver {
    pub fn new(repo: Arc<dyn SnippetsRepo>, renderer: SnippetRenderer, gate: SafeModeGate) -> Self {
        Self {
            repo,
            renderer,
            gate,
        }
    }

    /// Buffered output of one snippet, or empty text.
    pub async fn resolve(&self, id: SnippetId, request: &RequestContext) -> String {
        let record = match self.repo.find_snippet(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(
                    target = "application::embed",
                    op = "resolve",
                    snippet_id = %id,
                    result = "not_found",
                    "Embedded snippet does not exist"
                );
                return String::new();
            }
            Err(err) => {
                warn!(
                    target = "application::embed",
                    op = "resolve",
                    snippet_id = %id,
                    result = "store_error",
                    error = %err,
                    "Embedded snippet could not be read"
                );
                return String::new();
            }
        };

        if !record.is_active() || self.gate.is_active(request) {
            return String::new();
        }

        self.renderer
            .render_to_string(&SnippetUnit::from(&record), request.viewer())
    }

    /// Replace every embed token in `content` with its resolved output.
    pub async fn expand(&self, content: &str, request: &RequestContext) -> String {
        let mut expanded = String::with_capacity(content.len());
        for segment in parse_embeds(content) {
            match segment {
                EmbedSegment::Text(text) => expanded.push_str(text),
                EmbedSegment::Embed(Some(id)) => {
                    expanded.push_str(&self.resolve(id, request).await);
                }
                EmbedSegment::Embed(None) => {}
            }
        }
        expanded
    }
}
