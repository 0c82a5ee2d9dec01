//! Shared domain enumerations aligned with the persisted snippet archive.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::error::DomainError;

/// Priority applied when a record carries none.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Opaque, stable identifier of a snippet record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnippetId(u64);

impl SnippetId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SnippetId {
    type Err = DomainError;

    /// Parses a positive decimal id. Zero is never a valid snippet id.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let parsed = trimmed
            .parse::<u64>()
            .map_err(|err| DomainError::invalid_snippet_id(trimmed, err.to_string()))?;
        if parsed == 0 {
            return Err(DomainError::invalid_snippet_id(trimmed, "must be greater than zero"));
        }
        Ok(Self(parsed))
    }
}

/// Render strategy of a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnippetKind {
    Css,
    Html,
    #[serde(alias = "php")]
    Code,
    /// Any type string the renderer does not understand; renders nothing.
    #[default]
    #[serde(other)]
    Unknown,
}

impl SnippetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SnippetKind::Css => "css",
            SnippetKind::Html => "html",
            SnippetKind::Code => "code",
            SnippetKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SnippetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication status of a stored record. Only published records are swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    #[default]
    #[serde(alias = "published")]
    Publish,
    Draft,
    Trash,
}

impl PublishStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PublishStatus::Publish => "publish",
            PublishStatus::Draft => "draft",
            PublishStatus::Trash => "trash",
        }
    }
}

/// Stored activation flag.
///
/// A record that never had the flag written is active. The flag is resolved to a
/// plain `bool` once, at the read boundary, through [`ActiveFlag::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveFlag {
    #[default]
    Unset,
    On,
    Off,
}

impl ActiveFlag {
    pub fn resolve(self) -> bool {
        !matches!(self, ActiveFlag::Off)
    }

    /// Interprets a textual meta value: empty means unset, `0`/`false` mean off.
    pub fn from_meta(value: &str) -> Self {
        match value.trim() {
            "" => ActiveFlag::Unset,
            "0" | "false" => ActiveFlag::Off,
            _ => ActiveFlag::On,
        }
    }
}

impl From<bool> for ActiveFlag {
    fn from(value: bool) -> Self {
        if value { ActiveFlag::On } else { ActiveFlag::Off }
    }
}

impl Serialize for ActiveFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ActiveFlag::Unset => serializer.serialize_none(),
            ActiveFlag::On => serializer.serialize_bool(true),
            ActiveFlag::Off => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for ActiveFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawFlag {
            Bool(bool),
            Int(i64),
            Text(String),
        }

        Ok(match Option::<RawFlag>::deserialize(deserializer)? {
            None => ActiveFlag::Unset,
            Some(RawFlag::Bool(value)) => ActiveFlag::from(value),
            Some(RawFlag::Int(value)) => ActiveFlag::from(value != 0),
            Some(RawFlag::Text(value)) => ActiveFlag::from_meta(&value),
        })
    }
}
