//! Active-snippet cache configuration.
//!
//! Controlled via the `[cache]` section of `sniphook.toml`.

use std::time::Duration;

pub const DEFAULT_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When disabled every sweep reads the store.
    pub enabled: bool,
    /// How long a populated list stays fresh.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl: settings.ttl,
        }
    }
}
