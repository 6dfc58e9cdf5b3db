//! Runtime configuration parsed from environment variables.

pub const DEFAULT_MAX_PUBLISH_DEPTH: usize = 64;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Limits applied by [`crate::bus::EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Maximum number of publishes that may be nested inside one another.
    pub max_depth: usize,
}

impl BusConfig {
    /// Optional:
    /// - `VBIND_MAX_PUBLISH_DEPTH`: default 64
    #[must_use]
    pub fn from_env() -> Self {
        Self { max_depth: env_parse("VBIND_MAX_PUBLISH_DEPTH", DEFAULT_MAX_PUBLISH_DEPTH).max(1) }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_PUBLISH_DEPTH }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Settings for [`crate::source::HttpSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Prefix joined onto relative template paths. Empty means paths are
    /// used as given.
    pub base_url: String,
    pub timeouts: SourceTimeouts,
}

impl SourceConfig {
    /// Build typed source config from environment variables.
    ///
    /// Optional:
    /// - `VBIND_BASE_URL`: empty when absent
    /// - `VBIND_REQUEST_TIMEOUT_SECS`: default 30
    /// - `VBIND_CONNECT_TIMEOUT_SECS`: default 10
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var("VBIND_BASE_URL")
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();
        let timeouts = SourceTimeouts {
            request_secs: env_parse("VBIND_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("VBIND_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        Self { base_url, timeouts }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeouts: SourceTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
