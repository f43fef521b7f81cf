//! Instance pool configuration.
//!
//! Each API group is configured through numbered environment variables,
//! e.g. `ROLLCALL_DATA_API_URL_1`, `ROLLCALL_DATA_API_URL_2`, ... Reading
//! stops at the first missing index.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use reqwest::Url;
use rollcall_core::error::CoreError;
use rollcall_core::rng::DeterministicRng;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Independent groups of backend instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiGroup {
    /// Authentication and session API.
    Auth,
    /// Attendance data API (also serves the trusted time endpoint).
    Data,
}

impl ApiGroup {
    /// All groups, in configuration order.
    pub const ALL: [Self; 2] = [Self::Auth, Self::Data];

    /// Prefix of the numbered environment variables for this group.
    #[must_use]
    pub fn env_prefix(self) -> &'static str {
        match self {
            Self::Auth => "ROLLCALL_AUTH_API_URL_",
            Self::Data => "ROLLCALL_DATA_API_URL_",
        }
    }
}

impl fmt::Display for ApiGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth => f.write_str("auth"),
            Self::Data => f.write_str("data"),
        }
    }
}

/// A non-empty set of interchangeable base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancePool {
    urls: Vec<Url>,
}

impl InstancePool {
    /// Validates and builds a pool.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Configuration` if `urls` is empty or any entry is
    /// not an absolute `http`/`https` URL.
    pub fn new<I, S>(urls: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls = urls
            .into_iter()
            .map(|raw| parse_base_url(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if urls.is_empty() {
            return Err(CoreError::Configuration(
                "instance pool must contain at least one URL".into(),
            ));
        }
        Ok(Self { urls })
    }

    /// Returns the configured base URLs.
    #[must_use]
    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    /// Picks one instance uniformly at random.
    pub fn select(&self, rng: &mut dyn DeterministicRng) -> &Url {
        let last = u32::try_from(self.urls.len() - 1).unwrap_or(u32::MAX);
        let index = rng.next_u32_range(0, last) as usize;
        &self.urls[index.min(self.urls.len() - 1)]
    }
}

fn parse_base_url(raw: &str) -> Result<Url, CoreError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| CoreError::Configuration(format!("invalid instance URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CoreError::Configuration(format!(
            "instance URL '{raw}' has unsupported scheme '{other}'"
        ))),
    }
}

/// Pools for every configured group plus the request timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pools: HashMap<ApiGroup, InstancePool>,
    timeout: Duration,
}

impl PoolConfig {
    /// Creates an empty configuration with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: HashMap::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the pool for `group`, replacing any previous one.
    #[must_use]
    pub fn with_pool(mut self, group: ApiGroup, pool: InstancePool) -> Self {
        self.pools.insert(group, pool);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the pool for `group`, if configured.
    #[must_use]
    pub fn pool(&self, group: ApiGroup) -> Option<&InstancePool> {
        self.pools.get(&group)
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`PoolConfig::from_lookup`].
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// Groups with no variables are left unconfigured.
    /// `ROLLCALL_REQUEST_TIMEOUT_MS` overrides the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Configuration` if no group is configured, a URL is
    /// invalid, or the timeout is not a positive integer.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        for group in ApiGroup::ALL {
            let urls: Vec<String> = (1..)
                .map(|n| lookup(&format!("{}{n}", group.env_prefix())))
                .take_while(|value| value.as_deref().is_some_and(|v| !v.trim().is_empty()))
                .flatten()
                .collect();
            if !urls.is_empty() {
                config = config.with_pool(group, InstancePool::new(urls)?);
            }
        }
        if config.pools.is_empty() {
            return Err(CoreError::Configuration(
                "no API instance URLs configured".into(),
            ));
        }
        if let Some(raw) = lookup("ROLLCALL_REQUEST_TIMEOUT_MS") {
            let millis: u64 = raw
                .trim()
                .parse()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| {
                    CoreError::Configuration(format!(
                        "ROLLCALL_REQUEST_TIMEOUT_MS must be a positive integer, got '{raw}'"
                    ))
                })?;
            config = config.with_timeout(Duration::from_millis(millis));
        }
        Ok(config)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
