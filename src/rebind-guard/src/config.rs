//! Guard configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`Guard`](crate::Guard).
///
/// All fields are optional when deserialized, so a host application can
/// embed this struct in its own config file:
///
/// ```toml
/// deny = ["203.0.113.0/24"]
/// allow = ["10.20.0.0/16"]
/// deny_private_use = true
/// resolve_timeout_ms = 2000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Denied CIDR ranges or single addresses.
    pub deny: Vec<String>,

    /// Allowed CIDR ranges or single addresses. Allow beats deny.
    pub allow: Vec<String>,

    /// Deny loopback and RFC 1918 ranges.
    pub deny_private_use: bool,

    /// Deny every IANA special-use IPv4 range (includes the private ones).
    pub deny_reserved_use: bool,

    /// Allow the loopback address even when a deny rule covers it.
    pub allow_loopback: bool,

    /// Upper bound on a single DNS lookup, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_timeout_ms: Option<u64>,
}

impl GuardConfig {
    /// Create a new default config (pins requests, denies nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for configuration.
    pub fn builder() -> GuardConfigBuilder {
        GuardConfigBuilder::new()
    }

    /// Deny loopback and private-use ranges.
    pub fn private_only() -> Self {
        Self {
            deny_private_use: true,
            ..Default::default()
        }
    }

    /// Deny every reserved and special-use range.
    pub fn strict() -> Self {
        Self {
            deny_reserved_use: true,
            ..Default::default()
        }
    }

    /// DNS lookup timeout, if configured.
    pub fn resolve_timeout(&self) -> Option<Duration> {
        self.resolve_timeout_ms.map(Duration::from_millis)
    }
}

/// Builder for GuardConfig.
#[derive(Debug, Default)]
pub struct GuardConfigBuilder {
    config: GuardConfig,
}

impl GuardConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: GuardConfig::new(),
        }
    }

    /// Add a denied range.
    pub fn deny_range(mut self, range: impl Into<String>) -> Self {
        self.config.deny.push(range.into());
        self
    }

    /// Add multiple denied ranges.
    pub fn deny_ranges(mut self, ranges: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.deny.extend(ranges.into_iter().map(Into::into));
        self
    }

    /// Add an allowed range.
    pub fn allow_range(mut self, range: impl Into<String>) -> Self {
        self.config.allow.push(range.into());
        self
    }

    /// Add multiple allowed ranges.
    pub fn allow_ranges(mut self, ranges: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.allow.extend(ranges.into_iter().map(Into::into));
        self
    }

    pub fn deny_private_use(mut self, deny: bool) -> Self {
        self.config.deny_private_use = deny;
        self
    }

    pub fn deny_reserved_use(mut self, deny: bool) -> Self {
        self.config.deny_reserved_use = deny;
        self
    }

    pub fn allow_loopback(mut self, allow: bool) -> Self {
        self.config.allow_loopback = allow;
        self
    }

    /// Bound each DNS lookup.
    pub fn resolve_timeout(mut self, timeout: Duration) -> Self {
        self.config.resolve_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    /// Build the config.
    pub fn build(self) -> GuardConfig {
        self.config
    }
}
