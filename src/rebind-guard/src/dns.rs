//! Hostname resolution.
//!
//! A [`Resolver`] never fails: lookup errors, empty answers, timeouts and
//! cancellation all come back as an empty list, which the guard turns into
//! a single `ResolutionFailed` fault.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A single resolved address. `IpAddr` already carries its family.
pub type ResolvedAddress = IpAddr;

/// Resolves a hostname to the addresses it currently points at.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `hostname`. Returns an empty list on any failure.
    async fn resolve(&self, hostname: &str) -> Vec<ResolvedAddress>;
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, hostname: &str) -> Vec<ResolvedAddress> {
        if let Some(ip) = parse_literal(hostname) {
            return vec![ip];
        }

        match tokio::net::lookup_host((hostname, 0)).await {
            Ok(addrs) => dedup(addrs.map(|socket_addr| socket_addr.ip())),
            Err(e) => {
                tracing::debug!(hostname, error = %e, "DNS lookup failed");
                Vec::new()
            }
        }
    }
}

/// Resolver answering from a fixed table.
///
/// Names are matched case-insensitively, ignoring a trailing dot. Unknown
/// names resolve to nothing; IP literals resolve to themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<ResolvedAddress>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the answers for `hostname`.
    pub fn with_host(
        mut self,
        hostname: impl AsRef<str>,
        addrs: impl IntoIterator<Item = ResolvedAddress>,
    ) -> Self {
        self.insert(hostname, addrs);
        self
    }

    /// Add (or replace) the answers for `hostname`.
    pub fn insert(
        &mut self,
        hostname: impl AsRef<str>,
        addrs: impl IntoIterator<Item = ResolvedAddress>,
    ) {
        self.hosts
            .insert(normalize_name(hostname.as_ref()), addrs.into_iter().collect());
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, hostname: &str) -> Vec<ResolvedAddress> {
        if let Some(ip) = parse_literal(hostname) {
            return vec![ip];
        }
        self.hosts
            .get(&normalize_name(hostname))
            .cloned()
            .unwrap_or_default()
    }
}

/// Resolve with an optional timeout and cancellation token.
///
/// Expiry or cancellation yields an empty list; a partial answer is never
/// returned. Repeated answers are collapsed so each distinct address is
/// listed once, in first-seen order.
pub async fn resolve_bounded(
    resolver: &dyn Resolver,
    hostname: &str,
    timeout: Option<Duration>,
    cancel: Option<&CancellationToken>,
) -> Vec<ResolvedAddress> {
    let lookup = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, resolver.resolve(hostname)).await {
                Ok(addrs) => addrs,
                Err(_) => {
                    let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                    tracing::debug!(hostname, timeout_ms, "DNS lookup timed out");
                    Vec::new()
                }
            },
            None => resolver.resolve(hostname).await,
        }
    };

    let addrs = match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(hostname, "DNS lookup cancelled");
                    Vec::new()
                }
                addrs = lookup => addrs,
            }
        }
        None => lookup.await,
    };

    dedup(addrs)
}

/// Parse a bare or bracketed IP literal.
pub(crate) fn parse_literal(hostname: &str) -> Option<IpAddr> {
    let trimmed = hostname
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(hostname);
    trimmed.parse().ok()
}

fn normalize_name(hostname: &str) -> String {
    hostname.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn dedup(addrs: impl IntoIterator<Item = ResolvedAddress>) -> Vec<ResolvedAddress> {
    let mut out: Vec<ResolvedAddress> = Vec::new();
    for addr in addrs {
        if !out.contains(&addr) {
            out.push(addr);
        }
    }
    out
}
