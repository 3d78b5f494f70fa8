//! The resolve-classify-pin pipeline.
//!
//! For each request the guard:
//! 1. Resolves the hostname once (bounded by timeout and cancellation)
//! 2. Picks one answer at random
//! 3. Rejects the request if the policy denies that address
//! 4. Forwards verified HTTPS untouched, otherwise pins the request to the
//!    checked address with `Host` and SNI kept on the original name
//!
//! Pinning closes the window in which the transport would re-resolve the
//! name and connect somewhere else. For verified HTTPS the certificate check
//! against the original name already fails if the connection lands on a
//! different server, so the request is left as is.

use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{
    GuardError, Result,
    config::GuardConfig,
    dns::{Resolver, SystemResolver, resolve_bounded},
    policy::PolicyConfiguration,
    request::RequestDescriptor,
    select::{AddressSelector, RandomSelector},
};

/// What the guard decided to forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// The original request, unmodified.
    Passthrough(RequestDescriptor),

    /// The request rewritten to connect to `address`.
    Pinned {
        request: RequestDescriptor,
        address: IpAddr,
    },
}

impl Interception {
    /// The descriptor to hand to the next stage.
    pub fn into_request(self) -> RequestDescriptor {
        match self {
            Interception::Passthrough(request) => request,
            Interception::Pinned { request, .. } => request,
        }
    }

    pub fn request(&self) -> &RequestDescriptor {
        match self {
            Interception::Passthrough(request) => request,
            Interception::Pinned { request, .. } => request,
        }
    }

    /// The address the request was pinned to, if any.
    pub fn pinned_address(&self) -> Option<IpAddr> {
        match self {
            Interception::Passthrough(_) => None,
            Interception::Pinned { address, .. } => Some(*address),
        }
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, Interception::Pinned { .. })
    }
}

/// SSRF and DNS rebinding guard for outbound requests.
///
/// Cheap to clone; the policy, resolver and selector are shared.
#[derive(Clone)]
pub struct Guard {
    policy: Arc<PolicyConfiguration>,
    resolver: Arc<dyn Resolver>,
    selector: Arc<dyn AddressSelector>,
    resolve_timeout: Option<Duration>,
}

impl Guard {
    /// Build a guard from config, using the system resolver and random
    /// address selection.
    pub fn new(config: &GuardConfig) -> Result<Self> {
        let policy = PolicyConfiguration::from_config(config)?;
        Ok(Self::with_policy(policy).with_resolve_timeout(config.resolve_timeout()))
    }

    /// Build a guard around an existing policy.
    pub fn with_policy(policy: PolicyConfiguration) -> Self {
        Self {
            policy: Arc::new(policy),
            resolver: Arc::new(SystemResolver),
            selector: Arc::new(RandomSelector),
            resolve_timeout: None,
        }
    }

    /// Replace the resolver.
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Replace the address selector.
    pub fn with_selector(mut self, selector: impl AddressSelector + 'static) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    /// Bound each DNS lookup.
    pub fn with_resolve_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &PolicyConfiguration {
        &self.policy
    }

    /// Run the pipeline and return the descriptor to forward.
    pub async fn prepare(&self, request: RequestDescriptor) -> Result<Interception> {
        self.run(request, None).await
    }

    /// Like [`prepare`](Self::prepare); cancelling `cancel` while the lookup
    /// is in flight fails the request with `ResolutionFailed`.
    pub async fn prepare_with_cancel(
        &self,
        request: RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Interception> {
        self.run(request, Some(cancel)).await
    }

    /// Run the pipeline and hand the resulting descriptor to `next`.
    ///
    /// `next` is never called when the request is rejected.
    pub async fn intercept<F, Fut>(&self, request: RequestDescriptor, next: F) -> Result<Fut::Output>
    where
        F: FnOnce(RequestDescriptor) -> Fut,
        Fut: Future,
    {
        let interception = self.run(request, None).await?;
        Ok(next(interception.into_request()).await)
    }

    /// [`intercept`](Self::intercept) with caller cancellation.
    pub async fn intercept_with_cancel<F, Fut>(
        &self,
        request: RequestDescriptor,
        cancel: &CancellationToken,
        next: F,
    ) -> Result<Fut::Output>
    where
        F: FnOnce(RequestDescriptor) -> Fut,
        Fut: Future,
    {
        let interception = self.run(request, Some(cancel)).await?;
        Ok(next(interception.into_request()).await)
    }

    async fn run(
        &self,
        mut request: RequestDescriptor,
        cancel: Option<&CancellationToken>,
    ) -> Result<Interception> {
        let addrs = resolve_bounded(
            self.resolver.as_ref(),
            &request.hostname,
            self.resolve_timeout,
            cancel,
        )
        .await;

        if addrs.is_empty() {
            tracing::warn!(hostname = %request.hostname, "Blocked request: hostname did not resolve");
            return Err(GuardError::resolution_failed(&request.hostname));
        }

        let address = addrs[self.selector.select(addrs.len()) % addrs.len()];

        // IPv4-mapped IPv6 answers are checked against the IPv4 rules.
        if self.policy.is_denied(address.to_canonical()) {
            let target = request.target();
            tracing::warn!(%target, %address, "Blocked request: address denied by policy");
            return Err(GuardError::AddressNotAllowed { target, address });
        }

        if request.is_https() && request.verifies_tls() {
            tracing::debug!(hostname = %request.hostname, %address, "Verified TLS, forwarding unpinned");
            return Ok(Interception::Passthrough(request));
        }

        // Host keeps the original name and any non-default port.
        let host_header = request.authority();
        let original_host = std::mem::replace(&mut request.hostname, address.to_string());
        request.set_header("Host", host_header);
        if let Some(tls) = request.tls.as_mut() {
            tls.sni_hostname = Some(original_host.clone());
        }

        tracing::debug!(hostname = %original_host, %address, "Pinned request to resolved address");
        Ok(Interception::Pinned { request, address })
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("policy", &self.policy)
            .field("resolve_timeout", &self.resolve_timeout)
            .finish_non_exhaustive()
    }
}
