//! Outbound request guard with SSRF and DNS rebinding protection.
//!
//! This crate sits in front of an HTTP client's send path and:
//! - Resolves the target hostname once, at interception time
//! - Classifies the resolved address against CIDR allow/deny rules
//!   (with built-in private and reserved-use presets)
//! - Pins the request to the address it checked, keeping the `Host`
//!   header and TLS SNI on the original name
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                           Guard                            │
//! │  ┌──────────────┐  ┌─────────────────┐  ┌───────────────┐  │
//! │  │   Resolver   │  │ AddressSelector │  │ Policy        │  │
//! │  │ system/static│  │  random/fixed   │  │  NetworkRange │  │
//! │  └──────────────┘  └─────────────────┘  │  Catalogs     │  │
//! │                                         └───────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//!   RequestDescriptor ─► resolve ─► classify ─► pin ─► next stage
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use rebind_guard::{Guard, GuardConfig, RequestDescriptor};
//!
//! let config = GuardConfig::builder()
//!     .deny_private_use(true)
//!     .allow_range("10.20.0.0/16")
//!     .build();
//!
//! let guard = Guard::new(&config)?;
//!
//! let request = RequestDescriptor::from_url("http://example.com/api")?;
//! let response = guard
//!     .intercept(request, |pinned| async move { client.send(pinned).await })
//!     .await?;
//! ```

pub mod catalog;
pub mod config;
pub mod dns;
pub mod guard;
pub mod policy;
pub mod range;
pub mod request;
pub mod select;

pub use catalog::{NetworkCatalog, PRIVATE_USE, RESERVED_USE};
pub use config::{GuardConfig, GuardConfigBuilder};
pub use dns::{ResolvedAddress, Resolver, StaticResolver, SystemResolver};
pub use guard::{Guard, Interception};
pub use policy::{AddressVerdict, PolicyConfiguration};
pub use range::NetworkRange;
pub use request::{RequestDescriptor, TlsSettings};
pub use select::{AddressSelector, FixedSelector, RandomSelector};

use std::net::IpAddr;

use thiserror::Error;

/// Errors raised by the guard.
#[derive(Debug, Error)]
pub enum GuardError {
    /// A configured CIDR or address string could not be parsed.
    #[error("Invalid network range '{input}': {reason}")]
    InvalidRange { input: String, reason: String },

    /// The hostname did not resolve to any usable address.
    #[error("DNS resolution failed for host: {hostname}")]
    ResolutionFailed { hostname: String },

    /// The resolved address is denied by policy.
    #[error("Address not allowed: {target} resolved to {address}")]
    AddressNotAllowed { target: String, address: IpAddr },

    /// A request could not be converted to or from a URL.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GuardError {
    pub(crate) fn invalid_range(input: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidRange {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn resolution_failed(hostname: impl Into<String>) -> Self {
        Self::ResolutionFailed {
            hostname: hostname.into(),
        }
    }

    /// True when the request was blocked by an allow/deny rule.
    pub fn is_policy_denial(&self) -> bool {
        matches!(self, Self::AddressNotAllowed { .. })
    }

    /// True when the hostname could not be resolved (error, timeout or cancellation).
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, Self::ResolutionFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, GuardError>;
