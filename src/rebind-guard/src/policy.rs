//! Allow/deny policy over resolved addresses.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::{
    Result,
    catalog::NetworkCatalog,
    config::GuardConfig,
    range::NetworkRange,
};

/// Outcome of classifying one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressVerdict {
    /// An allow range matched. Deny rules were not consulted.
    Allowed(NetworkRange),

    /// A deny range matched and no allow range did.
    Denied(NetworkRange),

    /// No rule matched.
    Unlisted,
}

impl AddressVerdict {
    /// Check if the verdict blocks the address.
    pub fn is_denied(&self) -> bool {
        matches!(self, AddressVerdict::Denied(_))
    }
}

/// Immutable deny and allow sets for one guard.
///
/// Evaluation is a disjunction over each set, and any matching allow range
/// overrides every deny range, regardless of prefix length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyConfiguration {
    deny: Vec<NetworkRange>,
    allow: Vec<NetworkRange>,
}

impl PolicyConfiguration {
    /// Build the policy from config, merging catalog presets into the deny set.
    pub fn from_config(config: &GuardConfig) -> Result<Self> {
        let mut deny = parse_ranges(&config.deny)?;
        if config.deny_private_use {
            deny.extend_from_slice(NetworkCatalog::PrivateUse.ranges());
        }
        if config.deny_reserved_use {
            deny.extend_from_slice(NetworkCatalog::ReservedUse.ranges());
        }

        let mut allow = parse_ranges(&config.allow)?;
        if config.allow_loopback {
            allow.push(NetworkRange::host(IpAddr::V4(Ipv4Addr::LOCALHOST)));
            allow.push(NetworkRange::host(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        }

        let policy = Self::new(deny, allow);
        tracing::debug!(
            deny = policy.deny.len(),
            allow = policy.allow.len(),
            "Built address policy"
        );
        Ok(policy)
    }

    /// Build from already-parsed ranges. Duplicates are dropped.
    pub fn new(
        deny: impl IntoIterator<Item = NetworkRange>,
        allow: impl IntoIterator<Item = NetworkRange>,
    ) -> Self {
        Self {
            deny: dedup(deny),
            allow: dedup(allow),
        }
    }

    /// A policy with no rules: nothing denied, nothing exempted.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// True iff any allow range contains `addr`.
    pub fn is_allowed(&self, addr: IpAddr) -> bool {
        self.allow.iter().any(|range| range.contains(addr))
    }

    /// True iff any deny range contains `addr` and no allow range does.
    pub fn is_denied(&self, addr: IpAddr) -> bool {
        self.deny.iter().any(|range| range.contains(addr)) && !self.is_allowed(addr)
    }

    /// Classify `addr`, reporting the rule that decided it.
    pub fn verdict(&self, addr: IpAddr) -> AddressVerdict {
        if let Some(range) = self.allow.iter().find(|range| range.contains(addr)) {
            return AddressVerdict::Allowed(*range);
        }
        match self.deny.iter().find(|range| range.contains(addr)) {
            Some(range) => AddressVerdict::Denied(*range),
            None => AddressVerdict::Unlisted,
        }
    }

    pub fn deny_ranges(&self) -> &[NetworkRange] {
        &self.deny
    }

    pub fn allow_ranges(&self) -> &[NetworkRange] {
        &self.allow
    }
}

fn parse_ranges(inputs: &[String]) -> Result<Vec<NetworkRange>> {
    inputs.iter().map(|s| NetworkRange::parse(s)).collect()
}

fn dedup(ranges: impl IntoIterator<Item = NetworkRange>) -> Vec<NetworkRange> {
    let mut seen = HashSet::new();
    ranges.into_iter().filter(|range| seen.insert(*range)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GuardError;
    use crate::catalog::{PRIVATE_USE, RESERVED_USE};

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn policy(config: GuardConfig) -> PolicyConfiguration {
        PolicyConfiguration::from_config(&config).unwrap()
    }

    #[test]
    fn test_private_use_denied() {
        let policy = policy(GuardConfig::private_only());

        for addr in ["127.0.0.1", "10.0.0.5", "172.20.1.1", "192.168.255.255"] {
            assert!(policy.is_denied(ip(addr)), "{addr} should be denied");
        }
        assert!(!policy.is_denied(ip("93.184.216.34")));
        assert!(!policy.is_denied(ip("169.254.169.254")));
    }

    #[test]
    fn test_reserved_use_covers_private_use() {
        let private = policy(GuardConfig::private_only());
        let reserved = policy(GuardConfig::strict());

        let samples = [
            "127.0.0.1",
            "127.255.255.255",
            "10.0.0.0",
            "10.255.255.255",
            "172.16.0.0",
            "172.31.255.255",
            "192.168.0.0",
            "192.168.255.255",
            "8.8.8.8",
        ];
        for addr in samples {
            if private.is_denied(ip(addr)) {
                assert!(reserved.is_denied(ip(addr)), "{addr} denied by private only");
            }
        }
        assert!(reserved.is_denied(ip("169.254.169.254")));
        assert!(reserved.is_denied(ip("100.64.0.1")));
    }

    #[test]
    fn test_allow_overrides_deny() {
        let policy = policy(
            GuardConfig::builder()
                .deny_private_use(true)
                .allow_range("10.20.0.0/16")
                .build(),
        );

        assert!(!policy.is_denied(ip("10.20.3.4")));
        assert!(policy.is_allowed(ip("10.20.3.4")));
        assert!(policy.is_denied(ip("10.21.0.1")));
    }

    #[test]
    fn test_wider_allow_still_wins() {
        // No most-specific-match rule: any allow range wins.
        let policy = policy(
            GuardConfig::builder()
                .deny_range("10.1.2.3")
                .allow_range("10.0.0.0/8")
                .build(),
        );

        assert!(!policy.is_denied(ip("10.1.2.3")));
        assert!(matches!(policy.verdict(ip("10.1.2.3")), AddressVerdict::Allowed(_)));
    }

    #[test]
    fn test_allow_loopback() {
        let policy = policy(
            GuardConfig::builder()
                .deny_private_use(true)
                .allow_loopback(true)
                .build(),
        );

        assert!(!policy.is_denied(ip("127.0.0.1")));
        assert!(policy.is_allowed(ip("::1")));
        // Only the loopback address itself is exempted
        assert!(policy.is_denied(ip("127.0.0.2")));
    }

    #[test]
    fn test_empty_policy_denies_nothing() {
        let policy = PolicyConfiguration::permissive();
        assert!(!policy.is_denied(ip("127.0.0.1")));
        assert!(!policy.is_allowed(ip("127.0.0.1")));
        assert_eq!(policy.verdict(ip("10.0.0.1")), AddressVerdict::Unlisted);
    }

    #[test]
    fn test_deny_set_deduplicated() {
        let policy = policy(
            GuardConfig::builder()
                .deny_range("10.0.0.0/8")
                .deny_range("10.9.9.9/8")
                .deny_private_use(true)
                .deny_reserved_use(true)
                .build(),
        );

        assert_eq!(policy.deny_ranges().len(), RESERVED_USE.len());
        for range in PRIVATE_USE.iter() {
            assert_eq!(
                policy.deny_ranges().iter().filter(|r| *r == range).count(),
                1
            );
        }
    }

    #[test]
    fn test_verdict_reports_matching_range() {
        let policy = policy(GuardConfig::private_only());
        assert_eq!(
            policy.verdict(ip("192.168.1.1")),
            AddressVerdict::Denied(NetworkRange::parse("192.168.0.0/16").unwrap())
        );
        assert!(policy.verdict(ip("192.168.1.1")).is_denied());
    }

    #[test]
    fn test_invalid_range_rejected_at_construction() {
        let err = PolicyConfiguration::from_config(
            &GuardConfig::builder().allow_range("10.0.0.0/40").build(),
        )
        .unwrap_err();
        assert!(matches!(err, GuardError::InvalidRange { ref input, .. } if input == "10.0.0.0/40"));
    }
}
