//! CIDR network ranges.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::{IpNetwork, Ipv4Network};

use super::{GuardError, Result};

/// A single CIDR block.
///
/// The base address is always stored masked to the prefix, so
/// `10.1.2.3/8` and `10.0.0.0/8` are the same range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkRange(IpNetwork);

impl NetworkRange {
    /// Parse `addr` or `addr/prefix`.
    ///
    /// A bare address becomes a host range (`/32` or `/128`).
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(GuardError::invalid_range(input, "empty range"));
        }

        let (addr, prefix) = match trimmed.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (trimmed, None),
        };

        let addr: IpAddr = addr
            .parse()
            .map_err(|e| GuardError::invalid_range(input, e))?;

        let prefix = match prefix {
            Some(prefix) => prefix
                .parse::<u8>()
                .map_err(|_| GuardError::invalid_range(input, "prefix length is not a number"))?,
            None => max_prefix(addr),
        };

        let network = IpNetwork::new(addr, prefix).map_err(|e| GuardError::invalid_range(input, e))?;
        Ok(Self::normalized(network))
    }

    /// Build a range from a base address and prefix length.
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self> {
        let network = IpNetwork::new(addr, prefix)
            .map_err(|e| GuardError::invalid_range(format!("{addr}/{prefix}"), e))?;
        Ok(Self::normalized(network))
    }

    /// Build a single-host range.
    pub fn host(addr: IpAddr) -> Self {
        Self(IpNetwork::from(addr))
    }

    pub(crate) fn v4(octets: [u8; 4], prefix: u8) -> Self {
        let network = Ipv4Network::new(octets.into(), prefix).expect("catalog prefix is valid");
        Self::normalized(IpNetwork::V4(network))
    }

    fn normalized(network: IpNetwork) -> Self {
        match IpNetwork::new(network.network(), network.prefix()) {
            Ok(masked) => Self(masked),
            Err(_) => Self(network),
        }
    }

    /// Whether `addr` falls inside this range (bounds inclusive).
    ///
    /// Addresses of the other family never match.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.0, addr) {
            (IpNetwork::V4(net), IpAddr::V4(ip)) => net.contains(ip),
            (IpNetwork::V6(net), IpAddr::V6(ip)) => net.contains(ip),
            _ => false,
        }
    }

    /// Base address, masked to the prefix.
    pub fn base(&self) -> IpAddr {
        self.0.network()
    }

    /// Prefix length.
    pub fn prefix(&self) -> u8 {
        self.0.prefix()
    }

    pub fn is_ipv4(&self) -> bool {
        self.0.is_ipv4()
    }

    pub fn is_ipv6(&self) -> bool {
        self.0.is_ipv6()
    }
}

fn max_prefix(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl fmt::Display for NetworkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base(), self.prefix())
    }
}

impl FromStr for NetworkRange {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<IpAddr> for NetworkRange {
    fn from(addr: IpAddr) -> Self {
        Self::host(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_cidr() {
        let range = NetworkRange::parse("192.168.0.0/16").unwrap();
        assert_eq!(range.base(), ip("192.168.0.0"));
        assert_eq!(range.prefix(), 16);
        assert!(range.is_ipv4());
    }

    #[test]
    fn test_parse_bare_address() {
        let v4 = NetworkRange::parse("127.0.0.1").unwrap();
        assert_eq!(v4.prefix(), 32);

        let v6 = NetworkRange::parse("::1").unwrap();
        assert_eq!(v6.prefix(), 128);
        assert!(v6.is_ipv6());
    }

    #[test]
    fn test_parse_normalizes_base() {
        let a = NetworkRange::parse("10.1.2.3/8").unwrap();
        let b = NetworkRange::parse("10.0.0.0/8").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_parse_invalid() {
        for input in [
            "",
            "   ",
            "not-an-ip",
            "10.0.0.0/33",
            "::/129",
            "10.0.0.0/abc",
            "10.0.0/8",
            "0177.0.0.1",
            "example.com/24",
        ] {
            let err = NetworkRange::parse(input).unwrap_err();
            assert!(
                matches!(err, GuardError::InvalidRange { .. }),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_contains_bounds_inclusive() {
        let range = NetworkRange::parse("172.16.0.0/12").unwrap();
        assert!(range.contains(ip("172.16.0.0")));
        assert!(range.contains(ip("172.31.255.255")));
        assert!(!range.contains(ip("172.15.255.255")));
        assert!(!range.contains(ip("172.32.0.0")));
    }

    #[test]
    fn test_contains_family_mismatch() {
        let v4 = NetworkRange::parse("0.0.0.0/0").unwrap();
        assert!(!v4.contains(ip("::1")));
        assert!(!v4.contains(ip("::ffff:127.0.0.1")));

        let v6 = NetworkRange::parse("::/0").unwrap();
        assert!(!v6.contains(ip("127.0.0.1")));
        assert!(v6.contains(ip("2606:4700::1")));
    }

    #[test]
    fn test_host_range() {
        let range = NetworkRange::host(ip("93.184.216.34"));
        assert!(range.contains(ip("93.184.216.34")));
        assert!(!range.contains(ip("93.184.216.35")));
    }
}
