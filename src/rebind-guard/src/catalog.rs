//! Built-in network catalogs used as deny presets.

use std::net::IpAddr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::range::NetworkRange;

/// Loopback plus the RFC 1918 private ranges.
const PRIVATE_USE_TABLE: &[([u8; 4], u8)] = &[
    ([127, 0, 0, 0], 8),    // Loopback (RFC 1122)
    ([10, 0, 0, 0], 8),     // Private (RFC 1918)
    ([172, 16, 0, 0], 12),  // Private (RFC 1918)
    ([192, 168, 0, 0], 16), // Private (RFC 1918)
];

/// Special-use ranges on top of `PRIVATE_USE_TABLE`.
const SPECIAL_USE_TABLE: &[([u8; 4], u8)] = &[
    ([0, 0, 0, 0], 8),           // "This network" (RFC 1122)
    ([100, 64, 0, 0], 10),       // Shared Address Space (RFC 6598)
    ([169, 254, 0, 0], 16),      // Link-local (RFC 3927)
    ([192, 0, 0, 0], 24),        // IETF Protocol Assignments (RFC 6890)
    ([192, 0, 0, 0], 29),        // DS-Lite (RFC 6333)
    ([192, 0, 2, 0], 24),        // TEST-NET-1 (RFC 5737)
    ([192, 88, 99, 0], 24),      // 6to4 Relay Anycast (RFC 3068)
    ([198, 18, 0, 0], 15),       // Benchmarking (RFC 2544)
    ([198, 51, 100, 0], 24),     // TEST-NET-2 (RFC 5737)
    ([203, 0, 113, 0], 24),      // TEST-NET-3 (RFC 5737)
    ([224, 0, 0, 0], 4),         // Multicast (RFC 5771)
    ([240, 0, 0, 0], 4),         // Reserved for Future Use (RFC 1112)
    ([255, 255, 255, 255], 32),  // Limited Broadcast (RFC 919)
];

/// Loopback and private-use ranges.
pub static PRIVATE_USE: LazyLock<Box<[NetworkRange]>> =
    LazyLock::new(|| build(&[PRIVATE_USE_TABLE]));

/// Every range in [`PRIVATE_USE`] plus the remaining IANA special-use blocks.
pub static RESERVED_USE: LazyLock<Box<[NetworkRange]>> =
    LazyLock::new(|| build(&[PRIVATE_USE_TABLE, SPECIAL_USE_TABLE]));

fn build(tables: &[&[([u8; 4], u8)]]) -> Box<[NetworkRange]> {
    tables
        .iter()
        .flat_map(|table| table.iter())
        .map(|&(octets, prefix)| NetworkRange::v4(octets, prefix))
        .collect()
}

/// Named handle for a built-in catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkCatalog {
    PrivateUse,
    ReservedUse,
}

impl NetworkCatalog {
    /// The catalog's ranges, in declaration order.
    pub fn ranges(self) -> &'static [NetworkRange] {
        match self {
            NetworkCatalog::PrivateUse => &PRIVATE_USE,
            NetworkCatalog::ReservedUse => &RESERVED_USE,
        }
    }

    /// Whether any range in the catalog contains `addr`.
    pub fn contains(self, addr: IpAddr) -> bool {
        self.ranges().iter().any(|range| range.contains(addr))
    }
}

impl std::fmt::Display for NetworkCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkCatalog::PrivateUse => write!(f, "private_use"),
            NetworkCatalog::ReservedUse => write!(f, "reserved_use"),
        }
    }
}
