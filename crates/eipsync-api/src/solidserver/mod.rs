// SOLIDserver REST client modules
//
// Hand-written client for the EfficientIP SOLIDserver IPAM REST API.
// The source schema is fully bifurcated by IP version, so every resource
// type has a distinct v4 and v6 service. Endpoint groups are implemented
// as inherent methods in separate files to keep `client` focused on
// transport mechanics.

pub mod addresses;
pub mod client;
pub mod models;
pub mod prefixes;

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

pub use client::SolidServerClient;
pub use models::RawRecord;

/// IP protocol version, used to pick between the v4 and v6 services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub const BOTH: [Self; 2] = [Self::V4, Self::V6];

    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    /// Width of an address of this version, in bits.
    pub fn max_prefix_length(self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => f.write_str("IPv4"),
            Self::V6 => f.write_str("IPv6"),
        }
    }
}

/// SOLIDserver REST service names (the path segment after `/rest/`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
pub enum Service {
    #[strum(serialize = "ip_address_list")]
    AddressList,
    #[strum(serialize = "ip6_address6_list")]
    Address6List,
    #[strum(serialize = "ip_address_count")]
    AddressCount,
    #[strum(serialize = "ip6_address6_count")]
    Address6Count,
    #[strum(serialize = "ip_block_subnet_list")]
    SubnetList,
    #[strum(serialize = "ip6_block6_subnet6_list")]
    Subnet6List,
    #[strum(serialize = "ip_block_subnet_info")]
    SubnetInfo,
    #[strum(serialize = "ip6_block6_subnet6_info")]
    Subnet6Info,
}

impl Service {
    pub fn address_list(version: IpVersion) -> Self {
        match version {
            IpVersion::V4 => Self::AddressList,
            IpVersion::V6 => Self::Address6List,
        }
    }

    pub fn address_count(version: IpVersion) -> Self {
        match version {
            IpVersion::V4 => Self::AddressCount,
            IpVersion::V6 => Self::Address6Count,
        }
    }

    pub fn subnet_list(version: IpVersion) -> Self {
        match version {
            IpVersion::V4 => Self::SubnetList,
            IpVersion::V6 => Self::Subnet6List,
        }
    }

    pub fn subnet_info(version: IpVersion) -> Self {
        match version {
            IpVersion::V4 => Self::SubnetInfo,
            IpVersion::V6 => Self::Subnet6Info,
        }
    }
}
