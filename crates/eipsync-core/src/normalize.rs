// ── Record normalizer ──
//
// Pure conversions from raw SOLIDserver records into domain entities, one
// per (entity × IP version) quadrant. Missing or malformed optional fields
// degrade to empty values; only invariant violations reject a record.

use std::net::IpAddr;

use eipsync_api::solidserver::IpVersion;
use eipsync_api::solidserver::models::{
    Ip4AddressRecord, Ip4SubnetRecord, Ip6AddressRecord, Ip6SubnetRecord, RawRecord,
};
use serde::Serialize;

use crate::model::{Address, ExternalId, Prefix, PrefixKey};

/// Class-parameter key SOLIDserver stores free-text descriptions under.
pub const DESCRIPTION_KEY: &str = "__eip_description";

/// Why a raw record did not become an entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("unparseable address {0:?}")]
    UnparseableHost(String),
    #[error("unspecified address {0}")]
    UnspecifiedHost(IpAddr),
    #[error("missing record id")]
    MissingRecordId,
    #[error("free address (no record id and no name)")]
    FreeRecord,
    #[error("not a terminal block")]
    NotTerminal,
    #[error("missing prefix length")]
    MissingPrefixLength,
    #[error("invalid prefix length {0:?}")]
    InvalidPrefixLength(String),
    #[error("degenerate network {0}")]
    DegenerateNetwork(PrefixKey),
}

/// A normalized record of either kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Address(Address),
    Prefix(Prefix),
}

/// Parent subnet referenced by an address record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParentRef {
    pub version: IpVersion,
    pub id: String,
}

/// Dispatch on the record variant.
pub fn normalize(raw: &RawRecord) -> Result<Entity, Rejection> {
    match raw {
        RawRecord::AddressV4(rec) => address_v4(rec).map(Entity::Address),
        RawRecord::AddressV6(rec) => address_v6(rec).map(Entity::Address),
        RawRecord::PrefixV4(rec) => prefix_v4(rec).map(Entity::Prefix),
        RawRecord::PrefixV6(rec) => prefix_v6(rec).map(Entity::Prefix),
    }
}

// ── Addresses ────────────────────────────────────────────────────────

pub fn address_v4(rec: &Ip4AddressRecord) -> Result<Address, Rejection> {
    build_address(
        rec.hostaddr.as_deref(),
        rec.ip_id.as_deref(),
        rec.name.as_deref(),
        rec.subnet_size.as_deref().and_then(subnet_size_to_length),
        rec.ip_class_parameters.as_deref(),
    )
}

pub fn address_v6(rec: &Ip6AddressRecord) -> Result<Address, Rejection> {
    build_address(
        rec.hostaddr.as_deref(),
        rec.ip6_id.as_deref(),
        rec.ip6_name.as_deref(),
        rec.subnet6_prefix
            .as_deref()
            .and_then(|raw| parse_length(raw, 128).ok()),
        rec.ip6_class_parameters.as_deref(),
    )
}

fn build_address(
    host: Option<&str>,
    id: Option<&str>,
    name: Option<&str>,
    prefix_length: Option<u8>,
    class_parameters: Option<&str>,
) -> Result<Address, Rejection> {
    let host = parse_host(host)?;
    let external_id = record_id(id)?;
    let dns_name = name.map(str::trim).unwrap_or_default().to_owned();
    if !external_id.is_linked() && dns_name.is_empty() {
        return Err(Rejection::FreeRecord);
    }

    Ok(Address {
        dns_name,
        description: class_param(class_parameters, DESCRIPTION_KEY),
        external_id,
        prefix_length,
        ..Address::new(host)
    })
}

// ── Prefixes ─────────────────────────────────────────────────────────

pub fn prefix_v4(rec: &Ip4SubnetRecord) -> Result<Prefix, Rejection> {
    let length = rec
        .subnet_size
        .as_deref()
        .and_then(subnet_size_to_length)
        .ok_or(Rejection::MissingPrefixLength);
    build_prefix(
        rec.start_hostaddr.as_deref(),
        rec.subnet_id.as_deref(),
        rec.is_terminal.as_deref(),
        length,
        rec.subnet_class_parameters.as_deref(),
    )
}

pub fn prefix_v6(rec: &Ip6SubnetRecord) -> Result<Prefix, Rejection> {
    let length = rec
        .subnet6_prefix
        .as_deref()
        .ok_or(Rejection::MissingPrefixLength)
        .and_then(|raw| parse_length(raw, 128));
    build_prefix(
        rec.start_hostaddr.as_deref(),
        rec.subnet6_id.as_deref(),
        rec.is_terminal.as_deref(),
        length,
        rec.subnet6_class_parameters.as_deref(),
    )
}

fn build_prefix(
    start: Option<&str>,
    id: Option<&str>,
    is_terminal: Option<&str>,
    length: Result<u8, Rejection>,
    class_parameters: Option<&str>,
) -> Result<Prefix, Rejection> {
    if !terminal_flag(is_terminal) {
        return Err(Rejection::NotTerminal);
    }
    let network = parse_host(start).or_else(|e| match e {
        // The all-zero network is legitimate for prefixes; only the /32
        // and /128 forms are degenerate, checked below.
        Rejection::UnspecifiedHost(addr) => Ok(addr),
        other => Err(other),
    })?;
    let external_id = record_id(id)?;
    let length = length?;
    let key = PrefixKey::new(network, length)
        .map_err(|_| Rejection::InvalidPrefixLength(length.to_string()))?;
    if key.is_degenerate() {
        return Err(Rejection::DegenerateNetwork(key));
    }

    Ok(Prefix {
        description: class_param(class_parameters, DESCRIPTION_KEY),
        external_id,
        ..Prefix::new(key)
    })
}

// ── Parent linkage ───────────────────────────────────────────────────

/// The parent subnet an address record points at, if it is linked.
pub fn parent_ref(raw: &RawRecord) -> Option<ParentRef> {
    let (version, id) = match raw {
        RawRecord::AddressV4(rec) => (IpVersion::V4, rec.subnet_id.as_deref()),
        RawRecord::AddressV6(rec) => (IpVersion::V6, rec.subnet6_id.as_deref()),
        RawRecord::PrefixV4(_) | RawRecord::PrefixV6(_) => return None,
    };
    match ExternalId::from_option(id) {
        ExternalId::Linked(id) => Some(ParentRef { version, id }),
        ExternalId::Unlinked => None,
    }
}

/// Network key of a prefix record whether or not it normalizes.
///
/// Container blocks and otherwise rejected subnets still occupy their
/// range at the source; this names it. Address records yield `None`.
pub fn prefix_key(raw: &RawRecord) -> Option<PrefixKey> {
    let (start, length) = match raw {
        RawRecord::PrefixV4(rec) => (
            rec.start_hostaddr.as_deref(),
            rec.subnet_size.as_deref().and_then(subnet_size_to_length),
        ),
        RawRecord::PrefixV6(rec) => (
            rec.start_hostaddr.as_deref(),
            rec.subnet6_prefix
                .as_deref()
                .and_then(|raw| parse_length(raw, 128).ok()),
        ),
        RawRecord::AddressV4(_) | RawRecord::AddressV6(_) => return None,
    };
    let network: IpAddr = start?.trim().parse().ok()?;
    PrefixKey::new(network, length?).ok()
}

// ── Field helpers ────────────────────────────────────────────────────

/// IPv4 prefix length from SOLIDserver's `subnet_size` (address count).
///
/// Length is 32 minus the number of zero bits in the binary form of the
/// size, so 256 (`100000000`) is a /24. Zero or non-numeric sizes are
/// unknown.
pub fn subnet_size_to_length(raw: &str) -> Option<u8> {
    let size: u64 = raw.trim().parse().ok()?;
    if size == 0 {
        return None;
    }
    let significant_bits = u64::BITS - size.leading_zeros();
    let zero_bits = significant_bits - size.count_ones();
    32u32.checked_sub(zero_bits).and_then(|len| u8::try_from(len).ok())
}

fn parse_length(raw: &str, max: u8) -> Result<u8, Rejection> {
    match raw.trim().parse::<u8>() {
        Ok(len) if len <= max => Ok(len),
        _ => Err(Rejection::InvalidPrefixLength(raw.to_owned())),
    }
}

fn parse_host(raw: Option<&str>) -> Result<IpAddr, Rejection> {
    let raw = raw.map(str::trim).unwrap_or_default();
    let host: IpAddr = raw
        .parse()
        .map_err(|_| Rejection::UnparseableHost(raw.to_owned()))?;
    if host.is_unspecified() {
        return Err(Rejection::UnspecifiedHost(host));
    }
    Ok(host)
}

fn record_id(raw: Option<&str>) -> Result<ExternalId, Rejection> {
    match raw.map(str::trim) {
        None | Some("") => Err(Rejection::MissingRecordId),
        Some(id) => Ok(ExternalId::parse(id)),
    }
}

fn terminal_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}

/// Pull one key out of a URL-encoded class-parameter blob.
///
/// Absent keys and garbled blobs yield an empty string.
pub fn class_param(blob: Option<&str>, key: &str) -> String {
    blob.and_then(|blob| {
        url::form_urlencoded::parse(blob.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim().to_owned())
    })
    .unwrap_or_default()
}
