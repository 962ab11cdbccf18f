// ── Job scope: parameter validation and host enumeration ──
//
// Everything here runs before any network call. A scope that parses is
// safe to hand to both adapters.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use serde::Serialize;

use crate::error::CoreError;
use crate::model::PrefixKey;

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// What one run covers: which entity kinds, narrowed by CIDR and/or domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncScope {
    pub cidr: Option<IpNetwork>,
    pub domains: Vec<String>,
    pub addresses: bool,
    pub prefixes: bool,
}

impl Default for SyncScope {
    fn default() -> Self {
        Self {
            cidr: None,
            domains: Vec::new(),
            addresses: true,
            prefixes: true,
        }
    }
}

impl SyncScope {
    /// Validate the raw job parameters. Blank filters mean "no filter".
    pub fn parse(
        cidr: Option<&str>,
        domains: Option<&str>,
        addresses: bool,
        prefixes: bool,
    ) -> Result<Self, CoreError> {
        let cidr = cidr
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_cidr)
            .transpose()?;
        let domains = match domains.filter(|s| !s.trim().is_empty()) {
            Some(list) => parse_domains(list)?,
            None => Vec::new(),
        };
        Ok(Self {
            cidr,
            domains,
            addresses,
            prefixes,
        })
    }

    pub fn is_unfiltered(&self) -> bool {
        self.cidr.is_none() && self.domains.is_empty()
    }

    /// Whether the prefix set loaded for this scope is complete for its
    /// range, so that target-only prefixes really are absent at the source.
    ///
    /// Domain-scoped runs only see the parents of matched addresses.
    pub fn prefix_scope_is_exhaustive(&self) -> bool {
        self.domains.is_empty()
    }

    /// Whether the per-host CIDR fan-out queries `host`.
    pub fn queries_host(&self, host: IpAddr) -> bool {
        self.cidr.is_some_and(|cidr| is_usable_host(cidr, host))
    }

    /// Client-side containment check for prefixes under a CIDR filter.
    pub fn contains_prefix(&self, key: PrefixKey) -> bool {
        self.cidr.is_none_or(|cidr| key.is_within(cidr))
    }

    /// Reject a CIDR filter whose host fan-out would exceed `limit`.
    pub fn check_host_budget(&self, limit: u64) -> Result<(), CoreError> {
        let Some(cidr) = self.cidr else {
            return Ok(());
        };
        if !self.addresses {
            return Ok(());
        }
        let hosts = host_count(cidr);
        if hosts > u128::from(limit) {
            return Err(CoreError::FilterTooBroad {
                cidr: cidr.to_string(),
                hosts,
                limit,
            });
        }
        Ok(())
    }
}

// ── CIDR ─────────────────────────────────────────────────────────────

/// Parse a `network/length` filter. Host bits are cleared.
pub fn parse_cidr(input: &str) -> Result<IpNetwork, CoreError> {
    let trimmed = input.trim();
    if !trimmed.contains('/') {
        return Err(CoreError::InvalidCidr {
            input: input.to_owned(),
            reason: "expected network/length".into(),
        });
    }
    let net: IpNetwork = trimmed.parse().map_err(|e: ipnetwork::IpNetworkError| {
        CoreError::InvalidCidr {
            input: input.to_owned(),
            reason: e.to_string(),
        }
    })?;
    IpNetwork::new(net.network(), net.prefix()).map_err(|e| CoreError::InvalidCidr {
        input: input.to_owned(),
        reason: e.to_string(),
    })
}

/// Number of usable hosts `hosts` will yield for `net`.
pub fn host_count(net: IpNetwork) -> u128 {
    match net {
        IpNetwork::V4(v4) => {
            let size = 1u128 << (32 - u32::from(v4.prefix()));
            if v4.prefix() <= 30 { size - 2 } else { size }
        }
        IpNetwork::V6(v6) => {
            let size = 1u128
                .checked_shl(128 - u32::from(v6.prefix()))
                .unwrap_or(u128::MAX);
            if v6.prefix() < 127 { size - 1 } else { size }
        }
    }
}

/// Usable host addresses in `net`.
///
/// IPv4 networks up to /30 skip the network and broadcast addresses;
/// IPv6 networks wider than /127 skip the subnet-router anycast address.
pub fn hosts(net: IpNetwork) -> Box<dyn Iterator<Item = IpAddr> + Send> {
    match net {
        IpNetwork::V4(v4) => {
            let (first, last) = v4_bounds(v4);
            Box::new((first..=last).map(|n| IpAddr::V4(Ipv4Addr::from(n))))
        }
        IpNetwork::V6(v6) => {
            let (first, last) = v6_bounds(v6);
            Box::new((first..=last).map(|n| IpAddr::V6(Ipv6Addr::from(n))))
        }
    }
}

/// Whether `hosts(net)` yields `host`, without enumerating.
pub fn is_usable_host(net: IpNetwork, host: IpAddr) -> bool {
    match (net, host) {
        (IpNetwork::V4(v4), IpAddr::V4(addr)) => {
            let (first, last) = v4_bounds(v4);
            (first..=last).contains(&u32::from(addr))
        }
        (IpNetwork::V6(v6), IpAddr::V6(addr)) => {
            let (first, last) = v6_bounds(v6);
            (first..=last).contains(&u128::from(addr))
        }
        _ => false,
    }
}

fn v4_bounds(v4: Ipv4Network) -> (u32, u32) {
    let base = u32::from(v4.network());
    let last = base | u32::MAX.checked_shr(u32::from(v4.prefix())).unwrap_or(0);
    if v4.prefix() <= 30 {
        (base + 1, last - 1)
    } else {
        (base, last)
    }
}

fn v6_bounds(v6: Ipv6Network) -> (u128, u128) {
    let base = u128::from(v6.network());
    let last = base | u128::MAX.checked_shr(u32::from(v6.prefix())).unwrap_or(0);
    let first = if v6.prefix() < 127 { base + 1 } else { base };
    (first, last)
}

// ── Domains ──────────────────────────────────────────────────────────

/// Split a comma-separated domain list and validate every entry.
///
/// Entries keep their input order. Surrounding blanks and a leading dot
/// are dropped from each entry; nothing else is rewritten. Every invalid
/// entry is reported, not just the first.
pub fn parse_domains(input: &str) -> Result<Vec<String>, CoreError> {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for raw in input.split(',') {
        let entry = raw.trim().trim_start_matches('.');
        if is_valid_domain(entry) {
            valid.push(entry.to_owned());
        } else {
            invalid.push(raw.to_owned());
        }
    }

    if invalid.is_empty() {
        Ok(valid)
    } else {
        Err(CoreError::InvalidDomains { invalid })
    }
}

/// RFC 1035 host-name syntax: at least two labels of letters, digits and
/// inner hyphens, and a top-level label that is not all digits.
pub fn is_valid_domain(domain: &str) -> bool {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.chars().any(|c| c.is_ascii_alphabetic()));
    labels_ok && tld_ok
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn valid_cidrs_parse() {
        for input in ["10.0.0.0/8", "192.168.1.0/24", "2001:db8::/32", " 10.1.1.1/30 "] {
            assert!(parse_cidr(input).is_ok(), "input {input}");
        }
        assert_eq!(parse_cidr("10.1.1.1/24").unwrap().to_string(), "10.1.1.0/24");
    }

    #[test]
    fn invalid_cidrs_are_rejected() {
        for input in ["not-a-cidr", "10.0.0.0/99", "10.0.0.1", "2001:db8::/129", ""] {
            let err = parse_cidr(input).unwrap_err();
            assert!(matches!(err, CoreError::InvalidCidr { .. }), "input {input}");
        }
    }

    #[test]
    fn domain_list_is_returned_verbatim() {
        let domains = parse_domains("example.net, .upenn.edu,isc.upenn.edu").unwrap();
        assert_eq!(domains, vec!["example.net", "upenn.edu", "isc.upenn.edu"]);
    }

    #[test]
    fn domain_list_keeps_order_and_repeats() {
        let domains = parse_domains("b.example.net,a.example.net,b.example.net").unwrap();
        assert_eq!(domains, vec!["b.example.net", "a.example.net", "b.example.net"]);
    }

    #[test]
    fn every_invalid_domain_is_listed() {
        match parse_domains("good.example.net, ,bad domain.com,-x.com,single").unwrap_err() {
            CoreError::InvalidDomains { invalid } => {
                assert_eq!(invalid, vec![" ", "bad domain.com", "-x.com", "single"]);
            }
            other => panic!("expected InvalidDomains, got {other:?}"),
        }
    }

    #[test]
    fn numeric_tld_is_invalid() {
        assert!(!is_valid_domain("10.0.0.1"));
        assert!(is_valid_domain("host-1.example.net"));
        assert!(!is_valid_domain("under_score.example.net"));
    }

    #[test]
    fn v4_hosts_skip_network_and_broadcast() {
        let net = parse_cidr("10.0.0.0/30").unwrap();
        let hosts: Vec<String> = hosts(net).map(|h| h.to_string()).collect();
        assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(host_count(net), 2);
    }

    #[test]
    fn point_to_point_and_host_routes_keep_every_address() {
        assert_eq!(hosts(parse_cidr("10.0.0.0/31").unwrap()).count(), 2);
        assert_eq!(hosts(parse_cidr("10.0.0.7/32").unwrap()).count(), 1);
        assert_eq!(hosts(parse_cidr("2001:db8::1/128").unwrap()).count(), 1);
    }

    #[test]
    fn v6_hosts_skip_anycast() {
        let net = parse_cidr("2001:db8::/126").unwrap();
        let hosts: Vec<String> = hosts(net).map(|h| h.to_string()).collect();
        assert_eq!(hosts, vec!["2001:db8::1", "2001:db8::2", "2001:db8::3"]);
        assert_eq!(host_count(net), 3);
    }

    #[test]
    fn usable_host_check_matches_enumeration() {
        for cidr in ["10.0.0.0/30", "10.0.0.0/31", "10.0.0.4/32", "2001:db8::/126"] {
            let net = parse_cidr(cidr).unwrap();
            let listed: Vec<IpAddr> = hosts(net).collect();
            let candidates = match net {
                IpNetwork::V4(v4) => (0..8u32)
                    .map(|n| IpAddr::V4(Ipv4Addr::from(u32::from(v4.network()) + n)))
                    .collect::<Vec<_>>(),
                IpNetwork::V6(v6) => (0..8u128)
                    .map(|n| IpAddr::V6(Ipv6Addr::from(u128::from(v6.network()) + n)))
                    .collect(),
            };
            for host in candidates {
                assert_eq!(is_usable_host(net, host), listed.contains(&host), "{cidr} {host}");
            }
        }
        let net = parse_cidr("10.0.0.0/30").unwrap();
        assert!(!is_usable_host(net, "2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn cidr_scope_does_not_query_broadcast() {
        let scope = SyncScope::parse(Some("10.0.0.0/30"), None, true, true).unwrap();
        assert!(scope.queries_host("10.0.0.2".parse().unwrap()));
        assert!(!scope.queries_host("10.0.0.0".parse().unwrap()));
        assert!(!scope.queries_host("10.0.0.3".parse().unwrap()));
        assert!(!SyncScope::default().queries_host("10.0.0.2".parse().unwrap()));
    }

    #[test]
    fn huge_networks_exceed_budget_without_enumerating() {
        let scope = SyncScope::parse(Some("2001:db8::/32"), None, true, false).unwrap();
        assert!(matches!(
            scope.check_host_budget(65_536),
            Err(CoreError::FilterTooBroad { .. })
        ));
        assert_eq!(host_count(parse_cidr("::/0").unwrap()), u128::MAX - 1);
    }

    #[test]
    fn blank_filters_mean_unfiltered() {
        let scope = SyncScope::parse(Some("  "), Some(""), true, true).unwrap();
        assert!(scope.is_unfiltered());
        assert!(scope.prefix_scope_is_exhaustive());
    }

    #[test]
    fn cidr_scope_filters_prefixes() {
        let scope = SyncScope::parse(Some("10.0.0.0/16"), None, false, true).unwrap();
        assert!(scope.contains_prefix("10.0.1.0/24".parse().unwrap()));
        assert!(!scope.contains_prefix("10.1.0.0/24".parse().unwrap()));
    }
}
