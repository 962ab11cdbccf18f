// SOLIDserver wire record types
//
// SOLIDserver serializes every scalar as a JSON string ("ip_id": "1234",
// "is_terminal": "1"), but some deployments and proxies hand back real
// numbers or booleans. Every field therefore goes through `lenient`, which
// accepts string, number, or bool and yields `Option<String>`. Parsing into
// strong types is the normalizer's job in `eipsync-core`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::IpVersion;

/// Deserialize any scalar into an optional string; `null` and objects map to `None`.
fn lenient<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if b { "1".into() } else { "0".into() }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

/// IPv4 address record, from `GET /rest/ip_address_list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ip4AddressRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub ip_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub hostaddr: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subnet_id: Option<String>,
    /// Number of addresses in the parent subnet (a power of two).
    #[serde(default, deserialize_with = "lenient")]
    pub subnet_size: Option<String>,
    /// URL-encoded class parameters (`__eip_description=...&...`).
    #[serde(default, deserialize_with = "lenient")]
    pub ip_class_parameters: Option<String>,
}

/// IPv6 address record, from `GET /rest/ip6_address6_list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ip6AddressRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub ip6_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub hostaddr: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ip6_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subnet6_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subnet6_prefix: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ip6_class_parameters: Option<String>,
}

/// IPv4 subnet record, from `ip_block_subnet_list` / `ip_block_subnet_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ip4SubnetRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub subnet_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subnet_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub start_hostaddr: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subnet_size: Option<String>,
    /// `"1"` for leaf blocks, `"0"` for containers.
    #[serde(default, deserialize_with = "lenient")]
    pub is_terminal: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subnet_class_parameters: Option<String>,
}

/// IPv6 subnet record, from `ip6_block6_subnet6_list` / `ip6_block6_subnet6_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ip6SubnetRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub subnet6_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subnet6_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub start_hostaddr: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subnet6_prefix: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_terminal: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subnet6_class_parameters: Option<String>,
}

/// Row returned by the `*_count` services.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub total: Option<String>,
}

/// A raw SOLIDserver record, tagged by resource type and IP version.
///
/// Produced once at the client boundary; downstream code matches on the
/// variant instead of probing field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawRecord {
    AddressV4(Ip4AddressRecord),
    AddressV6(Ip6AddressRecord),
    PrefixV4(Ip4SubnetRecord),
    PrefixV6(Ip6SubnetRecord),
}

impl RawRecord {
    pub fn version(&self) -> IpVersion {
        match self {
            Self::AddressV4(_) | Self::PrefixV4(_) => IpVersion::V4,
            Self::AddressV6(_) | Self::PrefixV6(_) => IpVersion::V6,
        }
    }

    pub fn is_address(&self) -> bool {
        matches!(self, Self::AddressV4(_) | Self::AddressV6(_))
    }

    /// The SOLIDserver record id, if present.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            Self::AddressV4(r) => r.ip_id.as_deref(),
            Self::AddressV6(r) => r.ip6_id.as_deref(),
            Self::PrefixV4(r) => r.subnet_id.as_deref(),
            Self::PrefixV6(r) => r.subnet6_id.as_deref(),
        }
    }

    /// Short human label for log lines: host address or subnet start + name.
    pub fn label(&self) -> String {
        match self {
            Self::AddressV4(r) => r.hostaddr.clone().unwrap_or_default(),
            Self::AddressV6(r) => r.hostaddr.clone().unwrap_or_default(),
            Self::PrefixV4(r) => format!(
                "{} ({})",
                r.start_hostaddr.as_deref().unwrap_or_default(),
                r.subnet_name.as_deref().unwrap_or_default()
            ),
            Self::PrefixV6(r) => format!(
                "{} ({})",
                r.start_hostaddr.as_deref().unwrap_or_default(),
                r.subnet6_name.as_deref().unwrap_or_default()
            ),
        }
    }

    /// The DNS name on an address record; `None` for prefixes.
    pub fn dns_name(&self) -> Option<&str> {
        match self {
            Self::AddressV4(r) => r.name.as_deref(),
            Self::AddressV6(r) => r.ip6_name.as_deref(),
            Self::PrefixV4(_) | Self::PrefixV6(_) => None,
        }
    }
}

/// Some info services answer with a bare object rather than a list.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(v) => v,
            Self::One(one) => vec![one],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stringly_typed_fields_deserialize() {
        let rec: Ip4AddressRecord = serde_json::from_value(json!({
            "ip_id": "1234",
            "hostaddr": "10.1.2.3",
            "name": "host.example.net",
            "subnet_id": "55",
            "subnet_size": "256",
            "ip_class_parameters": "__eip_description=core%20router",
            "unrelated": "ignored"
        }))
        .unwrap();
        assert_eq!(rec.ip_id.as_deref(), Some("1234"));
        assert_eq!(rec.subnet_size.as_deref(), Some("256"));
    }

    #[test]
    fn numeric_and_bool_fields_are_accepted() {
        let rec: Ip6SubnetRecord = serde_json::from_value(json!({
            "subnet6_id": 77,
            "start_hostaddr": "2001:db8::",
            "subnet6_prefix": 64,
            "is_terminal": true
        }))
        .unwrap();
        assert_eq!(rec.subnet6_id.as_deref(), Some("77"));
        assert_eq!(rec.subnet6_prefix.as_deref(), Some("64"));
        assert_eq!(rec.is_terminal.as_deref(), Some("1"));
    }

    #[test]
    fn null_fields_become_none() {
        let rec: Ip4SubnetRecord =
            serde_json::from_value(json!({ "subnet_id": null, "subnet_size": "1024" })).unwrap();
        assert!(rec.subnet_id.is_none());
        assert!(rec.start_hostaddr.is_none());
    }

    #[test]
    fn one_or_many_accepts_both_shapes() {
        let many: OneOrMany<CountRecord> =
            serde_json::from_value(json!([{ "total": "12" }])).unwrap();
        assert_eq!(many.into_vec().len(), 1);
        let one: OneOrMany<CountRecord> = serde_json::from_value(json!({ "total": 3 })).unwrap();
        assert_eq!(one.into_vec()[0].total.as_deref(), Some("3"));
    }

    #[test]
    fn raw_record_accessors() {
        let rec = RawRecord::AddressV6(Ip6AddressRecord {
            ip6_id: Some("9".into()),
            hostaddr: Some("2001:db8::1".into()),
            ip6_name: Some("v6.example.net".into()),
            ..Ip6AddressRecord::default()
        });
        assert_eq!(rec.version(), IpVersion::V6);
        assert!(rec.is_address());
        assert_eq!(rec.record_id(), Some("9"));
        assert_eq!(rec.dns_name(), Some("v6.example.net"));
        assert_eq!(rec.label(), "2001:db8::1");
    }
}
