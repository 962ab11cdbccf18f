// Nautobot IPAM wire types
//
// Read models tolerate missing optional fields (`#[serde(default)]`);
// write models skip unset fields so PATCH bodies stay partial.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Pagination ───────────────────────────────────────────────────────

/// Nautobot list envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

// ── References ───────────────────────────────────────────────────────

/// Nested status object as returned with `depth=1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

impl StatusRef {
    /// The human label, preferring `name` over `display`.
    pub fn label(&self) -> Option<&str> {
        self.name.as_deref().or(self.display.as_deref())
    }
}

/// Natural-key reference used in write bodies (`{"name": "Active"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameRef {
    pub name: String,
}

impl NameRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

// ── IP addresses ─────────────────────────────────────────────────────

/// `GET /api/ipam/ip-addresses/` result row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpAddressRecord {
    pub id: String,
    /// Host plus mask, e.g. `"10.1.2.3/24"`.
    pub address: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub mask_length: Option<u8>,
    #[serde(default)]
    pub dns_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<StatusRef>,
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
}

/// `POST /api/ipam/ip-addresses/` body.
#[derive(Debug, Clone, Serialize)]
pub struct IpAddressWrite {
    pub address: String,
    pub dns_name: String,
    pub description: String,
    pub status: NameRef,
    pub namespace: NameRef,
    pub custom_fields: Map<String, Value>,
}

/// `PATCH /api/ipam/ip-addresses/{id}/` body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IpAddressPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_length: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<NameRef>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub custom_fields: Map<String, Value>,
}

// ── Prefixes ─────────────────────────────────────────────────────────

/// `GET /api/ipam/prefixes/` result row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrefixRecord {
    pub id: String,
    /// Network plus length, e.g. `"10.1.0.0/16"`.
    pub prefix: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<StatusRef>,
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
}

/// `POST /api/ipam/prefixes/` body.
#[derive(Debug, Clone, Serialize)]
pub struct PrefixWrite {
    pub prefix: String,
    pub description: String,
    pub status: NameRef,
    pub namespace: NameRef,
    pub custom_fields: Map<String, Value>,
}

/// `PATCH /api/ipam/prefixes/{id}/` body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrefixPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<NameRef>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub custom_fields: Map<String, Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn address_record_tolerates_sparse_rows() {
        let rec: IpAddressRecord = serde_json::from_value(json!({
            "id": "4f3c",
            "address": "10.0.0.1/24",
            "dns_name": "a.example.net",
            "status": { "id": "s1", "name": "Active" },
            "custom_fields": { "solidserver_addr_id": "42" }
        }))
        .unwrap();
        assert_eq!(rec.description, "");
        assert_eq!(rec.status.unwrap().label(), Some("Active"));
        assert_eq!(rec.custom_fields["solidserver_addr_id"], json!("42"));
    }

    #[test]
    fn patch_bodies_omit_unset_fields() {
        let patch = IpAddressPatch {
            dns_name: Some(String::new()),
            ..IpAddressPatch::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "dns_name": "" }));
    }

    #[test]
    fn status_label_falls_back_to_display() {
        let status = StatusRef {
            display: Some("Unknown".into()),
            ..StatusRef::default()
        };
        assert_eq!(status.label(), Some("Unknown"));
    }
}
