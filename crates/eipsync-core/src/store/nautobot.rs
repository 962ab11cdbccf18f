// ── Nautobot-backed inventory ──
//
// Maps the natural-key store contract onto Nautobot's id-keyed REST API.
// Every lookup and list is confined to the configured namespace.

use std::collections::HashSet;
use std::net::IpAddr;

use async_trait::async_trait;
use eipsync_api::NautobotClient;
use eipsync_api::nautobot::{
    IpAddressPatch, IpAddressRecord, IpAddressWrite, NameRef, PrefixPatch, PrefixRecord,
    PrefixWrite,
};
use ipnetwork::IpNetwork;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::InventoryStore;
use crate::config::NautobotConfig;
use crate::error::{CoreError, StoreError};
use crate::model::{
    Address, AddressChanges, ExternalId, Lookup, Prefix, PrefixChanges, PrefixKey, Status,
};
use crate::scope::SyncScope;

/// Custom field holding the SOLIDserver record id.
pub const EXTERNAL_ID_FIELD: &str = "solidserver_addr_id";

/// An [`InventoryStore`] over the Nautobot IPAM API.
#[derive(Debug, Clone)]
pub struct NautobotInventory {
    client: NautobotClient,
    namespace: String,
}

impl NautobotInventory {
    pub fn new(config: &NautobotConfig) -> Result<Self, CoreError> {
        let client = NautobotClient::new(&config.url, &config.token, &config.transport())?
            .with_page_size(config.page_size);
        Ok(Self::with_client(client, &config.namespace))
    }

    pub fn with_client(client: NautobotClient, namespace: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_owned(),
        }
    }

    fn filters(&self, extra: (&'static str, String)) -> Vec<(&'static str, String)> {
        vec![("namespace", self.namespace.clone()), extra]
    }

    fn namespace_only(&self) -> Vec<(&'static str, String)> {
        vec![("namespace", self.namespace.clone())]
    }

    // ── Id resolution ────────────────────────────────────────────────

    async fn address_record(&self, host: IpAddr) -> Result<Option<IpAddressRecord>, StoreError> {
        let rows = self
            .client
            .list_ip_addresses(&self.filters(("address", host.to_string())))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn prefix_record(&self, key: PrefixKey) -> Result<Option<PrefixRecord>, StoreError> {
        let rows = self
            .client
            .list_prefixes(&self.filters(("prefix", key.to_string())))
            .await?;
        Ok(rows.into_iter().next())
    }
}

// ── Wire conversion ──────────────────────────────────────────────────

fn external_id(custom_fields: &Map<String, Value>) -> ExternalId {
    match custom_fields.get(EXTERNAL_ID_FIELD) {
        Some(Value::String(raw)) => ExternalId::parse(raw),
        Some(Value::Number(n)) => ExternalId::parse(&n.to_string()),
        _ => ExternalId::Unlinked,
    }
}

fn external_id_field(id: &ExternalId) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(EXTERNAL_ID_FIELD.into(), Value::String(id.as_wire().to_owned()));
    fields
}

fn status_of(status: Option<&eipsync_api::nautobot::StatusRef>) -> Option<Status> {
    status.and_then(|s| s.label()).map(Status::from_label)
}

fn to_address(record: IpAddressRecord) -> Option<Address> {
    let net: IpNetwork = match record.address.parse() {
        Ok(net) => net,
        Err(e) => {
            warn!(id = %record.id, address = %record.address, error = %e, "skipping unparseable target address");
            return None;
        }
    };
    Some(Address {
        dns_name: record.dns_name,
        description: record.description,
        external_id: external_id(&record.custom_fields),
        prefix_length: Some(record.mask_length.unwrap_or_else(|| net.prefix())),
        status: status_of(record.status.as_ref()),
        ..Address::new(net.ip())
    })
}

fn to_prefix(record: PrefixRecord) -> Option<Prefix> {
    let net: IpNetwork = match record.prefix.parse() {
        Ok(net) => net,
        Err(e) => {
            warn!(id = %record.id, prefix = %record.prefix, error = %e, "skipping unparseable target prefix");
            return None;
        }
    };
    Some(Prefix {
        description: record.description,
        external_id: external_id(&record.custom_fields),
        status: status_of(record.status.as_ref()),
        ..Prefix::new(PrefixKey::from(net))
    })
}

fn missing_status() -> StoreError {
    StoreError::Validation {
        message: "status is required on create".into(),
    }
}

fn address_patch(changes: &AddressChanges) -> IpAddressPatch {
    IpAddressPatch {
        dns_name: changes.dns_name.clone(),
        description: changes.description.clone(),
        mask_length: changes.prefix_length,
        status: changes.status.as_ref().map(|s| NameRef::new(s.label())),
        custom_fields: changes
            .external_id
            .as_ref()
            .map(external_id_field)
            .unwrap_or_default(),
    }
}

fn prefix_patch(changes: &PrefixChanges) -> PrefixPatch {
    PrefixPatch {
        description: changes.description.clone(),
        status: changes.status.as_ref().map(|s| NameRef::new(s.label())),
        custom_fields: changes
            .external_id
            .as_ref()
            .map(external_id_field)
            .unwrap_or_default(),
    }
}

#[async_trait]
impl InventoryStore for NautobotInventory {
    // ── Addresses ────────────────────────────────────────────────────

    async fn list_addresses(&self, scope: &SyncScope) -> Result<Vec<Address>, StoreError> {
        let mut queries = Vec::new();
        if scope.is_unfiltered() {
            queries.push(self.namespace_only());
        }
        if let Some(cidr) = scope.cidr {
            queries.push(self.filters(("parent", cidr.to_string())));
        }
        for domain in &scope.domains {
            queries.push(self.filters(("dns_name__ic", domain.clone())));
        }

        let mut seen = HashSet::new();
        let mut addresses = Vec::new();
        for filters in queries {
            let rows = self.client.list_ip_addresses(&filters).await?;
            debug!(?filters, count = rows.len(), "target addresses fetched");
            addresses.extend(
                rows.into_iter()
                    .filter(|row| seen.insert(row.id.clone()))
                    .filter_map(to_address),
            );
        }
        Ok(addresses)
    }

    async fn get_address(&self, host: IpAddr) -> Result<Lookup<Address>, StoreError> {
        Ok(self.address_record(host).await?.and_then(to_address).into())
    }

    async fn insert_address(&self, address: &Address) -> Result<Address, StoreError> {
        let status = address.status.as_ref().ok_or_else(missing_status)?;
        let body = IpAddressWrite {
            address: format!("{}/{}", address.host, address.effective_prefix_length()),
            dns_name: address.dns_name.clone(),
            description: address.description.clone(),
            status: NameRef::new(status.label()),
            namespace: NameRef::new(&self.namespace),
            custom_fields: external_id_field(&address.external_id),
        };
        let created = self.client.create_ip_address(&body).await?;
        debug!(id = %created.id, host = %address.host, "target address created");
        Ok(address.clone())
    }

    async fn update_address(
        &self,
        host: IpAddr,
        changes: &AddressChanges,
    ) -> Result<Address, StoreError> {
        let record = self
            .address_record(host)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                what: format!("address {host}"),
            })?;
        let updated = self
            .client
            .update_ip_address(&record.id, &address_patch(changes))
            .await?;
        to_address(updated).ok_or_else(|| StoreError::Backend {
            message: format!("unparseable address returned for {host}"),
        })
    }

    async fn delete_address(&self, host: IpAddr) -> Result<(), StoreError> {
        let record = self
            .address_record(host)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                what: format!("address {host}"),
            })?;
        Ok(self.client.delete_ip_address(&record.id).await?)
    }

    // ── Prefixes ─────────────────────────────────────────────────────

    async fn list_prefixes(&self, scope: &SyncScope) -> Result<Vec<Prefix>, StoreError> {
        let filters = match scope.cidr {
            Some(cidr) => self.filters(("within_include", cidr.to_string())),
            None => self.namespace_only(),
        };
        let rows = self.client.list_prefixes(&filters).await?;
        debug!(?filters, count = rows.len(), "target prefixes fetched");
        Ok(rows.into_iter().filter_map(to_prefix).collect())
    }

    async fn get_prefix(&self, key: PrefixKey) -> Result<Lookup<Prefix>, StoreError> {
        Ok(self.prefix_record(key).await?.and_then(to_prefix).into())
    }

    async fn insert_prefix(&self, prefix: &Prefix) -> Result<Prefix, StoreError> {
        let status = prefix.status.as_ref().ok_or_else(missing_status)?;
        let body = PrefixWrite {
            prefix: prefix.key.to_string(),
            description: prefix.description.clone(),
            status: NameRef::new(status.label()),
            namespace: NameRef::new(&self.namespace),
            custom_fields: external_id_field(&prefix.external_id),
        };
        let created = self.client.create_prefix(&body).await?;
        debug!(id = %created.id, prefix = %prefix.key, "target prefix created");
        Ok(prefix.clone())
    }

    async fn update_prefix(
        &self,
        key: PrefixKey,
        changes: &PrefixChanges,
    ) -> Result<Prefix, StoreError> {
        let record = self
            .prefix_record(key)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                what: format!("prefix {key}"),
            })?;
        let updated = self
            .client
            .update_prefix(&record.id, &prefix_patch(changes))
            .await?;
        to_prefix(updated).ok_or_else(|| StoreError::Backend {
            message: format!("unparseable prefix returned for {key}"),
        })
    }

    async fn delete_prefix(&self, key: PrefixKey) -> Result<(), StoreError> {
        let record = self
            .prefix_record(key)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                what: format!("prefix {key}"),
            })?;
        Ok(self.client.delete_prefix(&record.id).await?)
    }
}
