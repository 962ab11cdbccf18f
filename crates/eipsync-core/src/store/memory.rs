// ── In-process inventory ──
//
// Natural-key maps behind a mutex. Enforces the constraints the real
// target enforces: status labels must pre-exist, keys are unique, and
// address mask lengths fit the address family.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{InventoryStore, address_in_scope, prefix_in_scope};
use crate::error::StoreError;
use crate::model::prefix::max_length;
use crate::model::{
    Address, AddressChanges, Lookup, Prefix, PrefixChanges, PrefixKey, Status,
};
use crate::scope::SyncScope;

#[derive(Debug, Default)]
struct State {
    addresses: BTreeMap<IpAddr, Address>,
    prefixes: BTreeMap<PrefixKey, Prefix>,
    statuses: BTreeSet<String>,
}

/// An [`InventoryStore`] held entirely in memory.
#[derive(Debug)]
pub struct MemoryInventory {
    state: Mutex<State>,
}

impl Default for MemoryInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryInventory {
    /// Empty inventory with every managed status label registered.
    pub fn new() -> Self {
        Self::with_statuses(Status::MANAGED.iter().map(Status::label))
    }

    /// Empty inventory that only knows the given status labels.
    pub fn with_statuses<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let state = State {
            statuses: labels.into_iter().map(str::to_owned).collect(),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Seed a record without validation.
    pub fn seed_address(&self, address: Address) -> Result<(), StoreError> {
        self.lock()?.addresses.insert(address.host, address);
        Ok(())
    }

    pub fn seed_prefix(&self, prefix: Prefix) -> Result<(), StoreError> {
        self.lock()?.prefixes.insert(prefix.key, prefix);
        Ok(())
    }

    /// Snapshot of every address, in key order.
    pub fn addresses(&self) -> Result<Vec<Address>, StoreError> {
        Ok(self.lock()?.addresses.values().cloned().collect())
    }

    /// Snapshot of every prefix, in key order.
    pub fn prefixes(&self) -> Result<Vec<Prefix>, StoreError> {
        Ok(self.lock()?.prefixes.values().cloned().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Backend {
            message: "inventory lock poisoned".into(),
        })
    }
}

impl State {
    fn check_status(&self, status: Option<&Status>) -> Result<(), StoreError> {
        match status {
            Some(status) if !self.statuses.contains(status.label()) => {
                Err(StoreError::Validation {
                    message: format!("status {:?} does not exist", status.label()),
                })
            }
            _ => Ok(()),
        }
    }
}

fn check_mask(host: IpAddr, length: Option<u8>) -> Result<(), StoreError> {
    match length {
        Some(len) if len > max_length(host) => Err(StoreError::Validation {
            message: format!("mask length {len} is invalid for {host}"),
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl InventoryStore for MemoryInventory {
    // ── Addresses ────────────────────────────────────────────────────

    async fn list_addresses(&self, scope: &SyncScope) -> Result<Vec<Address>, StoreError> {
        Ok(self
            .lock()?
            .addresses
            .values()
            .filter(|a| address_in_scope(scope, a))
            .cloned()
            .collect())
    }

    async fn get_address(&self, host: IpAddr) -> Result<Lookup<Address>, StoreError> {
        Ok(self.lock()?.addresses.get(&host).cloned().into())
    }

    async fn insert_address(&self, address: &Address) -> Result<Address, StoreError> {
        let mut state = self.lock()?;
        if state.addresses.contains_key(&address.host) {
            return Err(StoreError::Validation {
                message: format!("address {} already exists", address.host),
            });
        }
        state.check_status(address.status.as_ref())?;
        check_mask(address.host, address.prefix_length)?;
        state.addresses.insert(address.host, address.clone());
        Ok(address.clone())
    }

    async fn update_address(
        &self,
        host: IpAddr,
        changes: &AddressChanges,
    ) -> Result<Address, StoreError> {
        let mut state = self.lock()?;
        state.check_status(changes.status.as_ref())?;
        check_mask(host, changes.prefix_length)?;

        let address = state
            .addresses
            .get_mut(&host)
            .ok_or_else(|| StoreError::NotFound {
                what: format!("address {host}"),
            })?;
        if let Some(name) = &changes.dns_name {
            address.dns_name.clone_from(name);
        }
        if let Some(description) = &changes.description {
            address.description.clone_from(description);
        }
        if let Some(id) = &changes.external_id {
            address.external_id = id.clone();
        }
        if changes.prefix_length.is_some() {
            address.prefix_length = changes.prefix_length;
        }
        if let Some(status) = &changes.status {
            address.status = Some(status.clone());
        }
        Ok(address.clone())
    }

    async fn delete_address(&self, host: IpAddr) -> Result<(), StoreError> {
        self.lock()?
            .addresses
            .remove(&host)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                what: format!("address {host}"),
            })
    }

    // ── Prefixes ─────────────────────────────────────────────────────

    async fn list_prefixes(&self, scope: &SyncScope) -> Result<Vec<Prefix>, StoreError> {
        Ok(self
            .lock()?
            .prefixes
            .values()
            .filter(|p| prefix_in_scope(scope, p))
            .cloned()
            .collect())
    }

    async fn get_prefix(&self, key: PrefixKey) -> Result<Lookup<Prefix>, StoreError> {
        Ok(self.lock()?.prefixes.get(&key).cloned().into())
    }

    async fn insert_prefix(&self, prefix: &Prefix) -> Result<Prefix, StoreError> {
        let mut state = self.lock()?;
        if state.prefixes.contains_key(&prefix.key) {
            return Err(StoreError::Validation {
                message: format!("prefix {} already exists", prefix.key),
            });
        }
        state.check_status(prefix.status.as_ref())?;
        state.prefixes.insert(prefix.key, prefix.clone());
        Ok(prefix.clone())
    }

    async fn update_prefix(
        &self,
        key: PrefixKey,
        changes: &PrefixChanges,
    ) -> Result<Prefix, StoreError> {
        let mut state = self.lock()?;
        state.check_status(changes.status.as_ref())?;

        let prefix = state
            .prefixes
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound {
                what: format!("prefix {key}"),
            })?;
        if let Some(description) = &changes.description {
            prefix.description.clone_from(description);
        }
        if let Some(id) = &changes.external_id {
            prefix.external_id = id.clone();
        }
        if let Some(status) = &changes.status {
            prefix.status = Some(status.clone());
        }
        Ok(prefix.clone())
    }

    async fn delete_prefix(&self, key: PrefixKey) -> Result<(), StoreError> {
        self.lock()?
            .prefixes
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                what: format!("prefix {key}"),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::ExternalId;

    fn address(host: &str, name: &str) -> Address {
        Address {
            dns_name: name.into(),
            external_id: ExternalId::Linked("1".into()),
            status: Some(Status::ImportedFromSolidserver),
            ..Address::new(host.parse().unwrap())
        }
    }

    #[tokio::test]
    async fn unknown_status_is_a_validation_error() {
        let store = MemoryInventory::with_statuses(["Active"]);
        let err = store
            .insert_address(&address("10.0.0.1", "a.example.net"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryInventory::new();
        store
            .insert_address(&address("10.0.0.1", "a.example.net"))
            .await
            .unwrap();
        let err = store
            .insert_address(&address("10.0.0.1", "b.example.net"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
    }

    #[tokio::test]
    async fn update_touches_only_given_fields() {
        let store = MemoryInventory::new();
        store.seed_address(address("10.0.0.1", "a.example.net")).unwrap();

        let changes = AddressChanges {
            description: Some("rack 4".into()),
            ..AddressChanges::default()
        };
        let updated = store
            .update_address("10.0.0.1".parse().unwrap(), &changes)
            .await
            .unwrap();
        assert_eq!(updated.dns_name, "a.example.net");
        assert_eq!(updated.description, "rack 4");
    }

    #[tokio::test]
    async fn oversized_mask_is_rejected() {
        let store = MemoryInventory::new();
        let mut addr = address("10.0.0.1", "a.example.net");
        addr.prefix_length = Some(40);
        assert!(matches!(
            store.insert_address(&addr).await.unwrap_err(),
            StoreError::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn list_honours_scope() {
        let store = MemoryInventory::new();
        store.seed_address(address("10.0.0.1", "a.example.net")).unwrap();
        store.seed_address(address("10.9.0.1", "b.example.org")).unwrap();

        let scope = SyncScope::parse(None, Some("EXAMPLE.net"), true, false).unwrap();
        let listed = store.list_addresses(&scope).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].dns_name, "a.example.net");

        let scope = SyncScope::parse(Some("10.9.0.0/16"), None, true, false).unwrap();
        let listed = store.list_addresses(&scope).await.unwrap();
        assert_eq!(listed[0].dns_name, "b.example.org");
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let store = MemoryInventory::new();
        let err = store
            .delete_prefix("10.0.0.0/24".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
