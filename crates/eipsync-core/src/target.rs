// ── Target store adapter ──
//
// Lifecycle rules on top of an `InventoryStore`: idempotent create with
// the import status, partial update with the linkage status transition,
// and tolerant delete. Mutations never return errors; they report an
// `Outcome` and the run moves on.

use std::fmt;
use std::net::IpAddr;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{CoreError, StoreError};
use crate::model::{
    Address, AddressChanges, ChangeSet, ExternalId, Lookup, Outcome, Prefix, PrefixChanges,
    PrefixKey, Status, SyncModel,
};
use crate::scope::SyncScope;
use crate::store::{EntityCollection, Inventory, InventoryStore};

/// Create/update/delete for one entity type, by natural key.
#[async_trait]
pub trait EntityRepository<T: SyncModel>: Send + Sync {
    async fn create(&self, entity: &T) -> Outcome<T>;
    async fn update(&self, key: &T::Key, changes: &T::Changes) -> Outcome<T>;
    async fn delete(&self, key: &T::Key) -> Outcome<()>;
}

/// How an update moves a record's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    /// The field tying the record to SOLIDserver was cleared.
    LinkageLost,
    /// A new SOLIDserver id arrives with the change; status stays.
    Relinked,
    /// Neither: attribute drift with the link untouched.
    Ambiguous,
}

impl Transition {
    fn of(linkage_cleared: bool, external_id_changed: bool) -> Self {
        if linkage_cleared {
            Self::LinkageLost
        } else if external_id_changed {
            Self::Relinked
        } else {
            Self::Ambiguous
        }
    }
}

/// Adapter binding the lifecycle rules to a concrete store.
pub struct TargetAdapter<'a, S: InventoryStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: InventoryStore + ?Sized> TargetAdapter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Load the target side of a run.
    pub async fn load(&self, scope: &SyncScope) -> Result<Inventory, CoreError> {
        let mut inventory = Inventory::default();

        if scope.addresses {
            let addresses = self.store.list_addresses(scope).await?;
            inventory.addresses = addresses.into_iter().collect::<EntityCollection<_>>();
        }
        if scope.prefixes {
            let prefixes = self.store.list_prefixes(scope).await?;
            inventory.prefixes = prefixes.into_iter().collect::<EntityCollection<_>>();
        }

        info!(
            addresses = inventory.addresses.len(),
            prefixes = inventory.prefixes.len(),
            "target loaded"
        );
        Ok(inventory)
    }
}

fn mutation_failed<T>(kind: &str, key: &dyn fmt::Display, err: &StoreError) -> Outcome<T> {
    warn!(kind, key = %key, error = %err, "target mutation failed");
    Outcome::failed(err.to_string())
}

fn delete_outcome(
    kind: &str,
    key: &dyn fmt::Display,
    result: Result<(), StoreError>,
) -> Outcome<()> {
    match result {
        Ok(()) => Outcome::Applied(()),
        Err(StoreError::NotFound { .. }) => {
            warn!(kind, key = %key, "delete target already absent");
            Outcome::skipped("not found in target")
        }
        Err(e) => mutation_failed(kind, key, &e),
    }
}

// ── Addresses ────────────────────────────────────────────────────────

#[async_trait]
impl<S: InventoryStore + ?Sized> EntityRepository<Address> for TargetAdapter<'_, S> {
    async fn create(&self, address: &Address) -> Outcome<Address> {
        match self.store.get_address(address.host).await {
            Ok(Lookup::Found(_)) => {
                warn!(host = %address.host, "address already exists in target, not creating");
                return Outcome::skipped("already exists in target");
            }
            Ok(Lookup::NotFound) => {}
            Err(e) => return mutation_failed("address", &address.host, &e),
        }

        let record = Address {
            prefix_length: Some(address.effective_prefix_length()),
            status: Some(Status::ImportedFromSolidserver),
            ..address.clone()
        };
        match self.store.insert_address(&record).await {
            Ok(created) => {
                debug!(host = %created.host, "address created");
                Outcome::Applied(created)
            }
            Err(e) => mutation_failed("address", &address.host, &e),
        }
    }

    async fn update(&self, host: &IpAddr, changes: &AddressChanges) -> Outcome<Address> {
        if changes.is_empty() || changes.is_status_only() {
            debug!(host = %host, "no attribute changes, skipping update");
            return Outcome::skipped("no attribute changes");
        }

        let mut effective = AddressChanges {
            status: None,
            ..changes.clone()
        };
        match Transition::of(
            effective.dns_name.as_deref() == Some(""),
            effective.external_id.is_some(),
        ) {
            Transition::LinkageLost => {
                effective.status = Some(Status::NoIpamRecord);
                effective.external_id = Some(ExternalId::Unlinked);
            }
            Transition::Relinked => {}
            Transition::Ambiguous => {
                warn!(host = %host, "update without linkage change, marking status Unknown");
                effective.status = Some(Status::Unknown);
            }
        }

        match self.store.update_address(*host, &effective).await {
            Ok(updated) => {
                debug!(host = %host, changes = ?effective.fields(), "address updated");
                Outcome::Applied(updated)
            }
            Err(e) => mutation_failed("address", host, &e),
        }
    }

    async fn delete(&self, host: &IpAddr) -> Outcome<()> {
        let result = self.store.delete_address(*host).await;
        delete_outcome("address", host, result)
    }
}

// ── Prefixes ─────────────────────────────────────────────────────────

#[async_trait]
impl<S: InventoryStore + ?Sized> EntityRepository<Prefix> for TargetAdapter<'_, S> {
    async fn create(&self, prefix: &Prefix) -> Outcome<Prefix> {
        match self.store.get_prefix(prefix.key).await {
            Ok(Lookup::Found(_)) => {
                warn!(prefix = %prefix.key, "prefix already exists in target, not creating");
                return Outcome::skipped("already exists in target");
            }
            Ok(Lookup::NotFound) => {}
            Err(e) => return mutation_failed("prefix", &prefix.key, &e),
        }

        let record = Prefix {
            status: Some(Status::ImportedFromSolidserver),
            ..prefix.clone()
        };
        match self.store.insert_prefix(&record).await {
            Ok(created) => {
                debug!(prefix = %created.key, "prefix created");
                Outcome::Applied(created)
            }
            Err(e) => mutation_failed("prefix", &prefix.key, &e),
        }
    }

    async fn update(&self, key: &PrefixKey, changes: &PrefixChanges) -> Outcome<Prefix> {
        if changes.is_empty() || changes.is_status_only() {
            debug!(prefix = %key, "no attribute changes, skipping update");
            return Outcome::skipped("no attribute changes");
        }

        let mut effective = PrefixChanges {
            status: None,
            ..changes.clone()
        };
        match Transition::of(
            effective.description.as_deref() == Some(""),
            effective.external_id.is_some(),
        ) {
            Transition::LinkageLost => {
                effective.status = Some(Status::NoIpamRecord);
                effective.external_id = Some(ExternalId::Unlinked);
            }
            Transition::Relinked => {}
            Transition::Ambiguous => {
                warn!(prefix = %key, "update without linkage change, marking status Unknown");
                effective.status = Some(Status::Unknown);
            }
        }

        match self.store.update_prefix(*key, &effective).await {
            Ok(updated) => {
                debug!(prefix = %key, changes = ?effective.fields(), "prefix updated");
                Outcome::Applied(updated)
            }
            Err(e) => mutation_failed("prefix", key, &e),
        }
    }

    async fn delete(&self, key: &PrefixKey) -> Outcome<()> {
        let result = self.store.delete_prefix(*key).await;
        delete_outcome("prefix", key, result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryInventory;
    use pretty_assertions::assert_eq;

    fn source_address(host: &str, name: &str, id: &str) -> Address {
        Address {
            dns_name: name.into(),
            description: "rack 1".into(),
            external_id: ExternalId::parse(id),
            prefix_length: Some(24),
            ..Address::new(host.parse().unwrap())
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn create_twice_keeps_one_record() {
        let store = MemoryInventory::new();
        let adapter = TargetAdapter::new(&store);
        let addr = source_address("10.0.0.1", "a.example.net", "5");

        assert!(EntityRepository::<Address>::create(&adapter, &addr).await.is_applied());
        let second = EntityRepository::<Address>::create(&adapter, &addr).await;
        assert!(matches!(second, Outcome::Skipped { .. }));

        let stored = store.addresses().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, Some(Status::ImportedFromSolidserver));
    }

    #[tokio::test]
    async fn create_uses_host_length_when_unknown() {
        let store = MemoryInventory::new();
        let adapter = TargetAdapter::new(&store);
        let mut addr = source_address("2001:db8::1", "v6.example.net", "5");
        addr.prefix_length = None;

        let created = EntityRepository::<Address>::create(&adapter, &addr).await;
        match created {
            Outcome::Applied(a) => assert_eq!(a.prefix_length, Some(128)),
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_fails_when_import_status_is_missing() {
        let store = MemoryInventory::with_statuses(["Active"]);
        let adapter = TargetAdapter::new(&store);
        let addr = source_address("10.0.0.1", "a.example.net", "5");

        let outcome = EntityRepository::<Address>::create(&adapter, &addr).await;
        assert!(matches!(outcome, Outcome::Failed { .. }));
        assert!(store.addresses().unwrap().is_empty());
    }

    #[tokio::test]
    async fn clearing_dns_name_marks_no_ipam_record() {
        let store = MemoryInventory::new();
        store
            .seed_address(Address {
                status: Some(Status::Active),
                ..source_address("10.0.0.1", "a.example.net", "5")
            })
            .unwrap();
        let adapter = TargetAdapter::new(&store);

        let changes = AddressChanges {
            dns_name: Some(String::new()),
            description: Some("gone".into()),
            external_id: Some(ExternalId::Linked("9".into())),
            ..AddressChanges::default()
        };
        let outcome = EntityRepository::<Address>::update(&adapter, &ip("10.0.0.1"), &changes).await;
        let updated = match outcome {
            Outcome::Applied(a) => a,
            other => panic!("expected Applied, got {other:?}"),
        };
        assert_eq!(updated.status, Some(Status::NoIpamRecord));
        assert_eq!(updated.external_id, ExternalId::Unlinked);
        assert_eq!(updated.description, "gone");
    }

    #[tokio::test]
    async fn relinking_leaves_status_alone() {
        let store = MemoryInventory::new();
        store
            .seed_address(Address {
                status: Some(Status::Active),
                ..source_address("10.0.0.1", "a.example.net", "5")
            })
            .unwrap();
        let adapter = TargetAdapter::new(&store);

        let changes = AddressChanges {
            external_id: Some(ExternalId::Linked("6".into())),
            ..AddressChanges::default()
        };
        let outcome = EntityRepository::<Address>::update(&adapter, &ip("10.0.0.1"), &changes).await;
        let updated = match outcome {
            Outcome::Applied(a) => a,
            other => panic!("expected Applied, got {other:?}"),
        };
        assert_eq!(updated.status, Some(Status::Active));
        assert_eq!(updated.external_id, ExternalId::Linked("6".into()));
    }

    #[tokio::test]
    async fn plain_drift_marks_unknown() {
        let store = MemoryInventory::new();
        store
            .seed_prefix(Prefix {
                description: "old".into(),
                external_id: ExternalId::Linked("3".into()),
                status: Some(Status::Active),
                ..Prefix::new("10.1.0.0/16".parse().unwrap())
            })
            .unwrap();
        let adapter = TargetAdapter::new(&store);

        let changes = PrefixChanges {
            description: Some("new".into()),
            ..PrefixChanges::default()
        };
        let key: PrefixKey = "10.1.0.0/16".parse().unwrap();
        let outcome = EntityRepository::<Prefix>::update(&adapter, &key, &changes).await;
        match outcome {
            Outcome::Applied(p) => assert_eq!(p.status, Some(Status::Unknown)),
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_only_update_is_skipped() {
        let store = MemoryInventory::new();
        let adapter = TargetAdapter::new(&store);
        let changes = AddressChanges {
            status: Some(Status::Active),
            ..AddressChanges::default()
        };
        let outcome = EntityRepository::<Address>::update(&adapter, &ip("10.0.0.1"), &changes).await;
        assert!(matches!(outcome, Outcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn update_of_missing_record_fails() {
        let store = MemoryInventory::new();
        let adapter = TargetAdapter::new(&store);
        let changes = AddressChanges {
            external_id: Some(ExternalId::Linked("1".into())),
            ..AddressChanges::default()
        };
        let outcome = EntityRepository::<Address>::update(&adapter, &ip("10.0.0.1"), &changes).await;
        assert!(matches!(outcome, Outcome::Failed { .. }));
    }

    #[tokio::test]
    async fn delete_of_absent_record_is_skipped() {
        let store = MemoryInventory::new();
        let adapter = TargetAdapter::new(&store);
        let outcome = EntityRepository::<Address>::delete(&adapter, &ip("10.0.0.1")).await;
        assert!(matches!(outcome, Outcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn load_respects_entity_toggles() {
        let store = MemoryInventory::new();
        store
            .seed_address(source_address("10.0.0.1", "a.example.net", "5"))
            .unwrap();
        store
            .seed_prefix(Prefix::new("10.0.0.0/24".parse().unwrap()))
            .unwrap();
        let adapter = TargetAdapter::new(&store);

        let scope = SyncScope {
            prefixes: false,
            ..SyncScope::default()
        };
        let inventory = adapter.load(&scope).await.unwrap();
        assert_eq!(inventory.addresses.len(), 1);
        assert!(inventory.prefixes.is_empty());
    }
}
