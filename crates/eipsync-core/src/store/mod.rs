// ── Inventory store seam ──
//
// The target inventory as a natural-key object store. `TargetAdapter`
// layers the lifecycle rules on top; implementations only persist.

pub mod collection;
pub mod memory;
pub mod nautobot;

use std::net::IpAddr;

use async_trait::async_trait;

pub use collection::{EntityCollection, Inventory};
pub use memory::MemoryInventory;
pub use nautobot::NautobotInventory;

use crate::error::StoreError;
use crate::model::{Address, AddressChanges, Lookup, Prefix, PrefixChanges, PrefixKey};
use crate::scope::SyncScope;

/// Natural-key CRUD over target addresses and prefixes.
///
/// `update_*` applies exactly the fields set in the change-set. Missing
/// records on update or delete are `StoreError::NotFound`; rejected
/// payloads are `StoreError::Validation`.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    // ── Addresses ────────────────────────────────────────────────────
    async fn list_addresses(&self, scope: &SyncScope) -> Result<Vec<Address>, StoreError>;
    async fn get_address(&self, host: IpAddr) -> Result<Lookup<Address>, StoreError>;
    async fn insert_address(&self, address: &Address) -> Result<Address, StoreError>;
    async fn update_address(
        &self,
        host: IpAddr,
        changes: &AddressChanges,
    ) -> Result<Address, StoreError>;
    async fn delete_address(&self, host: IpAddr) -> Result<(), StoreError>;

    // ── Prefixes ─────────────────────────────────────────────────────
    async fn list_prefixes(&self, scope: &SyncScope) -> Result<Vec<Prefix>, StoreError>;
    async fn get_prefix(&self, key: PrefixKey) -> Result<Lookup<Prefix>, StoreError>;
    async fn insert_prefix(&self, prefix: &Prefix) -> Result<Prefix, StoreError>;
    async fn update_prefix(
        &self,
        key: PrefixKey,
        changes: &PrefixChanges,
    ) -> Result<Prefix, StoreError>;
    async fn delete_prefix(&self, key: PrefixKey) -> Result<(), StoreError>;
}

/// Whether a target address falls inside a load scope.
///
/// CIDR is containment; domains are case-insensitive substring matches,
/// mirroring the `dns_name__ic` lookup the Nautobot store uses.
pub(crate) fn address_in_scope(scope: &SyncScope, address: &Address) -> bool {
    if scope.is_unfiltered() {
        return true;
    }
    let by_cidr = scope.cidr.is_some_and(|cidr| cidr.contains(address.host));
    let name = address.dns_name.to_ascii_lowercase();
    let by_domain = scope
        .domains
        .iter()
        .any(|domain| name.contains(&domain.to_ascii_lowercase()));
    by_cidr || by_domain
}

/// Whether a target prefix falls inside a load scope.
///
/// Domain filters do not narrow prefixes: there is no mapping from a
/// domain to the networks it lives in.
pub(crate) fn prefix_in_scope(scope: &SyncScope, prefix: &Prefix) -> bool {
    scope.contains_prefix(prefix.key)
}
