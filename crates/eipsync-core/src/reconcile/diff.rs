// ── Diff computation ──
//
// Pure comparison of two loaded inventories. Source drives: every source
// key is a create, update, or no-op; target-only keys are left alone
// unless deletion is requested and the load was exhaustive for them.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use super::SyncFlags;
use crate::model::{Address, ChangeSet, ModelKind, Prefix, SyncModel};
use crate::scope::SyncScope;
use crate::store::{EntityCollection, Inventory};

/// What the engine will do with one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiffAction {
    Create,
    Update,
    Delete,
    Unchanged,
}

/// One planned operation.
#[derive(Debug, Clone)]
pub enum DiffElement<T: SyncModel> {
    Create(T),
    Update { key: T::Key, changes: T::Changes },
    Delete(T::Key),
    Unchanged(T::Key),
}

impl<T: SyncModel> DiffElement<T> {
    pub fn action(&self) -> DiffAction {
        match self {
            Self::Create(_) => DiffAction::Create,
            Self::Update { .. } => DiffAction::Update,
            Self::Delete(_) => DiffAction::Delete,
            Self::Unchanged(_) => DiffAction::Unchanged,
        }
    }

    pub fn key(&self) -> T::Key {
        match self {
            Self::Create(entity) => entity.key(),
            Self::Update { key, .. } | Self::Delete(key) | Self::Unchanged(key) => key.clone(),
        }
    }

    fn row(&self) -> DiffRow {
        let fields = match self {
            Self::Create(entity) => entity.attributes(),
            Self::Update { changes, .. } => changes.fields(),
            Self::Delete(_) | Self::Unchanged(_) => Vec::new(),
        };
        DiffRow {
            kind: T::KIND,
            action: self.action(),
            key: self.key().to_string(),
            changes: fields
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect(),
        }
    }
}

/// Planned operations for one entity type.
#[derive(Debug, Clone)]
pub struct ModelDiff<T: SyncModel> {
    pub elements: Vec<DiffElement<T>>,
    /// Target-only records left untouched.
    pub unmatched: usize,
}

impl<T: SyncModel> Default for ModelDiff<T> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            unmatched: 0,
        }
    }
}

impl<T: SyncModel> ModelDiff<T> {
    /// Compare `source` against `target`.
    ///
    /// A target-only record becomes a delete when `deletable` accepts it;
    /// otherwise it is counted as unmatched.
    pub fn compute(
        source: &EntityCollection<T>,
        target: &EntityCollection<T>,
        deletable: impl Fn(&T) -> bool,
    ) -> Self {
        let mut diff = Self::default();

        for entity in source.iter() {
            let key = entity.key();
            let element = match target.get(&key) {
                None => DiffElement::Create(entity.clone()),
                Some(existing) => match entity.changes_from(existing) {
                    Some(changes) => DiffElement::Update { key, changes },
                    None => DiffElement::Unchanged(key),
                },
            };
            diff.elements.push(element);
        }

        for existing in target.iter() {
            let key = existing.key();
            if source.contains(&key) {
                continue;
            }
            if deletable(existing) {
                diff.elements.push(DiffElement::Delete(key));
            } else {
                debug!(kind = %T::KIND, key = %key, "target-only record left untouched");
                diff.unmatched += 1;
            }
        }

        diff
    }

    pub fn count(&self, action: DiffAction) -> usize {
        self.elements.iter().filter(|e| e.action() == action).count()
    }

    /// Creates, updates, and deletes.
    pub fn differences(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| e.action() != DiffAction::Unchanged)
            .count()
    }
}

/// One diff entry, flattened for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRow {
    pub kind: ModelKind,
    pub action: DiffAction,
    pub key: String,
    pub changes: IndexMap<String, String>,
}

/// The full plan for one run.
#[derive(Debug, Clone, Default)]
pub struct Diff {
    pub addresses: ModelDiff<Address>,
    pub prefixes: ModelDiff<Prefix>,
}

impl Diff {
    pub fn compute(
        source: &Inventory,
        target: &Inventory,
        flags: SyncFlags,
        scope: &SyncScope,
    ) -> Self {
        let delete_prefixes = flags.delete_unmatched && scope.prefix_scope_is_exhaustive();
        let diff = Self {
            addresses: ModelDiff::compute(&source.addresses, &target.addresses, |address| {
                flags.delete_unmatched && source_covers(scope, address)
            }),
            prefixes: ModelDiff::compute(&source.prefixes, &target.prefixes, |prefix| {
                delete_prefixes && !source.excluded_prefixes.contains(&prefix.key)
            }),
        };

        for row in diff.all_rows() {
            if row.action == DiffAction::Unchanged {
                if flags.log_unchanged {
                    info!(kind = %row.kind, key = %row.key, "unchanged");
                }
            } else {
                debug!(
                    kind = %row.kind,
                    action = %row.action,
                    key = %row.key,
                    changes = ?row.changes,
                    "planned"
                );
            }
        }
        info!(
            differences = diff.differences(),
            unmatched = diff.addresses.unmatched + diff.prefixes.unmatched,
            "diff computed"
        );
        diff
    }

    /// Total creates, updates, and deletes across both entity types.
    pub fn differences(&self) -> usize {
        self.addresses.differences() + self.prefixes.differences()
    }

    /// Rows for every planned mutation, prefixes first.
    pub fn rows(&self) -> Vec<DiffRow> {
        self.all_rows()
            .into_iter()
            .filter(|row| row.action != DiffAction::Unchanged)
            .collect()
    }

    fn all_rows(&self) -> Vec<DiffRow> {
        self.prefixes
            .elements
            .iter()
            .map(DiffElement::row)
            .chain(self.addresses.elements.iter().map(DiffElement::row))
            .collect()
    }
}

/// Whether the source query for `scope` would have returned this address
/// if it still existed.
///
/// The target is loaded with a substring name match and a plain CIDR
/// containment, the source with a suffix match and a per-host query that
/// skips network, broadcast and anycast addresses. Only records both
/// sides agree on may be deleted.
fn source_covers(scope: &SyncScope, address: &Address) -> bool {
    if scope.is_unfiltered() {
        return true;
    }
    let by_cidr = scope.queries_host(address.host);
    let by_domain = scope
        .domains
        .iter()
        .any(|domain| address.dns_name.ends_with(&format!(".{domain}")));
    by_cidr || by_domain
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{AddressChanges, ExternalId, PrefixKey};
    use pretty_assertions::assert_eq;

    fn addr(host: &str, name: &str, description: &str) -> Address {
        Address {
            dns_name: name.into(),
            description: description.into(),
            external_id: ExternalId::Linked("1".into()),
            prefix_length: Some(24),
            ..Address::new(host.parse().unwrap())
        }
    }

    fn inventory(addresses: Vec<Address>) -> Inventory {
        Inventory {
            addresses: addresses.into_iter().collect(),
            ..Inventory::default()
        }
    }

    fn keep_unmatched() -> SyncFlags {
        SyncFlags::default()
    }

    #[test]
    fn differing_description_is_one_update() {
        let source = inventory(vec![addr("10.0.0.1", "a.example.net", "x")]);
        let target = inventory(vec![addr("10.0.0.1", "a.example.net", "y")]);
        let diff = Diff::compute(&source, &target, keep_unmatched(), &SyncScope::default());

        assert_eq!(diff.differences(), 1);
        match &diff.addresses.elements[0] {
            DiffElement::Update { key, changes } => {
                assert_eq!(key.to_string(), "10.0.0.1");
                assert_eq!(
                    changes,
                    &AddressChanges {
                        description: Some("x".into()),
                        ..AddressChanges::default()
                    }
                );
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn source_only_is_create_and_target_only_is_untouched() {
        let a = addr("10.0.0.1", "a.example.net", "x");
        let b = addr("10.0.0.2", "b.example.net", "x");

        let diff = Diff::compute(
            &inventory(vec![a.clone(), b.clone()]),
            &inventory(vec![a.clone()]),
            keep_unmatched(),
            &SyncScope::default(),
        );
        assert_eq!(diff.addresses.count(DiffAction::Create), 1);
        assert_eq!(diff.addresses.count(DiffAction::Delete), 0);

        let diff = Diff::compute(
            &inventory(vec![a.clone()]),
            &inventory(vec![a, b]),
            keep_unmatched(),
            &SyncScope::default(),
        );
        assert_eq!(diff.addresses.count(DiffAction::Delete), 0);
        assert_eq!(diff.addresses.unmatched, 1);
        assert_eq!(diff.differences(), 0);
    }

    #[test]
    fn delete_unmatched_plans_deletes() {
        let a = addr("10.0.0.1", "a.example.net", "x");
        let b = addr("10.0.0.2", "b.example.net", "x");
        let flags = SyncFlags {
            delete_unmatched: true,
            ..SyncFlags::default()
        };
        let diff = Diff::compute(
            &inventory(vec![a.clone()]),
            &inventory(vec![a, b]),
            flags,
            &SyncScope::default(),
        );
        assert_eq!(diff.addresses.count(DiffAction::Delete), 1);
        assert_eq!(diff.rows()[0].key, "10.0.0.2");
    }

    #[test]
    fn domain_scope_only_deletes_suffix_matches() {
        let kept = addr("10.0.0.1", "a.example.net", "x");
        let stale = addr("10.0.0.2", "gone.example.net", "x");
        let lookalike = addr("10.0.0.3", "host.example.net.other.org", "x");
        let flags = SyncFlags {
            delete_unmatched: true,
            ..SyncFlags::default()
        };
        let scope = SyncScope::parse(None, Some("example.net"), true, true).unwrap();

        let diff = Diff::compute(
            &inventory(vec![kept.clone()]),
            &inventory(vec![kept, stale, lookalike]),
            flags,
            &scope,
        );
        let deleted: Vec<_> = diff.rows().into_iter().map(|r| r.key).collect();
        assert_eq!(deleted, ["10.0.0.2"]);
        assert_eq!(diff.addresses.unmatched, 1);
    }

    #[test]
    fn domain_scope_never_deletes_prefixes() {
        let flags = SyncFlags {
            delete_unmatched: true,
            ..SyncFlags::default()
        };
        let target = Inventory {
            prefixes: [Prefix::new("10.0.0.0/24".parse().unwrap())]
                .into_iter()
                .collect(),
            ..Inventory::default()
        };
        let scope = SyncScope::parse(None, Some("example.net"), true, true).unwrap();
        let diff = Diff::compute(&Inventory::default(), &target, flags, &scope);
        assert_eq!(diff.prefixes.count(DiffAction::Delete), 0);
    }

    #[test]
    fn cidr_scope_only_deletes_queried_hosts() {
        let flags = SyncFlags {
            delete_unmatched: true,
            ..SyncFlags::default()
        };
        let scope = SyncScope::parse(Some("10.0.0.0/30"), None, true, true).unwrap();
        let target = inventory(vec![
            addr("10.0.0.0", "net.example.net", "x"),
            addr("10.0.0.2", "gone.example.net", "x"),
            addr("10.0.0.3", "bcast.example.net", "x"),
        ]);

        let diff = Diff::compute(&Inventory::default(), &target, flags, &scope);
        let deleted: Vec<_> = diff.rows().into_iter().map(|r| r.key).collect();
        assert_eq!(deleted, ["10.0.0.2"]);
        assert_eq!(diff.addresses.unmatched, 2);
    }

    #[test]
    fn excluded_source_prefixes_are_never_deleted() {
        let flags = SyncFlags {
            delete_unmatched: true,
            ..SyncFlags::default()
        };
        let container: PrefixKey = "10.0.0.0/16".parse().unwrap();
        let source = Inventory {
            excluded_prefixes: [container].into_iter().collect(),
            ..Inventory::default()
        };
        let target = Inventory {
            prefixes: [Prefix::new(container), Prefix::new("10.1.0.0/24".parse().unwrap())]
                .into_iter()
                .collect(),
            ..Inventory::default()
        };

        let diff = Diff::compute(&source, &target, flags, &SyncScope::default());
        let deleted: Vec<_> = diff.rows().into_iter().map(|r| r.key).collect();
        assert_eq!(deleted, ["10.1.0.0/24"]);
        assert_eq!(diff.prefixes.unmatched, 1);
    }

    #[test]
    fn rows_describe_creates() {
        let source = inventory(vec![addr("10.0.0.1", "a.example.net", "x")]);
        let diff = Diff::compute(&source, &Inventory::default(), keep_unmatched(), &SyncScope::default());
        let row = &diff.rows()[0];
        assert_eq!(row.action, DiffAction::Create);
        assert_eq!(row.kind, ModelKind::Address);
        assert_eq!(row.changes["dns_name"], "a.example.net");
        assert_eq!(row.changes["prefix_length"], "24");
    }
}
