// ── Domain model ──
//
// Plain data entities shared by the source and target sides. Identity and
// attributes only; persistence lives in `store` and `target`.

pub mod address;
pub mod external_id;
pub mod prefix;
pub mod status;

use std::fmt;
use std::hash::Hash;

use serde::Serialize;

pub use address::{Address, AddressChanges};
pub use external_id::{ExternalId, UNLINKED_SENTINEL};
pub use prefix::{Prefix, PrefixChanges, PrefixKey, PrefixKeyError};
pub use status::Status;

/// Which entity type a collection, diff element, or log line refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelKind {
    Address,
    Prefix,
}

/// A partial set of attribute changes for one entity.
pub trait ChangeSet: Clone + fmt::Debug + Default + Serialize + Send + Sync + 'static {
    fn is_empty(&self) -> bool;

    /// `(attribute, new value)` pairs, in a stable order, for reports.
    fn fields(&self) -> Vec<(&'static str, String)>;
}

/// An entity the reconciliation engine can index and diff.
pub trait SyncModel: Clone + fmt::Debug + Serialize + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Ord + fmt::Display + fmt::Debug + Serialize + Send + Sync;
    type Changes: ChangeSet;

    const KIND: ModelKind;

    fn key(&self) -> Self::Key;

    /// The diffed attributes of `self` that differ from `target`, or
    /// `None` when they are all equal.
    fn changes_from(&self, target: &Self) -> Option<Self::Changes>;

    /// `(attribute, value)` pairs describing a record about to be created.
    fn attributes(&self) -> Vec<(&'static str, String)>;
}

/// Result of a routine lookup by natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotFound, Self::Found)
    }
}

/// Result of one create/update/delete against the target.
///
/// Never an error: skipped and failed mutations are counted, logged, and
/// the run continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Applied(T),
    Skipped { reason: String },
    Failed { reason: String },
}

impl<T> Outcome<T> {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}
