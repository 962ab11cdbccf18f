//! Sync engine between SOLIDserver (source of truth) and Nautobot.
//!
//! - **[`SourceAdapter`]** fetches raw SOLIDserver records for a
//!   [`SyncScope`] and runs them through the [`normalize`] functions.
//! - **[`TargetAdapter`]** loads the target side from any
//!   [`InventoryStore`] and applies the target's lifecycle rules to every
//!   create, update, and delete.
//! - **[`reconcile`]** diffs the two sides and applies the plan,
//!   continue-on-failure.
//! - **[`SyncJob`]** drives one run end to end inside a `sync_job` span.

pub mod config;
pub mod error;
pub mod job;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod scope;
pub mod source;
pub mod store;
pub mod target;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{NautobotConfig, SolidServerConfig, TlsVerification};
pub use error::{CoreError, StoreError};
pub use job::{JobParams, JobReport, SyncJob};
pub use model::{
    Address, AddressChanges, ExternalId, Lookup, ModelKind, Outcome, Prefix, PrefixChanges,
    PrefixKey, Status,
};
pub use reconcile::{Diff, DiffAction, DiffRow, SyncFlags, SyncSummary};
pub use scope::SyncScope;
pub use source::SourceAdapter;
pub use store::{Inventory, InventoryStore, MemoryInventory, NautobotInventory};
pub use target::{EntityRepository, TargetAdapter};
