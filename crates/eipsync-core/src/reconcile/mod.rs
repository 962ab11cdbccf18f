// ── Reconciliation engine ──
//
// `diff` plans, `apply` executes. Apply is continue-on-failure: each
// entity's mutation commits on its own and a failure only bumps a count.

pub mod diff;

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

pub use diff::{Diff, DiffAction, DiffElement, DiffRow, ModelDiff};

use crate::model::{Address, Outcome, Prefix, SyncModel};
use crate::target::EntityRepository;

/// Policy switches for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncFlags {
    /// Delete target records the source no longer has. Off by default:
    /// the target holds records this job does not own.
    pub delete_unmatched: bool,
    /// Log unchanged records at info instead of staying silent.
    pub log_unchanged: bool,
}

/// Per-action counts for a finished apply phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub unchanged: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncSummary {
    fn record<T>(&mut self, action: DiffAction, outcome: &Outcome<T>) {
        match outcome {
            Outcome::Applied(_) => match action {
                DiffAction::Create => self.created += 1,
                DiffAction::Update => self.updated += 1,
                DiffAction::Delete => self.deleted += 1,
                DiffAction::Unchanged => self.unchanged += 1,
            },
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "create: {}, update: {}, delete: {}, no-change: {}, skip: {}, fail: {}",
            self.created, self.updated, self.deleted, self.unchanged, self.skipped, self.failed
        )
    }
}

/// Execute a planned diff against the target.
///
/// Order: prefix creates and updates, address creates and updates,
/// address deletes, then prefix deletes.
pub async fn apply<R>(diff: &Diff, repo: &R) -> SyncSummary
where
    R: EntityRepository<Address> + EntityRepository<Prefix> + ?Sized,
{
    let mut summary = SyncSummary::default();

    upserts(&diff.prefixes, repo, &mut summary).await;
    upserts(&diff.addresses, repo, &mut summary).await;
    deletes(&diff.addresses, repo, &mut summary).await;
    deletes(&diff.prefixes, repo, &mut summary).await;

    if summary.failed > 0 {
        warn!(failed = summary.failed, "some mutations failed");
    }
    info!(%summary, "sync applied");
    summary
}

async fn upserts<T, R>(diff: &ModelDiff<T>, repo: &R, summary: &mut SyncSummary)
where
    T: SyncModel,
    R: EntityRepository<T> + ?Sized,
{
    for element in &diff.elements {
        match element {
            DiffElement::Create(entity) => {
                let outcome = repo.create(entity).await;
                summary.record(DiffAction::Create, &outcome);
            }
            DiffElement::Update { key, changes } => {
                let outcome = repo.update(key, changes).await;
                summary.record(DiffAction::Update, &outcome);
            }
            DiffElement::Unchanged(_) => summary.unchanged += 1,
            DiffElement::Delete(_) => {}
        }
    }
}

async fn deletes<T, R>(diff: &ModelDiff<T>, repo: &R, summary: &mut SyncSummary)
where
    T: SyncModel,
    R: EntityRepository<T> + ?Sized,
{
    for element in &diff.elements {
        if let DiffElement::Delete(key) = element {
            let outcome = repo.delete(key).await;
            summary.record(DiffAction::Delete, &outcome);
        }
    }
}
