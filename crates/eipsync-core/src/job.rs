// ── Job orchestrator ──
//
// Validate → connect → load source → load target → diff → apply. Every
// line logged during a run is inside a `sync_job` span tagged with the
// run id.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::config::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_HOST_QUERIES, DEFAULT_TIMEOUT_SECS, SolidServerConfig,
};
use crate::error::CoreError;
use crate::reconcile::{self, Diff, DiffRow, SyncFlags, SyncSummary};
use crate::scope::SyncScope;
use crate::source::SourceAdapter;
use crate::store::InventoryStore;
use crate::target::TargetAdapter;

/// Parameters of one invocation, as supplied by the scheduler or CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobParams {
    /// Comma-separated domain list; blank means no domain filter.
    pub domains: Option<String>,
    /// `network/length`; blank means no CIDR filter.
    pub cidr: Option<String>,
    pub addresses: bool,
    pub prefixes: bool,
    /// SOLIDserver request timeout.
    pub timeout_secs: u64,
    /// Log every record, including unchanged ones.
    pub debug: bool,
    pub dry_run: bool,
    pub delete_unmatched: bool,
}

impl Default for JobParams {
    fn default() -> Self {
        Self {
            domains: None,
            cidr: None,
            addresses: true,
            prefixes: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            debug: false,
            dry_run: false,
            delete_unmatched: false,
        }
    }
}

impl JobParams {
    /// Validate the scope filters. Runs before any network I/O.
    pub fn scope(&self) -> Result<SyncScope, CoreError> {
        if !self.addresses && !self.prefixes {
            return Err(CoreError::Config {
                message: "nothing to sync: both addresses and prefixes are disabled".into(),
            });
        }
        SyncScope::parse(
            self.cidr.as_deref(),
            self.domains.as_deref(),
            self.addresses,
            self.prefixes,
        )
    }

    fn flags(&self) -> SyncFlags {
        SyncFlags {
            delete_unmatched: self.delete_unmatched,
            log_unchanged: self.debug,
        }
    }
}

/// What a finished run reports back.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub scope: SyncScope,
    /// Creates, updates, and deletes planned.
    pub differences: usize,
    pub rows: Vec<DiffRow>,
    /// Apply-phase counts; absent on a dry run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SyncSummary>,
}

/// A configured sync job, reusable across runs.
#[derive(Debug, Clone)]
pub struct SyncJob {
    source: SolidServerConfig,
    concurrency: usize,
    max_host_queries: u64,
}

impl SyncJob {
    pub fn new(source: SolidServerConfig) -> Self {
        Self {
            source,
            concurrency: DEFAULT_CONCURRENCY,
            max_host_queries: DEFAULT_MAX_HOST_QUERIES,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_host_queries(mut self, limit: u64) -> Self {
        self.max_host_queries = limit;
        self
    }

    /// Run one sync against `store`.
    ///
    /// Parameter errors return before either system is contacted.
    pub async fn run<S>(&self, params: &JobParams, store: &S) -> Result<JobReport, CoreError>
    where
        S: InventoryStore + ?Sized,
    {
        let scope = params.scope()?;
        scope.check_host_budget(self.max_host_queries)?;

        let run_id = Uuid::new_v4();
        let span = info_span!("sync_job", %run_id, dry_run = params.dry_run);
        self.execute(run_id, params, scope, store)
            .instrument(span)
            .await
    }

    async fn execute<S>(
        &self,
        run_id: Uuid,
        params: &JobParams,
        scope: SyncScope,
        store: &S,
    ) -> Result<JobReport, CoreError>
    where
        S: InventoryStore + ?Sized,
    {
        let started_at = Utc::now();
        info!(
            cidr = ?scope.cidr,
            domains = ?scope.domains,
            addresses = scope.addresses,
            prefixes = scope.prefixes,
            "sync started"
        );

        let config = SolidServerConfig {
            timeout: Duration::from_secs(params.timeout_secs),
            ..self.source.clone()
        };
        let source = SourceAdapter::from_config(&config)?
            .with_concurrency(self.concurrency)
            .with_max_host_queries(self.max_host_queries);
        let target = TargetAdapter::new(store);

        info!("loading source");
        let source_inventory = source.load(&scope).await?;
        info!("loading target");
        let target_inventory = target.load(&scope).await?;

        let diff = Diff::compute(&source_inventory, &target_inventory, params.flags(), &scope);
        let differences = diff.differences();
        info!(differences, "differences found");

        let summary = if params.dry_run {
            info!("dry run, no changes applied");
            None
        } else {
            Some(reconcile::apply(&diff, &target).await)
        };

        let report = JobReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            dry_run: params.dry_run,
            rows: diff.rows(),
            scope,
            differences,
            summary,
        };
        info!(
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "sync finished"
        );
        Ok(report)
    }
}
