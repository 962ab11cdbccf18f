// ── Source adapter: SOLIDserver → entity collections ──
//
// Fetches raw records for a scope, normalizes them, and builds the source
// `Inventory`. Transport failures are fatal for the load, except inside
// the per-host CIDR fan-out and the parent-prefix lookups, where one bad
// query is logged and skipped.

use std::collections::{BTreeSet, HashSet};

use eipsync_api::solidserver::IpVersion;
use eipsync_api::{RawRecord, SolidServerClient};
use futures_util::StreamExt;
use futures_util::stream;
use ipnetwork::IpNetwork;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_MAX_HOST_QUERIES, SolidServerConfig};
use crate::error::CoreError;
use crate::normalize::{self, Entity, ParentRef, Rejection};
use crate::scope::{self, SyncScope};
use crate::store::Inventory;

/// Loads the source side of a run from SOLIDserver.
#[derive(Debug, Clone)]
pub struct SourceAdapter {
    client: SolidServerClient,
    timeout_secs: u64,
    concurrency: usize,
    max_host_queries: u64,
}

impl SourceAdapter {
    pub fn new(client: SolidServerClient, timeout_secs: u64) -> Self {
        Self {
            client,
            timeout_secs,
            concurrency: DEFAULT_CONCURRENCY,
            max_host_queries: DEFAULT_MAX_HOST_QUERIES,
        }
    }

    /// Build the client from connection settings.
    pub fn from_config(config: &SolidServerConfig) -> Result<Self, CoreError> {
        let client = SolidServerClient::new(
            &config.url,
            &config.username,
            &config.password,
            &config.transport(),
        )?
        .with_page_size(config.page_size);
        Ok(Self::new(client, config.timeout.as_secs()))
    }

    /// Upper bound on in-flight per-host and per-parent queries.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_host_queries(mut self, limit: u64) -> Self {
        self.max_host_queries = limit;
        self
    }

    fn translate(&self, err: eipsync_api::Error) -> CoreError {
        CoreError::from(err).with_timeout_secs(self.timeout_secs)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Load every in-scope address and prefix.
    ///
    /// Domain-scoped runs fetch addresses even when only prefixes are
    /// wanted: the prefixes are the parents of the matched addresses.
    pub async fn load(&self, scope: &SyncScope) -> Result<Inventory, CoreError> {
        scope.check_host_budget(self.max_host_queries)?;

        let mut inventory = Inventory::default();
        let mut parents = BTreeSet::new();

        let need_parents = scope.prefixes && !scope.domains.is_empty();
        if scope.addresses || need_parents {
            let raw = self.fetch_addresses(scope).await?;
            info!(records = raw.len(), "source address records fetched");
            for record in &raw {
                if let Some(Entity::Address(address)) = accept(record) {
                    if let Some(parent) = normalize::parent_ref(record) {
                        parents.insert(parent);
                    }
                    if scope.addresses {
                        inventory.addresses.insert(address);
                    }
                }
            }
        }

        if scope.prefixes {
            let raw = self.fetch_prefixes(scope, &parents).await?;
            info!(records = raw.len(), "source prefix records fetched");
            for record in &raw {
                match accept(record) {
                    Some(Entity::Prefix(prefix)) => {
                        inventory.prefixes.insert(prefix);
                    }
                    Some(Entity::Address(_)) => {}
                    None => inventory.excluded_prefixes.extend(normalize::prefix_key(record)),
                }
            }
        }

        info!(
            addresses = inventory.addresses.len(),
            prefixes = inventory.prefixes.len(),
            excluded_prefixes = inventory.excluded_prefixes.len(),
            "source loaded"
        );
        Ok(inventory)
    }

    // ── Addresses ────────────────────────────────────────────────────

    async fn fetch_addresses(&self, scope: &SyncScope) -> Result<Vec<RawRecord>, CoreError> {
        if scope.is_unfiltered() {
            return self.all_addresses().await;
        }

        let mut batches = Vec::new();
        if let Some(cidr) = scope.cidr {
            batches.push(self.addresses_in(cidr).await?);
        }
        for domain in &scope.domains {
            let found = self
                .client
                .addresses_by_domain(domain)
                .await
                .map_err(|e| self.translate(e))?;
            debug!(domain, count = found.len(), "domain query done");
            batches.push(found);
        }
        Ok(merge_unique(batches))
    }

    async fn all_addresses(&self) -> Result<Vec<RawRecord>, CoreError> {
        let mut records = Vec::new();
        for version in IpVersion::BOTH {
            match self.client.address_count(version).await {
                Ok(expected) => info!(%version, expected, "fetching all addresses"),
                Err(e) => debug!(%version, error = %e, "address count unavailable"),
            }
            let batch = self
                .client
                .list_addresses(version)
                .await
                .map_err(|e| self.translate(e))?;
            records.extend(batch);
        }
        Ok(records)
    }

    /// One exact-host query per usable address in `cidr`, `concurrency`
    /// at a time. Fails only when every query failed.
    async fn addresses_in(&self, cidr: IpNetwork) -> Result<Vec<RawRecord>, CoreError> {
        let total = scope::host_count(cidr);
        info!(%cidr, hosts = total, concurrency = self.concurrency, "querying hosts");

        let client = &self.client;
        let mut results = stream::iter(scope::hosts(cidr))
            .map(|host| async move { (host, client.addresses_by_host(host).await) })
            .buffer_unordered(self.concurrency);

        let mut records = Vec::new();
        let mut failures: u128 = 0;
        let mut first_error = None;
        while let Some((host, result)) = results.next().await {
            match result {
                Ok(found) => records.extend(found),
                Err(e) => {
                    warn!(host = %host, error = %e, "host query failed, skipping");
                    failures += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(err) = first_error.filter(|_| failures == total) {
            return Err(self.translate(err));
        }
        if failures > 0 {
            warn!(%cidr, failures, "some host queries failed");
        }
        Ok(records)
    }

    // ── Prefixes ─────────────────────────────────────────────────────

    async fn fetch_prefixes(
        &self,
        scope: &SyncScope,
        parents: &BTreeSet<ParentRef>,
    ) -> Result<Vec<RawRecord>, CoreError> {
        if scope.is_unfiltered() {
            return self.all_prefixes().await;
        }

        let mut batches = Vec::new();
        if let Some(cidr) = scope.cidr {
            // No server-side containment query exists for subnets.
            let within: Vec<RawRecord> = self
                .all_prefixes()
                .await?
                .into_iter()
                .filter(|record| match normalize::prefix_key(record) {
                    Some(key) => scope.contains_prefix(key),
                    None => {
                        debug!(record = %record.label(), "prefix without a usable network");
                        false
                    }
                })
                .collect();
            debug!(%cidr, count = within.len(), "prefixes within filter");
            batches.push(within);
        }
        if !scope.domains.is_empty() {
            batches.push(self.parent_prefixes(parents).await);
        }
        Ok(merge_unique(batches))
    }

    async fn all_prefixes(&self) -> Result<Vec<RawRecord>, CoreError> {
        let mut records = Vec::new();
        for version in IpVersion::BOTH {
            let batch = self
                .client
                .list_prefixes(version)
                .await
                .map_err(|e| self.translate(e))?;
            records.extend(batch);
        }
        Ok(records)
    }

    /// Look up each referenced parent subnet. Missing ids and failed
    /// lookups are logged and skipped.
    async fn parent_prefixes(&self, parents: &BTreeSet<ParentRef>) -> Vec<RawRecord> {
        info!(parents = parents.len(), "fetching parent prefixes");

        let client = &self.client;
        let mut results = stream::iter(parents)
            .map(|parent| async move {
                (parent, client.prefix_by_id(parent.version, &parent.id).await)
            })
            .buffer_unordered(self.concurrency);

        let mut records = Vec::new();
        while let Some((parent, result)) = results.next().await {
            match result {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!(
                    version = %parent.version,
                    id = %parent.id,
                    "parent prefix not found"
                ),
                Err(e) => warn!(
                    version = %parent.version,
                    id = %parent.id,
                    error = %e,
                    "parent prefix lookup failed, skipping"
                ),
            }
        }
        records
    }
}

/// Normalize one record, logging rejections.
fn accept(record: &RawRecord) -> Option<Entity> {
    match normalize::normalize(record) {
        Ok(entity) => Some(entity),
        Err(Rejection::NotTerminal) => {
            debug!(record = %record.label(), "skipping non-terminal block");
            None
        }
        Err(reason) => {
            warn!(record = %record.label(), reason = %reason, "source record rejected");
            None
        }
    }
}

/// Concatenate batches, dropping records already seen in an earlier batch.
fn merge_unique(batches: Vec<Vec<RawRecord>>) -> Vec<RawRecord> {
    if batches.len() == 1 {
        return batches.into_iter().flatten().collect();
    }
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for batch in batches {
        let mut fresh = HashSet::new();
        for record in batch {
            let identity = (
                record.is_address(),
                record.version(),
                record.record_id().map(str::to_owned),
            );
            if !seen.contains(&identity) {
                fresh.insert(identity);
                merged.push(record);
            }
        }
        seen.extend(fresh);
    }
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use eipsync_api::solidserver::models::Ip4AddressRecord;

    fn raw(id: &str, host: &str) -> RawRecord {
        RawRecord::AddressV4(Ip4AddressRecord {
            ip_id: Some(id.into()),
            hostaddr: Some(host.into()),
            name: Some("a.example.net".into()),
            ..Ip4AddressRecord::default()
        })
    }

    #[test]
    fn merge_drops_records_seen_in_earlier_batches() {
        let merged = merge_unique(vec![
            vec![raw("1", "10.0.0.1"), raw("2", "10.0.0.2")],
            vec![raw("2", "10.0.0.2"), raw("3", "10.0.0.3")],
        ]);
        let ids: Vec<_> = merged.iter().filter_map(RawRecord::record_id).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn single_batch_is_passed_through() {
        // Duplicates inside one batch reach the collection, which warns.
        let merged = merge_unique(vec![vec![raw("1", "10.0.0.1"), raw("1", "10.0.0.1")]]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn rejected_records_are_dropped() {
        assert!(accept(&raw("1", "0.0.0.0")).is_none());
        assert!(matches!(accept(&raw("1", "10.0.0.1")), Some(Entity::Address(_))));
    }
}
