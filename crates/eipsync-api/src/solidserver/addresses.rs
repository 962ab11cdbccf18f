// SOLIDserver address endpoints

use std::net::IpAddr;

use tracing::debug;

use super::models::{Ip4AddressRecord, Ip6AddressRecord, RawRecord};
use super::{IpVersion, Service, SolidServerClient};
use crate::Error;

impl SolidServerClient {
    /// Every address record of one IP version.
    pub async fn list_addresses(&self, version: IpVersion) -> Result<Vec<RawRecord>, Error> {
        self.addresses_where(version, None).await
    }

    /// Server-side count of address records of one IP version.
    pub async fn address_count(&self, version: IpVersion) -> Result<u64, Error> {
        self.count(Service::address_count(version)).await
    }

    /// Address records whose host address equals `ip` exactly.
    pub async fn addresses_by_host(&self, ip: IpAddr) -> Result<Vec<RawRecord>, Error> {
        let clause = format!("hostaddr='{ip}'");
        self.addresses_where(IpVersion::of(&ip), Some(&clause)).await
    }

    /// Address records of both versions whose DNS name ends in `.{domain}`.
    ///
    /// The server evaluates `LIKE '%.domain'`, which may be case-folding
    /// depending on the backing database; results are re-checked by exact
    /// (case-sensitive) suffix.
    pub async fn addresses_by_domain(&self, domain: &str) -> Result<Vec<RawRecord>, Error> {
        let suffix = format!(".{domain}");
        let mut records = Vec::new();

        for version in IpVersion::BOTH {
            let field = match version {
                IpVersion::V4 => "name",
                IpVersion::V6 => "ip6_name",
            };
            let clause = format!("{field} LIKE '%.{domain}'");
            debug!(%version, %clause, "querying addresses by domain");

            let batch = self.addresses_where(version, Some(&clause)).await?;
            records.extend(batch.into_iter().filter(|r| {
                r.dns_name()
                    .is_some_and(|name| name.ends_with(suffix.as_str()))
            }));
        }

        Ok(records)
    }

    async fn addresses_where(
        &self,
        version: IpVersion,
        where_clause: Option<&str>,
    ) -> Result<Vec<RawRecord>, Error> {
        let service = Service::address_list(version);
        let records: Vec<RawRecord> = match version {
            IpVersion::V4 => self
                .list_all::<Ip4AddressRecord>(service, where_clause)
                .await?
                .into_iter()
                .map(RawRecord::AddressV4)
                .collect(),
            IpVersion::V6 => self
                .list_all::<Ip6AddressRecord>(service, where_clause)
                .await?
                .into_iter()
                .map(RawRecord::AddressV6)
                .collect(),
        };
        debug!(%version, count = records.len(), "addresses fetched");
        Ok(records)
    }
}
