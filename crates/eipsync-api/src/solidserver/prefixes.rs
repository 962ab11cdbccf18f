// SOLIDserver subnet (prefix) endpoints

use tracing::debug;

use super::models::{Ip4SubnetRecord, Ip6SubnetRecord, RawRecord};
use super::{IpVersion, Service, SolidServerClient};
use crate::Error;

impl SolidServerClient {
    /// Every subnet record of one IP version.
    pub async fn list_prefixes(&self, version: IpVersion) -> Result<Vec<RawRecord>, Error> {
        let service = Service::subnet_list(version);
        let records: Vec<RawRecord> = match version {
            IpVersion::V4 => self
                .list_all::<Ip4SubnetRecord>(service, None)
                .await?
                .into_iter()
                .map(RawRecord::PrefixV4)
                .collect(),
            IpVersion::V6 => self
                .list_all::<Ip6SubnetRecord>(service, None)
                .await?
                .into_iter()
                .map(RawRecord::PrefixV6)
                .collect(),
        };
        debug!(%version, count = records.len(), "prefixes fetched");
        Ok(records)
    }

    /// One subnet by its SOLIDserver id.
    ///
    /// Returns `Ok(None)` when the id is unknown; SOLIDserver signals that
    /// with 204, an empty list, 400, or 404 depending on version.
    pub async fn prefix_by_id(
        &self,
        version: IpVersion,
        id: &str,
    ) -> Result<Option<RawRecord>, Error> {
        let service = Service::subnet_info(version);
        let result = match version {
            IpVersion::V4 => self
                .get_list::<Ip4SubnetRecord>(service, &[("subnet_id", id.to_owned())])
                .await
                .map(|rows| rows.into_iter().next().map(RawRecord::PrefixV4)),
            IpVersion::V6 => self
                .get_list::<Ip6SubnetRecord>(service, &[("subnet6_id", id.to_owned())])
                .await
                .map(|rows| rows.into_iter().next().map(RawRecord::PrefixV6)),
        };

        match result {
            Err(e) if e.is_not_found() || e.is_validation() => {
                debug!(%version, id, "prefix id not known to SOLIDserver");
                Ok(None)
            }
            other => other,
        }
    }
}
