use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;
use serde::{Serialize, Serializer};

use super::{ChangeSet, ExternalId, ModelKind, Status, SyncModel};

/// Natural key of a prefix: network address plus length.
///
/// Always canonical (host bits cleared), so `10.0.0.7/24` and `10.0.0.0/24`
/// are the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefixKey {
    pub network: IpAddr,
    pub length: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid prefix {input}: {reason}")]
pub struct PrefixKeyError {
    pub input: String,
    pub reason: String,
}

impl PrefixKey {
    pub fn new(addr: IpAddr, length: u8) -> Result<Self, PrefixKeyError> {
        let net = IpNetwork::new(addr, length).map_err(|e| PrefixKeyError {
            input: format!("{addr}/{length}"),
            reason: e.to_string(),
        })?;
        Ok(Self::from(net))
    }

    pub fn to_network(self) -> IpNetwork {
        match IpNetwork::new(self.network, self.length) {
            Ok(net) => net,
            // Unreachable for keys built through `new`/`from`.
            Err(_) => IpNetwork::from(self.network),
        }
    }

    /// `0.0.0.0/32` and `::/128`: an unspecified host posing as a network.
    pub fn is_degenerate(self) -> bool {
        self.network.is_unspecified() && self.length == max_length(self.network)
    }

    /// `true` when this prefix lies entirely inside `outer`.
    pub fn is_within(self, outer: IpNetwork) -> bool {
        self.network.is_ipv4() == outer.is_ipv4()
            && self.length >= outer.prefix()
            && outer.contains(self.network)
    }
}

impl From<IpNetwork> for PrefixKey {
    fn from(net: IpNetwork) -> Self {
        Self {
            network: net.network(),
            length: net.prefix(),
        }
    }
}

impl FromStr for PrefixKey {
    type Err = PrefixKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let net = s.trim().parse::<IpNetwork>().map_err(|e| PrefixKeyError {
            input: s.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self::from(net))
    }
}

impl fmt::Display for PrefixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.length)
    }
}

impl Serialize for PrefixKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub(crate) fn max_length(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// A terminal network block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prefix {
    pub key: PrefixKey,
    pub description: String,
    pub external_id: ExternalId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl Prefix {
    pub fn new(key: PrefixKey) -> Self {
        Self {
            key,
            description: String::new(),
            external_id: ExternalId::Unlinked,
            status: None,
        }
    }
}

/// Partial update for a [`Prefix`]. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrefixChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<ExternalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl PrefixChanges {
    pub fn is_status_only(&self) -> bool {
        self.status.is_some() && self.description.is_none() && self.external_id.is_none()
    }
}

impl ChangeSet for PrefixChanges {
    fn is_empty(&self) -> bool {
        self.description.is_none() && self.external_id.is_none() && self.status.is_none()
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(description) = &self.description {
            fields.push(("description", description.clone()));
        }
        if let Some(id) = &self.external_id {
            fields.push(("external_id", id.to_string()));
        }
        if let Some(status) = &self.status {
            fields.push(("status", status.to_string()));
        }
        fields
    }
}

impl SyncModel for Prefix {
    type Key = PrefixKey;
    type Changes = PrefixChanges;

    const KIND: ModelKind = ModelKind::Prefix;

    fn key(&self) -> PrefixKey {
        self.key
    }

    fn changes_from(&self, target: &Self) -> Option<PrefixChanges> {
        let mut changes = PrefixChanges::default();
        if self.description != target.description {
            changes.description = Some(self.description.clone());
        }
        if self.external_id != target.external_id {
            changes.external_id = Some(self.external_id.clone());
        }
        (!changes.is_empty()).then_some(changes)
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("description", self.description.clone()),
            ("external_id", self.external_id.to_string()),
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_canonicalized() {
        let key: PrefixKey = "10.1.2.3/24".parse().unwrap();
        assert_eq!(key.to_string(), "10.1.2.0/24");
        assert_eq!(key, PrefixKey::new("10.1.2.0".parse().unwrap(), 24).unwrap());
    }

    #[test]
    fn overlong_length_is_rejected() {
        assert!(PrefixKey::new("10.0.0.0".parse().unwrap(), 33).is_err());
        assert!("2001:db8::/129".parse::<PrefixKey>().is_err());
    }

    #[test]
    fn degenerate_networks() {
        assert!("0.0.0.0/32".parse::<PrefixKey>().unwrap().is_degenerate());
        assert!("::/128".parse::<PrefixKey>().unwrap().is_degenerate());
        assert!(!"0.0.0.0/0".parse::<PrefixKey>().unwrap().is_degenerate());
    }

    #[test]
    fn containment_respects_length_and_family() {
        let outer: IpNetwork = "10.0.0.0/16".parse().unwrap();
        assert!("10.0.4.0/24".parse::<PrefixKey>().unwrap().is_within(outer));
        assert!(!"10.0.0.0/8".parse::<PrefixKey>().unwrap().is_within(outer));
        assert!(!"2001:db8::/64".parse::<PrefixKey>().unwrap().is_within(outer));
    }

    #[test]
    fn description_change_is_diffed() {
        let key = "10.0.0.0/24".parse().unwrap();
        let source = Prefix {
            description: "core".into(),
            ..Prefix::new(key)
        };
        let target = Prefix::new(key);
        let changes = source.changes_from(&target).unwrap();
        assert_eq!(changes.fields(), vec![("description", "core".to_owned())]);
    }
}
