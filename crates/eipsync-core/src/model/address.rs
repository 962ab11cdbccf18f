use std::net::IpAddr;

use serde::Serialize;

use super::{ChangeSet, ExternalId, ModelKind, Status, SyncModel};

/// A single host address, identified by its IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub host: IpAddr,
    pub dns_name: String,
    pub description: String,
    pub external_id: ExternalId,
    /// Mask length of the enclosing network, when known.
    pub prefix_length: Option<u8>,
    /// Target-side lifecycle status; `None` for source records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl Address {
    pub fn new(host: IpAddr) -> Self {
        Self {
            host,
            dns_name: String::new(),
            description: String::new(),
            external_id: ExternalId::Unlinked,
            prefix_length: None,
            status: None,
        }
    }

    /// Mask length to write on create: the known one, else a host route.
    pub fn effective_prefix_length(&self) -> u8 {
        self.prefix_length.unwrap_or(match self.host {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        })
    }
}

/// Partial update for an [`Address`]. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<ExternalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_length: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl AddressChanges {
    /// `true` when the only thing set is a status.
    pub fn is_status_only(&self) -> bool {
        self.status.is_some()
            && self.dns_name.is_none()
            && self.description.is_none()
            && self.external_id.is_none()
            && self.prefix_length.is_none()
    }
}

impl ChangeSet for AddressChanges {
    fn is_empty(&self) -> bool {
        self.dns_name.is_none()
            && self.description.is_none()
            && self.external_id.is_none()
            && self.prefix_length.is_none()
            && self.status.is_none()
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(name) = &self.dns_name {
            fields.push(("dns_name", name.clone()));
        }
        if let Some(description) = &self.description {
            fields.push(("description", description.clone()));
        }
        if let Some(id) = &self.external_id {
            fields.push(("external_id", id.to_string()));
        }
        if let Some(len) = self.prefix_length {
            fields.push(("prefix_length", len.to_string()));
        }
        if let Some(status) = &self.status {
            fields.push(("status", status.to_string()));
        }
        fields
    }
}

impl SyncModel for Address {
    type Key = IpAddr;
    type Changes = AddressChanges;

    const KIND: ModelKind = ModelKind::Address;

    fn key(&self) -> IpAddr {
        self.host
    }

    fn changes_from(&self, target: &Self) -> Option<AddressChanges> {
        let mut changes = AddressChanges::default();
        if self.dns_name != target.dns_name {
            changes.dns_name = Some(self.dns_name.clone());
        }
        if self.description != target.description {
            changes.description = Some(self.description.clone());
        }
        if self.external_id != target.external_id {
            changes.external_id = Some(self.external_id.clone());
        }
        // An unknown source length never overwrites a known target one.
        if self.prefix_length.is_some() && self.prefix_length != target.prefix_length {
            changes.prefix_length = self.prefix_length;
        }
        (!changes.is_empty()).then_some(changes)
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("dns_name", self.dns_name.clone()),
            ("description", self.description.clone()),
            ("external_id", self.external_id.to_string()),
            ("prefix_length", self.effective_prefix_length().to_string()),
        ]
    }
}
