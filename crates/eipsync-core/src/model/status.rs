// ── Target lifecycle status ──

use std::fmt;

use serde::{Serialize, Serializer};

/// Status label of a target record.
///
/// The first five are the labels this job reads and writes; they must
/// already exist in the target. Anything else a human assigned in the
/// target round-trips as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    /// Freshly created by this job.
    ImportedFromSolidserver,
    Active,
    Unassigned,
    /// SOLIDserver linkage was lost (DNS name or description cleared).
    NoIpamRecord,
    /// Ambiguous update path; see `TargetAdapter::update`.
    Unknown,
    Other(String),
}

impl Status {
    /// Labels this job may assign.
    pub const MANAGED: [Status; 5] = [
        Status::ImportedFromSolidserver,
        Status::Active,
        Status::Unassigned,
        Status::NoIpamRecord,
        Status::Unknown,
    ];

    pub fn label(&self) -> &str {
        match self {
            Self::ImportedFromSolidserver => "Imported From Solidserver",
            Self::Active => "Active",
            Self::Unassigned => "Unassigned",
            Self::NoIpamRecord => "NO-IPAM-RECORD",
            Self::Unknown => "Unknown",
            Self::Other(label) => label,
        }
    }

    /// Case-insensitive match against the managed labels.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        Self::MANAGED
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(trimmed))
            .unwrap_or_else(|| Self::Other(trimmed.to_owned()))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}
