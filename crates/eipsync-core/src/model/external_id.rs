// ── Link to a SOLIDserver record ──

use std::fmt;

use serde::{Serialize, Serializer};

/// Value written to the target when a record has no SOLIDserver link.
pub const UNLINKED_SENTINEL: &str = "-1";

/// Values that, on read, mean "no linked SOLIDserver record".
const UNLINKED_VALUES: &[&str] = &["", "-1", "0", "not found", "unassigned", "none", "null"];

/// The SOLIDserver record identifier a target record is linked to.
///
/// Both systems carry a zoo of "nothing here" spellings; they all collapse
/// to `Unlinked` on parse so that two sentinel spellings never diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ExternalId {
    Linked(String),
    #[default]
    Unlinked,
}

impl ExternalId {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if UNLINKED_VALUES
            .iter()
            .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
        {
            Self::Unlinked
        } else {
            Self::Linked(trimmed.to_owned())
        }
    }

    /// Parse an optional raw value; `None` is `Unlinked`.
    pub fn from_option(raw: Option<&str>) -> Self {
        raw.map_or(Self::Unlinked, Self::parse)
    }

    pub fn is_linked(&self) -> bool {
        matches!(self, Self::Linked(_))
    }

    /// The string stored in the target's custom field.
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Linked(id) => id,
            Self::Unlinked => UNLINKED_SENTINEL,
        }
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl Serialize for ExternalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_spellings_are_unlinked() {
        for raw in ["", "-1", "0", "Not Found", "unassigned", " none "] {
            assert_eq!(ExternalId::parse(raw), ExternalId::Unlinked, "raw {raw:?}");
        }
        assert_eq!(ExternalId::from_option(None), ExternalId::Unlinked);
    }

    #[test]
    fn real_ids_are_linked_and_trimmed() {
        assert_eq!(ExternalId::parse(" 1234 "), ExternalId::Linked("1234".into()));
        assert!(ExternalId::parse("1234").is_linked());
    }

    #[test]
    fn unlinked_writes_sentinel() {
        assert_eq!(ExternalId::Unlinked.as_wire(), "-1");
        assert_eq!(ExternalId::Linked("7".into()).to_string(), "7");
    }
}
