//! Classification and status enums for inventory lines.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Label the backend uses for a pallet not assigned to any client.
pub const UNASSIGNED_LABEL: &str = "Sin asignar";

/// Box-size bucket a pallet's contents are classified into.
///
/// Known sizes sort by [`BoxType::PRIORITY`]; labels outside that list are
/// kept verbatim in [`BoxType::Other`] and sort after the known sizes,
/// lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BoxType {
    Xl,
    L,
    M,
    S,
    Xs,
    Other(String),
}

impl BoxType {
    /// Display and chart order for the known sizes, largest first.
    pub const PRIORITY: [Self; 5] = [Self::Xl, Self::L, Self::M, Self::S, Self::Xs];

    /// Label as the backend spells it.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Xl => "XL",
            Self::L => "L",
            Self::M => "M",
            Self::S => "S",
            Self::Xs => "XS",
            Self::Other(label) => label,
        }
    }

    /// Position in [`BoxType::PRIORITY`], `None` for unknown labels.
    #[must_use]
    pub fn priority(&self) -> Option<usize> {
        Self::PRIORITY.iter().position(|known| known == self)
    }
}

impl Ord for BoxType {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.priority(), other.priority()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.label().cmp(other.label()),
        }
    }
}

impl PartialOrd for BoxType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for BoxType {
    fn from(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "XL" => Self::Xl,
            "L" => Self::L,
            "M" => Self::M,
            "S" => Self::S,
            "XS" => Self::Xs,
            _ => Self::Other(label.trim().to_owned()),
        }
    }
}

impl From<String> for BoxType {
    fn from(label: String) -> Self {
        Self::from(label.as_str())
    }
}

impl From<BoxType> for String {
    fn from(box_type: BoxType) -> Self {
        match box_type {
            BoxType::Other(label) => label,
            known => known.label().to_owned(),
        }
    }
}

/// Which client, if any, a pallet is committed to.
///
/// On the wire this is a plain string: the client's name, or
/// [`UNASSIGNED_LABEL`]. An empty string or `null` is read as unassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum ClientAssignment {
    #[default]
    Unassigned,
    Client(String),
}

impl ClientAssignment {
    /// Assignment to the named client.
    #[must_use]
    pub fn client(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    /// Whether the pallet is committed to a client.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        matches!(self, Self::Client(_))
    }

    /// Client name or the unassigned label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Unassigned => UNASSIGNED_LABEL,
            Self::Client(name) => name,
        }
    }
}

impl fmt::Display for ClientAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for ClientAssignment {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == UNASSIGNED_LABEL {
            Self::Unassigned
        } else {
            Self::Client(trimmed.to_owned())
        }
    }
}

impl From<Option<String>> for ClientAssignment {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Unassigned, Self::from)
    }
}

impl From<ClientAssignment> for String {
    fn from(value: ClientAssignment) -> Self {
        match value {
            ClientAssignment::Unassigned => UNASSIGNED_LABEL.to_owned(),
            ClientAssignment::Client(name) => name,
        }
    }
}

/// Lifecycle status of a client order as shown next to its pallets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "activo")]
    Active,
    #[serde(rename = "completado")]
    Completed,
    #[serde(rename = "cancelado")]
    Cancelled,
}
