//! Event record data structure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One normalized event listing.
///
/// Every field is optional: `None` means the page did not show it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Stable identifier, container prefix stripped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Raw badge text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_kind: Option<StatusKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_flag: Option<String>,

    #[serde(default, skip_serializing_if = "EventLinks::is_empty")]
    pub links: EventLinks,
}

impl EventRecord {
    /// Number of populated top-level fields.
    pub fn field_count(&self) -> usize {
        [
            self.id.is_some(),
            self.name.is_some(),
            self.date_range.is_some(),
            self.organization.is_some(),
            self.club.is_some(),
            self.location.is_some(),
            self.status.is_some(),
            self.status_kind.is_some(),
            self.country_flag.is_some(),
            !self.links.is_empty(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }

    /// Name for log lines.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("<unnamed>")
    }
}

/// Absolute links attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<String>,
}

impl EventLinks {
    pub fn is_empty(&self) -> bool {
        self.info.is_none() && self.participants.is_none() && self.runs.is_none()
    }
}

/// Classification of the status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Finished,
    Unknown,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusKind::Finished => write!(f, "finished"),
            StatusKind::Unknown => write!(f, "unknown"),
        }
    }
}
