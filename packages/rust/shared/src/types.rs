//! Core domain types shared by the source, target, and pipeline crates.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

/// A project as returned by the time-tracking service.
///
/// Only the fields the sync needs are kept; everything else in the payload
/// is ignored during deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub client_id: u64,
}

/// A client as returned by the time-tracking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: u64,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Target field
// ---------------------------------------------------------------------------

/// One enumerated choice of a dropdown ticket field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Human-readable label.
    pub name: String,
    /// URL/ID-safe slug.
    pub value: String,
}

impl FieldOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The current definition of a ticket field on the ticketing system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Existing options. Target-assigned option ids are dropped on read.
    #[serde(default)]
    pub custom_field_options: Vec<FieldOption>,
}

// ---------------------------------------------------------------------------
// FieldKind
// ---------------------------------------------------------------------------

/// Which of the two synced fields an option list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Client,
    Project,
}

impl FieldKind {
    /// Slug prefix and log label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Project => "project",
        }
    }

    /// The catch-all option appended to every list of this kind.
    pub fn default_option(self) -> FieldOption {
        FieldOption::new("Other", format!("{}-other", self.as_str()))
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
