//! Shared record vocabulary for every register.
//!
//! # Responsibility
//! - Identify registers (`RecordKind`) together with their storage table,
//!   user-facing label and page routes.
//! - Define audit stamps, the request-scoped archive view and the shared
//!   validation error.
//!
//! # Invariants
//! - Every register record is identified by a stable UUID `RecordId`.
//! - Archived records stay in storage; only hard delete removes them.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for register records.
pub type RecordId = Uuid;

/// The six registers sharing the CRUD + archive lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    InterestedParty,
    OrganizationalContext,
    Improvement,
    MaintenanceItem,
    Audit,
    LegalRegister,
}

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        RecordKind::InterestedParty,
        RecordKind::OrganizationalContext,
        RecordKind::Improvement,
        RecordKind::MaintenanceItem,
        RecordKind::Audit,
        RecordKind::LegalRegister,
    ];

    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InterestedParty => "interested_party",
            Self::OrganizationalContext => "organizational_context",
            Self::Improvement => "improvement",
            Self::MaintenanceItem => "maintenance_item",
            Self::Audit => "audit",
            Self::LegalRegister => "legal_register",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }

    /// Backing SQLite table.
    pub fn table(self) -> &'static str {
        match self {
            Self::InterestedParty => "interested_parties",
            Self::OrganizationalContext => "organizational_context",
            Self::Improvement => "improvements",
            Self::MaintenanceItem => "maintenance_items",
            Self::Audit => "audits",
            Self::LegalRegister => "legal_register",
        }
    }

    /// Human label used in action messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::InterestedParty => "interested party",
            Self::OrganizationalContext => "organizational context entry",
            Self::Improvement => "improvement",
            Self::MaintenanceItem => "maintenance item",
            Self::Audit => "audit",
            Self::LegalRegister => "legal register entry",
        }
    }

    /// List page route invalidated after every mutation.
    pub fn list_route(self) -> &'static str {
        match self {
            Self::InterestedParty => "/interested-parties",
            Self::OrganizationalContext => "/organisational-context",
            Self::Improvement => "/improvement-register",
            Self::MaintenanceItem => "/maintenance",
            Self::Audit => "/audit-schedule",
            Self::LegalRegister => "/legal-register",
        }
    }

    /// Detail page route, invalidated after updates.
    pub fn detail_route(self, id: RecordId) -> String {
        format!("{}/{id}", self.list_route())
    }

    /// Whether non-archived records of this kind carry an order key.
    pub fn is_ordered(self) -> bool {
        matches!(self, Self::InterestedParty)
    }

    /// View used when the page asks to show archived records.
    ///
    /// The improvement register swaps to archived-only; the other registers
    /// show archived rows alongside active ones.
    pub fn shown_archive_view(self) -> ArchiveView {
        match self {
            Self::Improvement => ArchiveView::Archived,
            _ => ArchiveView::All,
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which archive state a list request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveView {
    /// Non-archived rows only (default page view).
    #[default]
    Active,
    /// Archived rows only.
    Archived,
    /// Both.
    All,
}

impl ArchiveView {
    /// Resolves a `showArchived` query value for one register.
    pub fn from_show_archived(kind: RecordKind, value: Option<&str>) -> Self {
        match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
            Some("true" | "1" | "on" | "yes") => kind.shown_archive_view(),
            _ => Self::Active,
        }
    }

    /// Next view for a "show/hide archived" control on `kind`'s page.
    pub fn toggled(self, kind: RecordKind) -> Self {
        match self {
            Self::Active => kind.shown_archive_view(),
            Self::Archived | Self::All => Self::Active,
        }
    }

    pub fn includes(self, archived: bool) -> bool {
        match self {
            Self::Active => !archived,
            Self::Archived => archived,
            Self::All => true,
        }
    }
}

/// Completion filter for registers with a done state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionFilter {
    #[default]
    All,
    /// Not yet completed (`pending` on the maintenance page).
    Open,
    Completed,
}

impl CompletionFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Some(Self::All),
            "open" | "pending" => Some(Self::Open),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn includes(self, completed: bool) -> bool {
        match self {
            Self::All => true,
            Self::Open => !completed,
            Self::Completed => completed,
        }
    }
}

/// Creation/update attribution carried by every register record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    pub created_by: UserId,
    pub updated_by: Option<UserId>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Input/model validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field missing or blank after trim.
    BlankField(&'static str),
    /// Likelihood/severity outside `1..=5`.
    RatingOutOfRange { field: &'static str, value: i64 },
    /// Value is not one of the register's known options.
    UnknownOption { field: &'static str, value: String },
    /// Field present but malformed.
    InvalidField { field: &'static str, reason: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "`{field}` is required"),
            Self::RatingOutOfRange { field, value } => {
                write!(f, "`{field}` must be between 1 and 5, got {value}")
            }
            Self::UnknownOption { field, value } => {
                write!(f, "`{field}` has unknown value `{value}`")
            }
            Self::InvalidField { field, reason } => write!(f, "`{field}` is invalid: {reason}"),
        }
    }
}

impl Error for ValidationError {}

/// Rejects blank text for a required field.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}

/// Checks `value` against a fixed option list.
pub(crate) fn require_option(
    field: &'static str,
    value: &str,
    options: &[&str],
) -> Result<(), ValidationError> {
    if options.contains(&value) {
        return Ok(());
    }
    Err(ValidationError::UnknownOption {
        field,
        value: value.to_string(),
    })
}
