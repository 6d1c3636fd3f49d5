//! Attachment metadata for maintenance items and audits.
//!
//! Binary content lives in external storage; the core only tracks where it
//! is and who attached it.

use crate::intake::FormData;
use crate::model::record::{require_text, RecordId, RecordKind, ValidationError};
use crate::model::user::UserId;
use serde::Serialize;

/// Record a document is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DocumentOwner {
    MaintenanceItem(RecordId),
    Audit(RecordId),
}

impl DocumentOwner {
    pub fn kind(self) -> RecordKind {
        match self {
            Self::MaintenanceItem(_) => RecordKind::MaintenanceItem,
            Self::Audit(_) => RecordKind::Audit,
        }
    }

    pub fn id(self) -> RecordId {
        match self {
            Self::MaintenanceItem(id) | Self::Audit(id) => id,
        }
    }

    /// Builds an owner from a register kind; only maintenance items and
    /// audits accept attachments.
    pub fn from_kind(kind: RecordKind, id: RecordId) -> Option<Self> {
        match kind {
            RecordKind::MaintenanceItem => Some(Self::MaintenanceItem(id)),
            RecordKind::Audit => Some(Self::Audit(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    pub id: RecordId,
    pub owner: DocumentOwner,
    pub title: String,
    pub file_name: String,
    /// Location in external file storage.
    pub file_url: String,
    pub uploaded_by: UserId,
    /// Epoch milliseconds.
    pub uploaded_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInput {
    pub title: String,
    pub file_name: String,
    pub file_url: String,
}

impl DocumentInput {
    /// Title falls back to the file name when left blank.
    pub fn from_form(form: &FormData) -> Result<Self, ValidationError> {
        let file_name = form.required_text("fileName")?;
        let input = Self {
            title: form.optional_text("title").unwrap_or_else(|| file_name.clone()),
            file_name,
            file_url: form.required_text("fileUrl")?,
        };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("fileName", &self.file_name)?;
        require_text("fileUrl", &self.file_url)
    }
}
