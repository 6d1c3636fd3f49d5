//! Audit schedule model.
//!
//! # Invariants
//! - An audit with `date_completed` set is always stored as `completed`.
//! - Document references are unique per `(doc_type, doc_id)`.

use crate::intake::FormData;
use crate::model::record::{require_text, ArchiveView, AuditStamp, RecordId, ValidationError};
use crate::model::user::UserId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl AuditStatus {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Controlled document family an audit covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDocType {
    Procedure,
    Manual,
    Register,
}

impl AuditDocType {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Procedure => "procedure",
            Self::Manual => "manual",
            Self::Register => "register",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "procedure" => Some(Self::Procedure),
            "manual" => Some(Self::Manual),
            "register" => Some(Self::Register),
            _ => None,
        }
    }

    /// Checkbox group name on the audit form.
    fn form_key(self) -> &'static str {
        match self {
            Self::Procedure => "procedures",
            Self::Manual => "manuals",
            Self::Register => "registers",
        }
    }
}

/// Reference to one controlled document in scope of an audit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuditDocumentRef {
    pub doc_type: AuditDocType,
    pub doc_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Audit {
    pub id: RecordId,
    pub title: String,
    pub auditor: Option<UserId>,
    pub external_auditor: Option<String>,
    pub planned_start_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub follow_up_date: Option<NaiveDate>,
    pub date_completed: Option<NaiveDate>,
    pub status: AuditStatus,
    pub documents: Vec<AuditDocumentRef>,
    pub archived: bool,
    pub stamp: AuditStamp,
}

/// Editable fields of an audit plus the optional follow-on scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditInput {
    pub title: String,
    pub auditor: Option<UserId>,
    pub external_auditor: Option<String>,
    pub planned_start_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub follow_up_date: Option<NaiveDate>,
    pub date_completed: Option<NaiveDate>,
    pub status: AuditStatus,
    pub documents: Vec<AuditDocumentRef>,
    /// Planned start of the next audit to schedule, if requested.
    pub next_audit_date: Option<NaiveDate>,
}

impl AuditInput {
    pub fn from_form(form: &FormData) -> Result<Self, ValidationError> {
        let status = match form.optional_text("status") {
            None => AuditStatus::NotStarted,
            Some(raw) => AuditStatus::parse(&raw).ok_or(ValidationError::UnknownOption {
                field: "status",
                value: raw,
            })?,
        };

        let mut documents = Vec::new();
        for doc_type in [
            AuditDocType::Procedure,
            AuditDocType::Manual,
            AuditDocType::Register,
        ] {
            for doc_id in form.get_all(doc_type.form_key()) {
                documents.push(AuditDocumentRef { doc_type, doc_id });
            }
        }
        documents.sort();
        documents.dedup();

        let next_audit_date = if form.flag("createNextAudit") {
            Some(form.required_date("nextAuditDate")?)
        } else {
            None
        };

        let input = Self {
            title: form.required_text("title")?,
            auditor: form.optional_uuid("auditorId")?,
            external_auditor: form.optional_text("externalAuditor"),
            planned_start_date: form.optional_date("plannedStartDate")?,
            actual_start_date: form.optional_date("actualStartDate")?,
            follow_up_date: form.optional_date("followUpDate")?,
            date_completed: form.optional_date("dateCompleted")?,
            status,
            documents,
            next_audit_date,
        };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)
    }

    /// Status written to storage: completion date wins over the chosen status.
    pub fn resolved_status(&self) -> AuditStatus {
        if self.date_completed.is_some() {
            AuditStatus::Completed
        } else {
            self.status
        }
    }

    /// Input for the follow-on audit, when one was requested.
    pub fn next_audit(&self) -> Option<AuditInput> {
        self.next_audit_date.map(|planned| AuditInput {
            title: self.title.clone(),
            auditor: self.auditor,
            external_auditor: self.external_auditor.clone(),
            planned_start_date: Some(planned),
            actual_start_date: None,
            follow_up_date: None,
            date_completed: None,
            status: AuditStatus::NotStarted,
            documents: self.documents.clone(),
            next_audit_date: None,
        })
    }
}

/// Audit schedule filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditListQuery {
    pub view: ArchiveView,
    pub status: Option<AuditStatus>,
}

#[cfg(test)]
mod tests {
    use super::{AuditDocType, AuditInput, AuditStatus};
    use crate::intake::FormData;
    use chrono::NaiveDate;

    #[test]
    fn from_form_collects_document_groups() {
        let form = FormData::new()
            .with("title", "ISO 9001 internal audit")
            .with("procedures", "Procedure No 1 Planning & Review")
            .with("registers", "Legal Register")
            .with("registers", "Legal Register")
            .with("manuals", "Integrated Manual");
        let input = AuditInput::from_form(&form).unwrap();
        assert_eq!(input.documents.len(), 3);
        assert_eq!(input.documents[0].doc_type, AuditDocType::Procedure);
        assert_eq!(input.status, AuditStatus::NotStarted);
        assert!(input.next_audit().is_none());
    }

    #[test]
    fn completion_date_forces_completed_status() {
        let form = FormData::new()
            .with("title", "Warehouse audit")
            .with("status", "in_progress")
            .with("dateCompleted", "2026-04-02");
        let input = AuditInput::from_form(&form).unwrap();
        assert_eq!(input.status, AuditStatus::InProgress);
        assert_eq!(input.resolved_status(), AuditStatus::Completed);
    }

    #[test]
    fn create_next_audit_requires_date_and_copies_scope() {
        let form = FormData::new()
            .with("title", "Supplier audit")
            .with("createNextAudit", "on");
        assert!(AuditInput::from_form(&form).is_err());

        let form = form
            .with("nextAuditDate", "2027-01-15")
            .with("procedures", "Procedure No 6 Supplier & Contractor Control");
        let input = AuditInput::from_form(&form).unwrap();
        let next = input.next_audit().unwrap();
        assert_eq!(next.title, "Supplier audit");
        assert_eq!(next.planned_start_date, NaiveDate::from_ymd_opt(2027, 1, 15));
        assert_eq!(next.documents, input.documents);
        assert!(next.next_audit().is_none());
    }
}
