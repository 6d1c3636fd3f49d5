//! Improvement register model (non-conformances and opportunities).
//!
//! # Invariants
//! - `number` is the report reference: unique and assigned by storage as
//!   `max(number) + 1`.
//! - `category` and `root_cause_type` are drawn from fixed option lists.
//! - An improvement is completed exactly when `date_completed` is set.

use crate::intake::FormData;
use crate::model::record::{
    require_option, require_text, ArchiveView, AuditStamp, CompletionFilter, RecordId,
    ValidationError,
};
use crate::model::user::UserId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const IMPROVEMENT_CATEGORIES: &[&str] = &[
    "Accident",
    "Complaint",
    "Environment",
    "External Audit",
    "Goods Damaged in Transit",
    "Health and Safety",
    "Improvement Suggestion",
    "Information Security",
    "Installation Issue",
    "Internal Audit",
    "Management Review",
    "Near Miss",
    "Process Issue",
    "Safeguarding",
    "Supplier Defect",
];

pub const ROOT_CAUSE_TYPES: &[&str] = &[
    "Materials",
    "Machinery",
    "Location",
    "Human Error",
    "Management Error",
    "Lack of Control Procedure",
    "Software",
    "Information Security",
];

/// Severity class of an improvement report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementType {
    /// Opportunity for improvement.
    Ofi,
    NonConformance,
    MajorNonConformance,
}

impl ImprovementType {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Ofi => "ofi",
            Self::NonConformance => "non_conformance",
            Self::MajorNonConformance => "major_non_conformance",
        }
    }

    /// Label as shown on the register page.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ofi => "OFI",
            Self::NonConformance => "Non Conformance",
            Self::MajorNonConformance => "Major Non Conformance",
        }
    }

    /// Accepts either the storage value or the page label.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        [Self::Ofi, Self::NonConformance, Self::MajorNonConformance]
            .into_iter()
            .find(|kind| kind.as_db() == trimmed || kind.label().eq_ignore_ascii_case(trimmed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Improvement {
    pub id: RecordId,
    pub number: i64,
    pub category: String,
    pub improvement_type: ImprovementType,
    pub description: String,
    pub root_cause_type: Option<String>,
    pub corrective_action: Option<String>,
    pub internal_owner: Option<UserId>,
    pub external_owner: Option<String>,
    pub date_raised: NaiveDate,
    pub date_due: Option<NaiveDate>,
    pub date_completed: Option<NaiveDate>,
    pub archived: bool,
    pub stamp: AuditStamp,
}

impl Improvement {
    pub fn is_completed(&self) -> bool {
        self.date_completed.is_some()
    }
}

/// Editable fields of an improvement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImprovementInput {
    pub category: String,
    pub improvement_type: ImprovementType,
    pub description: String,
    pub root_cause_type: Option<String>,
    pub corrective_action: Option<String>,
    pub internal_owner: Option<UserId>,
    pub external_owner: Option<String>,
    pub date_raised: NaiveDate,
    pub date_due: Option<NaiveDate>,
    pub date_completed: Option<NaiveDate>,
}

impl ImprovementInput {
    pub fn from_form(form: &FormData) -> Result<Self, ValidationError> {
        let type_text = form.required_text("type")?;
        let improvement_type =
            ImprovementType::parse(&type_text).ok_or(ValidationError::UnknownOption {
                field: "type",
                value: type_text,
            })?;

        let input = Self {
            category: form.required_text("category")?,
            improvement_type,
            description: form.required_text("description")?,
            root_cause_type: form.optional_text("rootCauseType"),
            corrective_action: form.optional_text("correctiveAction"),
            internal_owner: form.optional_uuid("internalOwnerId")?,
            external_owner: form.optional_text("externalOwner"),
            date_raised: form.required_date("dateRaised")?,
            date_due: form.optional_date("dateDue")?,
            date_completed: form.optional_date("dateCompleted")?,
        };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_option("category", &self.category, IMPROVEMENT_CATEGORIES)?;
        require_text("description", &self.description)?;
        if let Some(root_cause) = &self.root_cause_type {
            require_option("rootCauseType", root_cause, ROOT_CAUSE_TYPES)?;
        }
        Ok(())
    }
}

/// Register page filters; `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImprovementListQuery {
    pub view: ArchiveView,
    pub completion: CompletionFilter,
    pub category: Option<String>,
    pub improvement_type: Option<ImprovementType>,
    pub root_cause_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{ImprovementInput, ImprovementType};
    use crate::intake::FormData;
    use crate::model::record::ValidationError;

    fn base_form() -> FormData {
        FormData::new()
            .with("category", "Near Miss")
            .with("type", "Non Conformance")
            .with("description", "Pallet stacked above rated height")
            .with("dateRaised", "2026-01-12")
    }

    #[test]
    fn from_form_parses_type_label_and_dates() {
        let input = ImprovementInput::from_form(&base_form().with("dateDue", "2026-02-01")).unwrap();
        assert_eq!(input.improvement_type, ImprovementType::NonConformance);
        assert!(input.date_due.is_some());
        assert!(input.date_completed.is_none());
    }

    #[test]
    fn from_form_rejects_unknown_category_and_root_cause() {
        let err = ImprovementInput::from_form(&base_form().with("rootCauseType", "Weather"))
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnknownOption {
                field: "rootCauseType",
                ..
            }
        ));

        let form = FormData::new()
            .with("category", "Gossip")
            .with("type", "OFI")
            .with("description", "x")
            .with("dateRaised", "2026-01-12");
        assert!(ImprovementInput::from_form(&form).is_err());
    }

    #[test]
    fn type_parse_accepts_storage_and_label() {
        assert_eq!(ImprovementType::parse("ofi"), Some(ImprovementType::Ofi));
        assert_eq!(
            ImprovementType::parse("major non conformance"),
            Some(ImprovementType::MajorNonConformance)
        );
        assert_eq!(ImprovementType::parse("minor"), None);
    }
}
