//! Maintenance and calibration schedule model.

use crate::intake::FormData;
use crate::model::record::{
    require_text, ArchiveView, AuditStamp, CompletionFilter, RecordId, ValidationError,
};
use crate::model::user::UserId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Schedule a maintenance item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceKind {
    Maintenance,
    Calibration,
}

impl MaintenanceKind {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Maintenance => "maintenance",
            Self::Calibration => "calibration",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "maintenance" => Some(Self::Maintenance),
            "calibration" => Some(Self::Calibration),
            _ => None,
        }
    }
}

/// Urgency of a due date relative to a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
    Overdue,
    /// Due within 30 days.
    DueSoon,
    /// Due within 60 days.
    ComingUp,
    Scheduled,
}

impl DueStatus {
    pub fn classify(due_date: NaiveDate, today: NaiveDate) -> Self {
        let days = (due_date - today).num_days();
        if days < 0 {
            Self::Overdue
        } else if days < 30 {
            Self::DueSoon
        } else if days < 60 {
            Self::ComingUp
        } else {
            Self::Scheduled
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceItem {
    pub id: RecordId,
    pub kind: MaintenanceKind,
    pub sub_category: Option<String>,
    pub name: String,
    pub reference: Option<String>,
    pub serial_number: Option<String>,
    pub action_required: String,
    pub supplier: Option<String>,
    pub frequency: String,
    pub due_date: NaiveDate,
    pub owner: Option<UserId>,
    pub allocated_to: Option<UserId>,
    pub completed: bool,
    pub archived: bool,
    pub stamp: AuditStamp,
}

impl MaintenanceItem {
    pub fn due_status(&self, today: NaiveDate) -> DueStatus {
        DueStatus::classify(self.due_date, today)
    }
}

/// Editable fields of a maintenance item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceItemInput {
    pub kind: MaintenanceKind,
    pub sub_category: Option<String>,
    pub name: String,
    pub reference: Option<String>,
    pub serial_number: Option<String>,
    pub action_required: String,
    pub supplier: Option<String>,
    pub frequency: String,
    pub due_date: NaiveDate,
    pub owner: Option<UserId>,
    pub allocated_to: Option<UserId>,
    pub completed: bool,
}

impl MaintenanceItemInput {
    pub fn from_form(form: &FormData) -> Result<Self, ValidationError> {
        let kind_text = form.required_text("category")?;
        let kind = MaintenanceKind::parse(&kind_text).ok_or(ValidationError::UnknownOption {
            field: "category",
            value: kind_text,
        })?;

        let input = Self {
            kind,
            sub_category: form.optional_text("subCategory"),
            name: form.required_text("name")?,
            reference: form.optional_text("reference"),
            serial_number: form.optional_text("serialNumber"),
            action_required: form.text("actionRequired"),
            supplier: form.optional_text("supplier"),
            frequency: form.text("frequency"),
            due_date: form.required_date("dueDate")?,
            owner: form.optional_uuid("ownerId")?,
            allocated_to: form.optional_uuid("allocatedToId")?,
            completed: form.flag("completed"),
        };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)
    }
}

/// Schedule page filters; `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceListQuery {
    pub view: ArchiveView,
    pub kind: Option<MaintenanceKind>,
    pub sub_category: Option<String>,
    pub completion: CompletionFilter,
    pub owner: Option<UserId>,
    pub allocated_to: Option<UserId>,
}
