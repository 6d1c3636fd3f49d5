//! Legal register model: applicable legislation with approval and reviews.

use crate::intake::FormData;
use crate::model::record::{require_text, AuditStamp, RecordId, ValidationError};
use crate::model::user::UserId;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegalRegisterEntry {
    pub id: RecordId,
    pub title: String,
    pub legislation: String,
    pub requirements: String,
    /// New entries wait for approval before joining the main register.
    pub approved: bool,
    pub archived: bool,
    pub stamp: AuditStamp,
    /// Most recent review by `review_date`, when loaded.
    pub latest_review: Option<LegalReview>,
}

/// Periodic compliance review of a legal register entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegalReview {
    pub id: RecordId,
    pub legal_register_id: RecordId,
    pub review_date: NaiveDate,
    pub reviewed_by: UserId,
    pub notes: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalRegisterInput {
    pub title: String,
    pub legislation: String,
    pub requirements: String,
}

impl LegalRegisterInput {
    pub fn from_form(form: &FormData) -> Result<Self, ValidationError> {
        let input = Self {
            title: form.required_text("title")?,
            legislation: form.text("legislation"),
            requirements: form.text("requirements"),
        };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalReviewInput {
    pub review_date: NaiveDate,
    pub notes: String,
}

impl LegalReviewInput {
    pub fn from_form(form: &FormData) -> Result<Self, ValidationError> {
        Ok(Self {
            review_date: form.required_date("reviewDate")?,
            notes: form.text("notes"),
        })
    }
}

/// The three sections of the legal register page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegalRegisterViews {
    /// Active and approved, with latest review.
    pub approved: Vec<LegalRegisterEntry>,
    /// Active and not yet approved.
    pub awaiting_approval: Vec<LegalRegisterEntry>,
    /// Archived, with latest review.
    pub archived: Vec<LegalRegisterEntry>,
}
