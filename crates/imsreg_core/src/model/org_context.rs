//! Organizational context risk register model.

use crate::intake::FormData;
use crate::model::record::{require_text, AuditStamp, RecordId, ValidationError};
use crate::model::risk::{RiskAssessment, RiskRating, DEFAULT_RATING};
use serde::Serialize;

/// One internal/external context issue with its risk assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationalContextEntry {
    pub id: RecordId,
    /// Grouping key on the register page, e.g. `internal` or `external`.
    pub category: String,
    pub sub_category: Option<String>,
    pub issue: String,
    pub objectives: Vec<String>,
    pub risk: RiskAssessment,
    pub controls_recommendations: String,
    pub archived: bool,
    pub stamp: AuditStamp,
}

impl OrganizationalContextEntry {
    pub fn initial_risk_level(&self) -> u8 {
        self.risk.initial_level()
    }

    pub fn residual_risk_level(&self) -> u8 {
        self.risk.residual_level()
    }
}

/// Editable fields of an organizational context entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationalContextInput {
    pub category: String,
    pub sub_category: Option<String>,
    pub issue: String,
    pub objectives: Vec<String>,
    pub risk: RiskAssessment,
    pub controls_recommendations: String,
}

impl OrganizationalContextInput {
    pub fn from_form(form: &FormData) -> Result<Self, ValidationError> {
        let initial = RiskRating::new(
            form.rating_or("initialLikelihood", DEFAULT_RATING)?,
            form.rating_or("initialSeverity", DEFAULT_RATING)?,
        )?;
        let residual = RiskRating::new(
            form.rating_or("residualLikelihood", DEFAULT_RATING)?,
            form.rating_or("residualSeverity", DEFAULT_RATING)?,
        )?;

        let input = Self {
            category: form.required_text("category")?.to_ascii_lowercase(),
            sub_category: form.optional_text("subCategory"),
            issue: form.required_text("issue")?,
            objectives: form.get_all("objectives"),
            risk: RiskAssessment::new(initial, residual),
            controls_recommendations: form.text("controlsRecommendations"),
        };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("category", &self.category)?;
        require_text("issue", &self.issue)
    }
}

/// Entries grouped under one category heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextCategoryGroup {
    pub category: String,
    pub entries: Vec<OrganizationalContextEntry>,
}

/// Groups entries by category (ascending), keeping entry order within
/// each group.
pub fn group_by_category(entries: Vec<OrganizationalContextEntry>) -> Vec<ContextCategoryGroup> {
    let mut groups: Vec<ContextCategoryGroup> = Vec::new();
    for entry in entries {
        match groups
            .iter_mut()
            .find(|group| group.category == entry.category)
        {
            Some(group) => group.entries.push(entry),
            None => groups.push(ContextCategoryGroup {
                category: entry.category.clone(),
                entries: vec![entry],
            }),
        }
    }
    groups.sort_by(|left, right| left.category.cmp(&right.category));
    groups
}

#[cfg(test)]
mod tests {
    use super::OrganizationalContextInput;
    use crate::intake::FormData;

    #[test]
    fn from_form_collects_objectives_and_normalizes_category() {
        let form = FormData::new()
            .with("category", "External")
            .with("issue", "New supplier regulation")
            .with("objectives", "Stay compliant")
            .with("objectives", "Reduce cost")
            .with("initialLikelihood", "2")
            .with("initialSeverity", "4");
        let input = OrganizationalContextInput::from_form(&form).unwrap();
        assert_eq!(input.category, "external");
        assert_eq!(input.objectives.len(), 2);
        assert_eq!(input.risk.initial_level(), 8);
        assert_eq!(input.sub_category, None);
    }

    #[test]
    fn from_form_requires_issue() {
        let form = FormData::new().with("category", "internal");
        assert!(OrganizationalContextInput::from_form(&form).is_err());
    }
}
