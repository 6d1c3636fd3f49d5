//! Interested party register model.
//!
//! # Responsibility
//! - Define the interested party record, its validated input and the
//!   single-step reorder vocabulary.
//!
//! # Invariants
//! - `risk` levels are derived from the submitted ratings on every write.
//! - `order` is unique among non-archived parties and starts at 1.

use crate::intake::FormData;
use crate::model::record::{require_text, AuditStamp, RecordId, ValidationError};
use crate::model::risk::{RiskAssessment, RiskRating, DEFAULT_RATING};
use serde::{Deserialize, Serialize};

/// Stakeholder with needs/expectations and an initial/residual risk rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterestedParty {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub needs_expectations: String,
    pub controls_recommendations: String,
    pub risk: RiskAssessment,
    /// Display position among non-archived parties.
    pub order: i64,
    pub archived: bool,
    pub stamp: AuditStamp,
}

impl InterestedParty {
    pub fn risk_level(&self) -> u8 {
        self.risk.initial_level()
    }

    pub fn residual_risk_level(&self) -> u8 {
        self.risk.residual_level()
    }
}

/// Editable fields of an interested party (create and full-replace update).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestedPartyInput {
    pub name: String,
    pub description: String,
    pub needs_expectations: String,
    pub controls_recommendations: String,
    pub risk: RiskAssessment,
}

impl InterestedPartyInput {
    /// Parses the interested party form.
    ///
    /// Missing or malformed rating fields default to 3.
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
            name: form.required_text("name")?,
            description: form.text("description"),
            needs_expectations: form.text("needsExpectations"),
            controls_recommendations: form.text("controlsRecommendations"),
            risk: RiskAssessment::new(initial, residual),
        };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)
    }
}

/// Single-step move direction in the ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

impl MoveDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }

    /// Order key the moved record should take.
    pub fn target(self, order: i64) -> i64 {
        match self {
            Self::Up => order - 1,
            Self::Down => order + 1,
        }
    }
}

/// Result of a reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// The record swapped order keys with `neighbor`.
    Moved {
        from: i64,
        to: i64,
        neighbor: RecordId,
    },
    /// No neighbor in that direction (list boundary) or the record is
    /// archived; nothing changed.
    Unchanged,
}

#[cfg(test)]
mod tests {
    use super::{InterestedPartyInput, MoveDirection};
    use crate::intake::FormData;
    use crate::model::record::ValidationError;

    #[test]
    fn from_form_scores_both_assessments() {
        let form = FormData::new()
            .with("name", " Customers ")
            .with("initialLikelihood", "4")
            .with("initialSeverity", "5")
            .with("residualLikelihood", "1")
            .with("residualSeverity", "2");
        let input = InterestedPartyInput::from_form(&form).unwrap();
        assert_eq!(input.name, "Customers");
        assert_eq!(input.risk.initial_level(), 20);
        assert_eq!(input.risk.residual_level(), 2);
    }

    #[test]
    fn from_form_defaults_malformed_ratings_to_three() {
        let form = FormData::new()
            .with("name", "Regulators")
            .with("initialLikelihood", "abc");
        let input = InterestedPartyInput::from_form(&form).unwrap();
        assert_eq!(input.risk.initial.likelihood(), 3);
        assert_eq!(input.risk.initial_level(), 9);
        assert_eq!(input.risk.residual_level(), 9);
    }

    #[test]
    fn from_form_requires_name() {
        let err = InterestedPartyInput::from_form(&FormData::new()).unwrap_err();
        assert_eq!(err, ValidationError::BlankField("name"));
    }

    #[test]
    fn direction_targets_neighbor_order() {
        assert_eq!(MoveDirection::Up.target(2), 1);
        assert_eq!(MoveDirection::Down.target(2), 3);
        assert_eq!(MoveDirection::parse("DOWN"), Some(MoveDirection::Down));
        assert_eq!(MoveDirection::parse("left"), None);
    }
}
