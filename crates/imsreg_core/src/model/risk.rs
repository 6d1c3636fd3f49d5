//! Risk scoring for risk-bearing registers.
//!
//! # Responsibility
//! - Compute risk levels as likelihood × severity.
//! - Carry validated likelihood/severity pairs for initial and residual
//!   assessments.
//!
//! # Invariants
//! - Ratings are in `1..=5`, so levels are in `1..=25`.
//! - A `RiskRating` level is always derived from its inputs; it is never set
//!   independently.

use crate::model::record::ValidationError;
use serde::Serialize;

pub const RATING_MIN: u8 = 1;
pub const RATING_MAX: u8 = 5;
/// Intake fallback for malformed likelihood/severity fields.
pub const DEFAULT_RATING: u8 = 3;

/// Risk level for one likelihood/severity pair.
///
/// Pure and total over `1..=5 × 1..=5`; range checking belongs to the caller.
pub fn score(likelihood: u8, severity: u8) -> u8 {
    likelihood * severity
}

/// Validated likelihood/severity pair with its derived level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskRating {
    likelihood: u8,
    severity: u8,
    level: u8,
}

impl RiskRating {
    pub fn new(likelihood: u8, severity: u8) -> Result<Self, ValidationError> {
        check_range("likelihood", likelihood)?;
        check_range("severity", severity)?;
        Ok(Self {
            likelihood,
            severity,
            level: score(likelihood, severity),
        })
    }

    pub fn likelihood(&self) -> u8 {
        self.likelihood
    }

    pub fn severity(&self) -> u8 {
        self.severity
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn band(&self) -> RiskBand {
        RiskBand::classify(self.level)
    }
}

/// Initial (before controls) and residual (after controls) ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub initial: RiskRating,
    pub residual: RiskRating,
}

impl RiskAssessment {
    pub fn new(initial: RiskRating, residual: RiskRating) -> Self {
        Self { initial, residual }
    }

    pub fn initial_level(&self) -> u8 {
        self.initial.level()
    }

    pub fn residual_level(&self) -> u8 {
        self.residual.level()
    }
}

/// Display band for a risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    /// 1..=4
    Low,
    /// 5..=9
    Medium,
    /// 10..=14
    High,
    /// 15..=25
    VeryHigh,
}

impl RiskBand {
    pub fn classify(level: u8) -> Self {
        match level {
            0..=4 => Self::Low,
            5..=9 => Self::Medium,
            10..=14 => Self::High,
            _ => Self::VeryHigh,
        }
    }
}

fn check_range(field: &'static str, value: u8) -> Result<(), ValidationError> {
    if (RATING_MIN..=RATING_MAX).contains(&value) {
        return Ok(());
    }
    Err(ValidationError::RatingOutOfRange {
        field,
        value: i64::from(value),
    })
}
