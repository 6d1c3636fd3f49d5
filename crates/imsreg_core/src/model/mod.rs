//! Domain model for the management-system registers.
//!
//! # Responsibility
//! - Define canonical record shapes and their validated inputs.
//! - Own the risk scoring rule shared by risk-bearing registers.
//!
//! # Invariants
//! - Every register record is identified by a stable `RecordId`.
//! - Archive is a visibility flag; deletion is permanent.
//! - Derived values (risk levels, audit status) are computed from inputs,
//!   never accepted from callers.

pub mod audit;
pub mod document;
pub mod improvement;
pub mod interested_party;
pub mod legal_register;
pub mod maintenance;
pub mod org_context;
pub mod record;
pub mod risk;
pub mod user;
