//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define one data access contract per register plus the shared
//!   archive/delete lifecycle.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes call the input's `validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod audit_repo;
pub mod document_repo;
pub mod error;
pub mod improvement_repo;
pub mod interested_party_repo;
pub mod legal_register_repo;
pub mod lifecycle;
pub mod maintenance_repo;
pub mod org_context_repo;
mod sql;
pub mod user_repo;

pub use error::{RepoError, RepoResult};
