//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate permission guard, validation, repository calls and route
//!   invalidation into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.
//!
//! # Invariants
//! - Reads need no permission; every mutation resolves an actor first.
//! - Route invalidation runs only after a successful write.

pub mod audit_service;
pub mod context;
pub mod document_service;
pub mod error;
pub mod improvement_service;
pub mod interested_party_service;
pub mod legal_register_service;
pub mod lifecycle_service;
pub mod maintenance_service;
pub mod org_context_service;

pub use context::ServiceContext;
pub use error::{ServiceError, ServiceResult};
