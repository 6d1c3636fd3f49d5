//! Core domain logic for the management-system registers.
//! This crate is the single source of truth for business invariants.

pub mod access;
pub mod db;
pub mod intake;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use access::{AccessControl, RecordingInvalidator, RouteInvalidator, SessionAccess};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use intake::FormData;
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::record::{ArchiveView, CompletionFilter, RecordId, RecordKind, ValidationError};
pub use model::risk::{score, RiskAssessment, RiskBand, RiskRating};
pub use model::user::{Permission, User, UserId};
pub use repo::{RepoError, RepoResult};
pub use service::{ServiceContext, ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
