//! Service-level error taxonomy shared by every register use-case.

use crate::model::record::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// No resolvable user, or the user lacks the required permission.
    Unauthorized,
    /// Target record does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Input rejected by intake or model validation.
    Validation(ValidationError),
    /// Repository/SQLite failure.
    Storage(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Unauthorized | Self::NotFound { .. } => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Storage(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
