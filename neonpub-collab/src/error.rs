use thiserror::Error;

use crate::DatabaseError;

pub type CollabResult<T> = std::result::Result<T, CollabError>;

/// Why an intent against a venue was refused
#[derive(Debug, Error)]
pub enum CollabError {
    /// The record doesn't exist, or belongs to another venue
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(String),
    /// The intent doesn't fit the current state
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidArgument(String),
    /// A downstream collaborator failed or isn't configured
    #[error("{0}")]
    Unavailable(String),
}

impl CollabError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<DatabaseError> for CollabError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound { resource, .. } => Self::NotFound(resource),
            e @ DatabaseError::Conflict { .. } => Self::Conflict(e.to_string()),
            DatabaseError::Internal(e) => {
                log::error!("Database failure: {}", e);
                Self::Unavailable("The database is unavailable".to_string())
            }
        }
    }
}
