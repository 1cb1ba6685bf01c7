//! Errors shared by the status enums and their transition tables.

use service_core::error::AppError;
use thiserror::Error;

/// A stored or submitted status/enum string that matches no variant.
#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl From<ParseEnumError> for AppError {
    fn from(err: ParseEnumError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

/// Rejected status change.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid {entity} transition: cannot {action} when status is {from}")]
    Invalid {
        entity: &'static str,
        from: &'static str,
        action: &'static str,
    },

    #[error("{entity} cannot be assigned without an employee id")]
    MissingAssignee { entity: &'static str },
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}
