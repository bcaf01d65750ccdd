//! # Engine Errors
//!
//! One error type for every transactional operation: either a business
//! rule said no ([`CoreError`]) or the database did ([`DbError`]).
//!
//! ```text
//! CoreError ─┐
//!            ├──► EngineError ──► kind() ──► NotFound | Conflict | Forbidden
//! DbError  ──┘                               Validation | Concurrency | Internal
//! ```
//!
//! Any error returned from inside a transaction drops the transaction
//! handle, which rolls every statement back.

use thiserror::Error;
use till_core::{CoreError, ErrorKind, ValidationError};

use crate::error::DbError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Core(e) => e.kind(),
            EngineError::Db(e) => e.kind(),
        }
    }

    /// Only lock contention is worth retrying; retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(DbError::from(err))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
