//! Core errors

use thiserror::Error;

/// Subscription core errors
#[derive(Error, Debug)]
pub enum CoreError {
    /// Provisioning gateway unreachable or refused the request. Aborts a
    /// new-handle grant; the extend path degrades instead.
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    /// A payment reference was already committed; the grant did not run again
    #[error("duplicate payment reference")]
    DuplicatePayment,

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] shard_db::DbError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Core result type alias
pub type CoreResult<T> = Result<T, CoreError>;
