//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Unique constraint violated (e.g. replayed payment reference)
    #[error("duplicate record")]
    Duplicate,
}

/// Database result type alias
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Classify an sqlx error, surfacing unique violations as `Duplicate`
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            if db.is_unique_violation() {
                return Self::Duplicate;
            }
        }
        Self::Sqlx(err)
    }
}
