use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("database lock poisoned: {0}")]
    LockPoisoned(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl DbError {
    /// True when SQLite rejected a write on a UNIQUE constraint.
    pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
