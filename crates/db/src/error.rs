use tarrasque_core::error::CoreError;

/// Error type returned by every repository method.
///
/// Domain kinds (`NotFound`, `EmptyUpdate`, ...) travel as [`CoreError`];
/// driver errors pass through unwrapped so callers can classify them
/// (constraint violations, connectivity) themselves.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Shorthand for a domain `NotFound` wrapped in [`DbError`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DbError::Core(CoreError::not_found(entity, id))
    }
}
