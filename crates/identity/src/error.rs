use tarrasque_core::error::CoreError;
use tarrasque_db::error::DbError;

use crate::email::EmailError;

/// Error type for identity operations.
///
/// Domain kinds travel as [`CoreError`]; mirror failures keep their
/// [`DbError`] shape so driver errors stay classifiable.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    /// The provider rejected an operation (non-2xx response, bad payload).
    #[error("identity provider error: {0}")]
    Provider(String),

    /// The provider could not be reached at all.
    #[error("identity provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A session token could not be decoded.
    #[error("session token decode error: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Email(#[from] EmailError),
}

pub type IdentityResult<T> = Result<T, IdentityError>;
