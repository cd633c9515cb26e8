use crate::types::Timestamp;

/// Domain error kinds shared by the repository and identity layers.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A keyed lookup or delete matched zero rows.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A partial update was requested with no fields set.
    #[error("empty update: no fields supplied")]
    EmptyUpdate,

    /// The stored subscription-expiration timestamp is not in the future.
    #[error("subscription expired at {expired_at}")]
    SubscriptionExpired { expired_at: Timestamp },

    /// A session token could not be tied to a user.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for [`CoreError::NotFound`] with any displayable id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
