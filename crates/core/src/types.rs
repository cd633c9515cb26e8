/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identity-provider-issued user id. The provider mints these; the
/// relational mirror never generates one locally.
pub type UserUid = String;
