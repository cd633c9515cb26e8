//! Repository for the `users` mirror table.
//!
//! This is the SQL half of the dual-backend user component: the identity
//! provider owns credentials and sessions, this table mirrors profile
//! fields for joins and listings. See `tarrasque-identity` for the
//! coordinating half.

use sqlx::{PgPool, QueryBuilder};
use tarrasque_core::error::CoreError;
use tarrasque_core::types::Timestamp;

use crate::error::{DbError, DbResult};
use crate::models::user::{NewUserRow, UserPatch, UserProfile, UserRow, UserRowUpdate};

/// Full mirror-row projection.
const COLUMNS: &str = "uid, username, email, display_name, image, sub_expiration";

/// Profile projection shared with listings and participant queries.
const PROFILE_COLUMNS: &str = "uid, username, email, display_name, image";

/// Provides CRUD operations for user mirror rows.
pub struct UserMirrorRepo;

impl UserMirrorRepo {
    /// Insert a mirror row keyed by the provider-issued uid.
    pub async fn insert(pool: &PgPool, input: &NewUserRow) -> DbResult<UserRow> {
        let query = format!(
            "INSERT INTO users (uid, username, email, display_name, image) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(&input.uid)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.display_name)
            .bind(&input.image)
            .fetch_one(pool)
            .await?;
        Ok(row)
    }

    /// List all user profiles.
    pub async fn list(pool: &PgPool) -> DbResult<Vec<UserProfile>> {
        let query = format!("SELECT {PROFILE_COLUMNS} FROM users ORDER BY uid");
        Ok(sqlx::query_as::<_, UserProfile>(&query)
            .fetch_all(pool)
            .await?)
    }

    /// Fetch a user profile by uid. Fails with `NotFound` when no row
    /// matches.
    pub async fn find_by_uid(pool: &PgPool, uid: &str) -> DbResult<UserProfile> {
        let query = format!("SELECT {PROFILE_COLUMNS} FROM users WHERE uid = $1");
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(uid)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", uid))
    }

    /// Fetch the full mirror row, subscription expiration included.
    pub async fn full_by_uid(pool: &PgPool, uid: &str) -> DbResult<UserRow> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE uid = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(uid)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", uid))
    }

    /// Full profile overwrite by uid. Fails with `NotFound` when the uid
    /// does not exist.
    pub async fn update(pool: &PgPool, uid: &str, input: &UserRowUpdate) -> DbResult<UserProfile> {
        let query = format!(
            "UPDATE users SET \
                username = $2, \
                email = $3, \
                display_name = $4, \
                image = $5 \
             WHERE uid = $1 \
             RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(uid)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.display_name)
            .bind(&input.image)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", uid))
    }

    /// Apply a partial update built from the patch's set fields.
    ///
    /// Fails with `EmptyUpdate` when the patch sets nothing at all. A
    /// password-only patch touches no mirror column and returns the current
    /// profile unchanged.
    pub async fn patch(pool: &PgPool, uid: &str, patch: &UserPatch) -> DbResult<UserProfile> {
        if patch.is_empty() {
            return Err(CoreError::EmptyUpdate.into());
        }
        if patch.columns().is_empty() {
            return Self::find_by_uid(pool, uid).await;
        }

        let mut qb = QueryBuilder::new("UPDATE users SET ");
        {
            let mut sets = qb.separated(", ");
            if let Some(username) = &patch.username {
                sets.push("username = ").push_bind_unseparated(username);
            }
            if let Some(email) = &patch.email {
                sets.push("email = ").push_bind_unseparated(email);
            }
            if let Some(display_name) = &patch.display_name {
                sets.push("display_name = ").push_bind_unseparated(display_name);
            }
            if let Some(image) = &patch.image {
                sets.push("image = ").push_bind_unseparated(image);
            }
        }
        qb.push(" WHERE uid = ").push_bind(uid);
        qb.push(format!(" RETURNING {PROFILE_COLUMNS}"));

        qb.build_query_as::<UserProfile>()
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", uid))
    }

    /// Delete a mirror row by uid. Fails with `NotFound` when zero rows
    /// were affected.
    pub async fn delete(pool: &PgPool, uid: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE uid = $1")
            .bind(uid)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", uid));
        }
        Ok(())
    }

    /// Parameterized multi-row insert for provider-to-mirror transfers.
    ///
    /// Returns the number of rows inserted. Fails with `EmptyUpdate` on an
    /// empty input slice.
    pub async fn bulk_insert(pool: &PgPool, rows: &[NewUserRow]) -> DbResult<u64> {
        if rows.is_empty() {
            return Err(CoreError::EmptyUpdate.into());
        }

        let mut qb =
            QueryBuilder::new("INSERT INTO users (uid, username, email, display_name, image) ");
        qb.push_values(rows, |mut b, row| {
            b.push_bind(&row.uid)
                .push_bind(&row.username)
                .push_bind(&row.email)
                .push_bind(&row.display_name)
                .push_bind(&row.image);
        });

        let result = qb.build().execute(pool).await?;
        tracing::debug!(rows = result.rows_affected(), "Bulk inserted user mirror rows");
        Ok(result.rows_affected())
    }

    /// Read the stored subscription expiration for a user.
    pub async fn sub_expiration(pool: &PgPool, uid: &str) -> DbResult<Timestamp> {
        sqlx::query_scalar::<_, Timestamp>("SELECT sub_expiration FROM users WHERE uid = $1")
            .bind(uid)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", uid))
    }

    /// Overwrite the stored subscription expiration. Fails with `NotFound`
    /// when the uid does not exist.
    pub async fn set_sub_expiration(pool: &PgPool, uid: &str, until: Timestamp) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET sub_expiration = $2 WHERE uid = $1")
            .bind(uid)
            .bind(until)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", uid));
        }
        Ok(())
    }
}
