//! Repository for the `campaign` table.

use sqlx::PgPool;
use tarrasque_core::types::DbId;

use crate::error::{DbError, DbResult};
use crate::models::campaign::{Campaign, CreateCampaign, UpdateCampaign};
use crate::models::user::UserProfile;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, dungeon_master, name, description, image, notes, status, images";

/// Provides CRUD operations for campaigns.
pub struct CampaignRepo;

impl CampaignRepo {
    /// Insert a new campaign, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateCampaign) -> DbResult<Campaign> {
        let query = format!(
            "INSERT INTO campaign (dungeon_master, name, description, image, notes, status, images) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'active'), COALESCE($7, '[]'::jsonb)) \
             RETURNING {COLUMNS}"
        );
        let campaign = sqlx::query_as::<_, Campaign>(&query)
            .bind(&input.dungeon_master)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.image)
            .bind(&input.notes)
            .bind(&input.status)
            .bind(&input.images)
            .fetch_one(pool)
            .await?;
        Ok(campaign)
    }

    /// List all campaigns.
    pub async fn list(pool: &PgPool) -> DbResult<Vec<Campaign>> {
        let query = format!("SELECT {COLUMNS} FROM campaign ORDER BY id");
        Ok(sqlx::query_as::<_, Campaign>(&query)
            .fetch_all(pool)
            .await?)
    }

    /// Fetch a campaign by id. Fails with `NotFound` when no row matches.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> DbResult<Campaign> {
        let query = format!("SELECT {COLUMNS} FROM campaign WHERE id = $1");
        sqlx::query_as::<_, Campaign>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found("campaign", id))
    }

    /// List campaigns a user is involved in: campaigns they run as dungeon
    /// master plus campaigns they joined through a character.
    pub async fn list_by_user(pool: &PgPool, uid: &str) -> DbResult<Vec<Campaign>> {
        let query = format!(
            "SELECT DISTINCT c.id, c.dungeon_master, c.name, c.description, c.image, \
                    c.notes, c.status, c.images \
             FROM campaign c \
             LEFT JOIN character_data cd ON cd.campaign_id = c.id \
             WHERE c.dungeon_master = $1 OR cd.user_id = $1 \
             ORDER BY c.id"
        );
        Ok(sqlx::query_as::<_, Campaign>(&query)
            .bind(uid)
            .fetch_all(pool)
            .await?)
    }

    /// Profiles of the distinct users with a character in the campaign.
    pub async fn participants(pool: &PgPool, id: DbId) -> DbResult<Vec<UserProfile>> {
        let query = "SELECT DISTINCT u.uid, u.username, u.email, u.display_name, u.image \
             FROM users u \
             JOIN character_data cd ON cd.user_id = u.uid \
             WHERE cd.campaign_id = $1 \
             ORDER BY u.uid";
        Ok(sqlx::query_as::<_, UserProfile>(query)
            .bind(id)
            .fetch_all(pool)
            .await?)
    }

    /// Full-row overwrite by id. Fails with `NotFound` when the id does not
    /// exist.
    pub async fn update(pool: &PgPool, id: DbId, input: &UpdateCampaign) -> DbResult<Campaign> {
        let query = format!(
            "UPDATE campaign SET \
                dungeon_master = $2, \
                name = $3, \
                description = $4, \
                image = $5, \
                notes = $6, \
                status = $7, \
                images = $8 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(id)
            .bind(&input.dungeon_master)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.image)
            .bind(&input.notes)
            .bind(&input.status)
            .bind(&input.images)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found("campaign", id))
    }

    /// Delete a campaign by id. Fails with `NotFound` when zero rows were
    /// affected.
    pub async fn delete(pool: &PgPool, id: DbId) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM campaign WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("campaign", id));
        }
        Ok(())
    }
}
