//! Repository for the `weapon` table.

use sqlx::PgPool;
use tarrasque_core::types::DbId;

use crate::error::{DbError, DbResult};
use crate::models::weapon::{CreateWeapon, Weapon};

/// The fixed thirteen-column projection used by every weapon read.
const COLUMNS: &str = "id, weapon_type, name, weight, price, category, reach, description, \
                       damage, versatile_damage, ammunition, damage_type, campaign_id";

/// Provides CRUD operations for weapons.
pub struct WeaponRepo;

impl WeaponRepo {
    /// Insert a new weapon, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateWeapon) -> DbResult<Weapon> {
        let query = format!(
            "INSERT INTO weapon (weapon_type, name, weight, price, category, reach, \
                                 description, damage, versatile_damage, ammunition, \
                                 damage_type, campaign_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {COLUMNS}"
        );
        let weapon = sqlx::query_as::<_, Weapon>(&query)
            .bind(&input.weapon_type)
            .bind(&input.name)
            .bind(input.weight)
            .bind(input.price)
            .bind(&input.category)
            .bind(&input.reach)
            .bind(&input.description)
            .bind(&input.damage)
            .bind(&input.versatile_damage)
            .bind(input.ammunition)
            .bind(&input.damage_type)
            .bind(input.campaign_id)
            .fetch_one(pool)
            .await?;
        Ok(weapon)
    }

    /// List all weapons.
    pub async fn list(pool: &PgPool) -> DbResult<Vec<Weapon>> {
        let query = format!("SELECT {COLUMNS} FROM weapon ORDER BY id");
        Ok(sqlx::query_as::<_, Weapon>(&query).fetch_all(pool).await?)
    }

    /// List generic weapons: rulebook entries owned by no campaign.
    pub async fn list_generic(pool: &PgPool) -> DbResult<Vec<Weapon>> {
        let query = format!("SELECT {COLUMNS} FROM weapon WHERE campaign_id IS NULL ORDER BY id");
        Ok(sqlx::query_as::<_, Weapon>(&query).fetch_all(pool).await?)
    }

    /// List the weapons belonging to a campaign. Fails with `NotFound` when
    /// no weapon references the campaign.
    pub async fn list_by_campaign(pool: &PgPool, campaign_id: DbId) -> DbResult<Vec<Weapon>> {
        let query = format!("SELECT {COLUMNS} FROM weapon WHERE campaign_id = $1 ORDER BY id");
        let weapons = sqlx::query_as::<_, Weapon>(&query)
            .bind(campaign_id)
            .fetch_all(pool)
            .await?;
        if weapons.is_empty() {
            return Err(DbError::not_found("weapon for campaign", campaign_id));
        }
        Ok(weapons)
    }

    /// Fetch a weapon by id. Fails with `NotFound` when no row matches.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> DbResult<Weapon> {
        let query = format!("SELECT {COLUMNS} FROM weapon WHERE id = $1");
        sqlx::query_as::<_, Weapon>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found("weapon", id))
    }

    /// Full-row overwrite by id. Fails with `NotFound` when the id does not
    /// exist.
    pub async fn update(pool: &PgPool, id: DbId, input: &CreateWeapon) -> DbResult<Weapon> {
        let query = format!(
            "UPDATE weapon SET \
                weapon_type = $2, \
                name = $3, \
                weight = $4, \
                price = $5, \
                category = $6, \
                reach = $7, \
                description = $8, \
                damage = $9, \
                versatile_damage = $10, \
                ammunition = $11, \
                damage_type = $12, \
                campaign_id = $13 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Weapon>(&query)
            .bind(id)
            .bind(&input.weapon_type)
            .bind(&input.name)
            .bind(input.weight)
            .bind(input.price)
            .bind(&input.category)
            .bind(&input.reach)
            .bind(&input.description)
            .bind(&input.damage)
            .bind(&input.versatile_damage)
            .bind(input.ammunition)
            .bind(&input.damage_type)
            .bind(input.campaign_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found("weapon", id))
    }

    /// Delete a weapon by id. Fails with `NotFound` when zero rows were
    /// affected.
    pub async fn delete(pool: &PgPool, id: DbId) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM weapon WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("weapon", id));
        }
        Ok(())
    }
}
