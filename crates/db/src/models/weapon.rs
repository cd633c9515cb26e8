//! Weapon entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tarrasque_core::types::DbId;

/// A weapon row from the `weapon` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Weapon {
    pub id: DbId,
    pub weapon_type: String,
    pub name: String,
    pub weight: i32,
    pub price: i32,
    pub category: String,
    pub reach: String,
    pub description: Option<String>,
    /// Damage dice, e.g. `"1d8"`.
    pub damage: String,
    /// Damage dice when wielded two-handed, for versatile weapons.
    pub versatile_damage: Option<String>,
    pub ammunition: bool,
    pub damage_type: String,
    /// `None` marks a generic (rulebook) weapon owned by no campaign.
    pub campaign_id: Option<DbId>,
}

/// DTO for creating a new weapon. Also used for full-row updates, which
/// overwrite every column by id.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWeapon {
    pub weapon_type: String,
    pub name: String,
    pub weight: i32,
    pub price: i32,
    pub category: String,
    pub reach: String,
    pub description: Option<String>,
    pub damage: String,
    pub versatile_damage: Option<String>,
    pub ammunition: bool,
    pub damage_type: String,
    pub campaign_id: Option<DbId>,
}
