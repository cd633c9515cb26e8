//! Campaign entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tarrasque_core::types::{DbId, UserUid};

/// A campaign row from the `campaign` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Campaign {
    pub id: DbId,
    /// UID of the dungeon master running the campaign.
    pub dungeon_master: UserUid,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    /// Gallery of image URLs (JSONB array).
    pub images: serde_json::Value,
}

/// DTO for creating a new campaign.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaign {
    pub dungeon_master: UserUid,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub notes: Option<String>,
    /// Defaults to `"active"` if omitted.
    pub status: Option<String>,
    /// Defaults to `[]` if omitted.
    pub images: Option<serde_json::Value>,
}

/// DTO for updating a campaign. Updates are full-row overwrites by id.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCampaign {
    pub dungeon_master: UserUid,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub images: serde_json::Value,
}
