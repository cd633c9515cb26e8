//! Character entity model and DTOs.
//!
//! Three read shapes exist: the raw [`Character`] row, the nine-column
//! [`CharacterSummary`] used by every listing, and the fully joined
//! [`CharacterSheet`] returned by keyed lookups.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use tarrasque_core::types::{DbId, UserUid};

/// A character row from the `character_data` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Character {
    pub id: DbId,
    /// `None` together with `campaign_id: None` marks a generic template.
    pub user_id: Option<UserUid>,
    pub campaign_id: Option<DbId>,
    pub race_id: Option<DbId>,
    pub class_id: Option<DbId>,
    pub background_id: Option<DbId>,
    pub name: String,
    pub story: Option<String>,
    pub alignment: Option<String>,
    pub age: Option<i16>,
    pub hair: Option<String>,
    pub eyes: Option<String>,
    pub skin: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub img_url: Option<String>,
    pub strength: i16,
    pub dexterity: i16,
    pub intelligence: i16,
    pub constitution: i16,
    pub wisdom: i16,
    pub charisma: i16,
    pub hitpoints: i32,
    pub hit_dice: String,
    pub speed: i16,
    pub armor_class: i16,
    pub level: i16,
    pub exp: i32,
}

/// DTO for creating a character. Also used for full-row updates, which
/// overwrite every column by id.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCharacter {
    pub user_id: Option<UserUid>,
    pub campaign_id: Option<DbId>,
    pub race_id: Option<DbId>,
    pub class_id: Option<DbId>,
    pub background_id: Option<DbId>,
    pub name: String,
    pub story: Option<String>,
    pub alignment: Option<String>,
    pub age: Option<i16>,
    pub hair: Option<String>,
    pub eyes: Option<String>,
    pub skin: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub img_url: Option<String>,
    pub strength: i16,
    pub dexterity: i16,
    pub intelligence: i16,
    pub constitution: i16,
    pub wisdom: i16,
    pub charisma: i16,
    pub hitpoints: i32,
    pub hit_dice: String,
    pub speed: i16,
    pub armor_class: i16,
    pub level: i16,
    pub exp: i32,
}

/// Listing projection shared by every character listing: display fields
/// plus race and class names resolved through LEFT JOINs.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
pub struct CharacterSummary {
    pub id: DbId,
    pub user_id: Option<UserUid>,
    pub campaign_id: Option<DbId>,
    pub image: Option<String>,
    pub name: String,
    pub race: Option<String>,
    pub class: Option<String>,
    pub level: i16,
    pub hitpoints: i32,
}

/// Race detail joined into a [`CharacterSheet`].
#[derive(Debug, Clone, Serialize)]
pub struct RaceDetail {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub speed: i16,
    pub strength: i16,
    pub dexterity: i16,
    pub intelligence: i16,
    pub constitution: i16,
    pub wisdom: i16,
    pub charisma: i16,
}

/// Class detail joined into a [`CharacterSheet`].
#[derive(Debug, Clone, Serialize)]
pub struct ClassDetail {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub proficiency_bonus: i16,
    pub hit_dice: String,
    pub armor_proficiencies: Option<String>,
    pub weapon_proficiencies: Option<String>,
    pub tool_proficiencies: Option<String>,
    pub spellcasting_ability: Option<String>,
}

/// Background detail joined into a [`CharacterSheet`].
#[derive(Debug, Clone, Serialize)]
pub struct BackgroundDetail {
    pub id: DbId,
    pub name: String,
    pub languages: Option<String>,
    pub personality_traits: Option<String>,
    pub ideals: Option<String>,
    pub bond: Option<String>,
    pub flaws: Option<String>,
    pub trait_: Option<String>,
    pub tool_proficiencies: Option<String>,
}

/// Keyed character read: the full row with race, class, and background
/// detail resolved. A dangling or NULL reference yields `None` detail.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterSheet {
    pub id: DbId,
    pub user_id: Option<UserUid>,
    pub campaign_id: Option<DbId>,
    pub race: Option<RaceDetail>,
    pub class: Option<ClassDetail>,
    pub background: Option<BackgroundDetail>,
    pub name: String,
    pub story: Option<String>,
    pub alignment: Option<String>,
    pub age: Option<i16>,
    pub hair: Option<String>,
    pub eyes: Option<String>,
    pub skin: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub img_url: Option<String>,
    pub strength: i16,
    pub dexterity: i16,
    pub intelligence: i16,
    pub constitution: i16,
    pub wisdom: i16,
    pub charisma: i16,
    pub hitpoints: i32,
    pub hit_dice: String,
    pub speed: i16,
    pub armor_class: i16,
    pub level: i16,
    pub exp: i32,
}

// The sheet row carries three optional column groups, so it is assembled by
// hand: each group materializes only when its joined id is present.
impl<'r> FromRow<'r, PgRow> for CharacterSheet {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let race = match row.try_get::<Option<DbId>, _>("race_id")? {
            Some(id) => Some(RaceDetail {
                id,
                name: row.try_get("race_name")?,
                description: row.try_get("race_description")?,
                speed: row.try_get("race_speed")?,
                strength: row.try_get("race_strength")?,
                dexterity: row.try_get("race_dexterity")?,
                intelligence: row.try_get("race_intelligence")?,
                constitution: row.try_get("race_constitution")?,
                wisdom: row.try_get("race_wisdom")?,
                charisma: row.try_get("race_charisma")?,
            }),
            None => None,
        };

        let class = match row.try_get::<Option<DbId>, _>("class_id")? {
            Some(id) => Some(ClassDetail {
                id,
                name: row.try_get("class_name")?,
                description: row.try_get("class_description")?,
                proficiency_bonus: row.try_get("proficiency_bonus")?,
                hit_dice: row.try_get("class_hit_dice")?,
                armor_proficiencies: row.try_get("armor_proficiencies")?,
                weapon_proficiencies: row.try_get("weapon_proficiencies")?,
                tool_proficiencies: row.try_get("class_tool_proficiencies")?,
                spellcasting_ability: row.try_get("spellcasting_ability")?,
            }),
            None => None,
        };

        let background = match row.try_get::<Option<DbId>, _>("background_id")? {
            Some(id) => Some(BackgroundDetail {
                id,
                name: row.try_get("background_name")?,
                languages: row.try_get("languages")?,
                personality_traits: row.try_get("personality_traits")?,
                ideals: row.try_get("ideals")?,
                bond: row.try_get("bond")?,
                flaws: row.try_get("flaws")?,
                trait_: row.try_get("trait")?,
                tool_proficiencies: row.try_get("background_tool_proficiencies")?,
            }),
            None => None,
        };

        Ok(CharacterSheet {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            campaign_id: row.try_get("campaign_id")?,
            race,
            class,
            background,
            name: row.try_get("name")?,
            story: row.try_get("story")?,
            alignment: row.try_get("alignment")?,
            age: row.try_get("age")?,
            hair: row.try_get("hair")?,
            eyes: row.try_get("eyes")?,
            skin: row.try_get("skin")?,
            height: row.try_get("height")?,
            weight: row.try_get("weight")?,
            img_url: row.try_get("img_url")?,
            strength: row.try_get("strength")?,
            dexterity: row.try_get("dexterity")?,
            intelligence: row.try_get("intelligence")?,
            constitution: row.try_get("constitution")?,
            wisdom: row.try_get("wisdom")?,
            charisma: row.try_get("charisma")?,
            hitpoints: row.try_get("hitpoints")?,
            hit_dice: row.try_get("hit_dice")?,
            speed: row.try_get("speed")?,
            armor_class: row.try_get("armor_class")?,
            level: row.try_get("level")?,
            exp: row.try_get("exp")?,
        })
    }
}
