//! Repository for the `character_data` table.
//!
//! Every listing shares one summary projection; the filter variants below
//! replace the six near-identical hand-written statements the schema's
//! consumers would otherwise accumulate.

use sqlx::{PgPool, QueryBuilder};
use tarrasque_core::types::DbId;

use crate::error::{DbError, DbResult};
use crate::models::character::{Character, CharacterSheet, CharacterSummary, CreateCharacter};

/// Full `character_data` row projection.
const ROW_COLUMNS: &str = "id, user_id, campaign_id, race_id, class_id, background_id, name, \
     story, alignment, age, hair, eyes, skin, height, weight, img_url, \
     strength, dexterity, intelligence, constitution, wisdom, charisma, \
     hitpoints, hit_dice, speed, armor_class, level, exp";

/// Shared summary projection with race and class names resolved.
const SUMMARY_SELECT: &str = "SELECT cd.id, cd.user_id, cd.campaign_id, cd.img_url AS image, \
            cd.name, race.name AS race, class.name AS class, cd.level, cd.hitpoints \
     FROM character_data cd \
     LEFT JOIN race ON cd.race_id = race.id \
     LEFT JOIN class ON cd.class_id = class.id";

/// Keyed read with race, class, and background detail resolved.
const SHEET_SELECT: &str = "SELECT cd.id, cd.user_id, cd.campaign_id, \
            race.id AS race_id, race.name AS race_name, race.description AS race_description, \
            race.speed AS race_speed, race.strength AS race_strength, \
            race.dexterity AS race_dexterity, race.intelligence AS race_intelligence, \
            race.constitution AS race_constitution, race.wisdom AS race_wisdom, \
            race.charisma AS race_charisma, \
            class.id AS class_id, class.name AS class_name, \
            class.description AS class_description, class.proficiency_bonus, \
            class.hit_dice AS class_hit_dice, class.armor_proficiencies, \
            class.weapon_proficiencies, class.tool_proficiencies AS class_tool_proficiencies, \
            class.spellcasting_ability, \
            background.id AS background_id, background.name AS background_name, \
            background.languages, background.personality_traits, background.ideals, \
            background.bond, background.flaws, background.trait, \
            background.tool_proficiencies AS background_tool_proficiencies, \
            cd.name, cd.story, cd.alignment, cd.age, cd.hair, cd.eyes, cd.skin, \
            cd.height, cd.weight, cd.img_url, cd.strength, cd.dexterity, cd.intelligence, \
            cd.constitution, cd.wisdom, cd.charisma, cd.hitpoints, cd.hit_dice, cd.speed, \
            cd.armor_class, cd.level, cd.exp \
     FROM character_data cd \
     LEFT JOIN race ON cd.race_id = race.id \
     LEFT JOIN class ON cd.class_id = class.id \
     LEFT JOIN background ON cd.background_id = background.id \
     WHERE cd.id = $1";

/// Predicate selecting which characters a listing returns.
#[derive(Debug, Clone, Copy)]
pub enum CharacterFilter<'a> {
    /// Every character.
    All,
    /// Characters owned by a user.
    ByUser(&'a str),
    /// Characters assigned to a campaign.
    ByCampaign(DbId),
    /// Characters a user plays in a specific campaign.
    ByUserAndCampaign(&'a str, DbId),
    /// Templates: no owning user and no campaign.
    Generic,
    /// Characters linked to an attack event.
    ByAttackEvent(DbId),
}

/// Provides CRUD operations and filtered listings for characters.
pub struct CharacterRepo;

impl CharacterRepo {
    /// Insert a new character, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateCharacter) -> DbResult<Character> {
        let query = format!(
            "INSERT INTO character_data \
                (user_id, campaign_id, race_id, class_id, background_id, name, story, \
                 alignment, age, hair, eyes, skin, height, weight, img_url, \
                 strength, dexterity, intelligence, constitution, wisdom, charisma, \
                 hitpoints, hit_dice, speed, armor_class, level, exp) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                     $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27) \
             RETURNING {ROW_COLUMNS}"
        );
        let character = sqlx::query_as::<_, Character>(&query)
            .bind(&input.user_id)
            .bind(input.campaign_id)
            .bind(input.race_id)
            .bind(input.class_id)
            .bind(input.background_id)
            .bind(&input.name)
            .bind(&input.story)
            .bind(&input.alignment)
            .bind(input.age)
            .bind(&input.hair)
            .bind(&input.eyes)
            .bind(&input.skin)
            .bind(&input.height)
            .bind(&input.weight)
            .bind(&input.img_url)
            .bind(input.strength)
            .bind(input.dexterity)
            .bind(input.intelligence)
            .bind(input.constitution)
            .bind(input.wisdom)
            .bind(input.charisma)
            .bind(input.hitpoints)
            .bind(&input.hit_dice)
            .bind(input.speed)
            .bind(input.armor_class)
            .bind(input.level)
            .bind(input.exp)
            .fetch_one(pool)
            .await?;
        Ok(character)
    }

    /// Fetch a character sheet by id: the full row joined with race, class,
    /// and background detail. Fails with `NotFound` when no row matches.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> DbResult<CharacterSheet> {
        sqlx::query_as::<_, CharacterSheet>(SHEET_SELECT)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found("character", id))
    }

    /// List character summaries matching the filter.
    pub async fn list(pool: &PgPool, filter: CharacterFilter<'_>) -> DbResult<Vec<CharacterSummary>> {
        let mut qb = QueryBuilder::new(SUMMARY_SELECT);
        match filter {
            CharacterFilter::All => {}
            CharacterFilter::ByUser(uid) => {
                qb.push(" WHERE cd.user_id = ").push_bind(uid);
            }
            CharacterFilter::ByCampaign(campaign_id) => {
                qb.push(" WHERE cd.campaign_id = ").push_bind(campaign_id);
            }
            CharacterFilter::ByUserAndCampaign(uid, campaign_id) => {
                qb.push(" WHERE cd.user_id = ").push_bind(uid);
                qb.push(" AND cd.campaign_id = ").push_bind(campaign_id);
            }
            CharacterFilter::Generic => {
                qb.push(" WHERE cd.user_id IS NULL AND cd.campaign_id IS NULL");
            }
            CharacterFilter::ByAttackEvent(event_id) => {
                qb.push(" INNER JOIN character_attack_event cae ON cae.character_id = cd.id");
                qb.push(" WHERE cae.event_id = ").push_bind(event_id);
            }
        }
        qb.push(" ORDER BY cd.id");

        Ok(qb
            .build_query_as::<CharacterSummary>()
            .fetch_all(pool)
            .await?)
    }

    /// Full-row overwrite by id. Fails with `NotFound` when the id does not
    /// exist.
    pub async fn update(pool: &PgPool, id: DbId, input: &CreateCharacter) -> DbResult<Character> {
        let query = format!(
            "UPDATE character_data SET \
                user_id = $2, campaign_id = $3, race_id = $4, class_id = $5, \
                background_id = $6, name = $7, story = $8, alignment = $9, age = $10, \
                hair = $11, eyes = $12, skin = $13, height = $14, weight = $15, \
                img_url = $16, strength = $17, dexterity = $18, intelligence = $19, \
                constitution = $20, wisdom = $21, charisma = $22, hitpoints = $23, \
                hit_dice = $24, speed = $25, armor_class = $26, level = $27, exp = $28 \
             WHERE id = $1 \
             RETURNING {ROW_COLUMNS}"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(id)
            .bind(&input.user_id)
            .bind(input.campaign_id)
            .bind(input.race_id)
            .bind(input.class_id)
            .bind(input.background_id)
            .bind(&input.name)
            .bind(&input.story)
            .bind(&input.alignment)
            .bind(input.age)
            .bind(&input.hair)
            .bind(&input.eyes)
            .bind(&input.skin)
            .bind(&input.height)
            .bind(&input.weight)
            .bind(&input.img_url)
            .bind(input.strength)
            .bind(input.dexterity)
            .bind(input.intelligence)
            .bind(input.constitution)
            .bind(input.wisdom)
            .bind(input.charisma)
            .bind(input.hitpoints)
            .bind(&input.hit_dice)
            .bind(input.speed)
            .bind(input.armor_class)
            .bind(input.level)
            .bind(input.exp)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found("character", id))
    }

    /// Delete a character by id. Fails with `NotFound` when zero rows were
    /// affected.
    pub async fn delete(pool: &PgPool, id: DbId) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM character_data WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("character", id));
        }
        Ok(())
    }
}
