//! Shared fixtures for repository integration tests.

use sqlx::PgPool;
use tarrasque_db::models::user::{NewUserRow, UserRow};
use tarrasque_db::repositories::UserMirrorRepo;

/// Insert a mirror row to satisfy foreign keys from campaigns/characters.
pub async fn seed_user(pool: &PgPool, uid: &str) -> UserRow {
    UserMirrorRepo::insert(
        pool,
        &NewUserRow {
            uid: uid.to_string(),
            username: format!("user-{uid}"),
            email: format!("{uid}@example.com"),
            display_name: format!("User {uid}"),
            image: None,
        },
    )
    .await
    .expect("seed user insert should succeed")
}

/// Insert a race reference row, returning its id.
pub async fn seed_race(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO race (name, description, speed) VALUES ($1, $2, 30) RETURNING id",
    )
    .bind(name)
    .bind(format!("{name} description"))
    .fetch_one(pool)
    .await
    .expect("seed race insert should succeed")
}

/// Insert a class reference row, returning its id.
pub async fn seed_class(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO class (name, hit_dice, spellcasting_ability) \
         VALUES ($1, '1d8', NULL) RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .expect("seed class insert should succeed")
}

/// Insert a background reference row, returning its id.
pub async fn seed_background(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO background (name, languages) VALUES ($1, 'Common') RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("seed background insert should succeed")
}
