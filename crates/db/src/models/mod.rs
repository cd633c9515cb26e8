//! Entity model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - Update/patch DTOs where the entity supports them

pub mod campaign;
pub mod character;
pub mod user;
pub mod weapon;
