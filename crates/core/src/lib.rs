//! Shared primitives for the tarrasque workspace: id/timestamp types and
//! the domain error enum used across the db and identity crates.

pub mod error;
pub mod types;
