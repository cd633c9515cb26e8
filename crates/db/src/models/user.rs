//! User mirror-row model and DTOs.
//!
//! The identity provider is the system of record for authentication; the
//! `users` table mirrors profile fields for querying. Credentials are never
//! stored here -- the password fields on the DTOs below travel to the
//! provider only.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tarrasque_core::types::{Timestamp, UserUid};

/// Full mirror row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserRow {
    pub uid: UserUid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub image: Option<String>,
    /// Premium gate; the epoch sentinel means never subscribed.
    pub sub_expiration: Timestamp,
}

/// Profile projection shared by user listings and campaign-participant
/// queries.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
pub struct UserProfile {
    pub uid: UserUid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub image: Option<String>,
}

/// DTO for inserting a mirror row. The uid is provider-issued.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUserRow {
    pub uid: UserUid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub image: Option<String>,
}

/// DTO for a full profile overwrite by uid.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRowUpdate {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub image: Option<String>,
}

/// Partial user update. All fields optional; only the set ones are applied.
///
/// `password` is provider-only and never reaches the mirror: it does not
/// appear in [`UserPatch::columns`], but a password-only patch still counts
/// as non-empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
    pub image: Option<String>,
}

impl UserPatch {
    /// Mirror columns touched by this patch, in declaration order.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut cols = Vec::new();
        if self.username.is_some() {
            cols.push("username");
        }
        if self.email.is_some() {
            cols.push("email");
        }
        if self.display_name.is_some() {
            cols.push("display_name");
        }
        if self.image.is_some() {
            cols.push("image");
        }
        cols
    }

    /// True when the patch sets nothing at all, including the password.
    pub fn is_empty(&self) -> bool {
        self.columns().is_empty() && self.password.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_follow_declaration_order() {
        let patch = UserPatch {
            username: Some("aranel".into()),
            email: None,
            password: None,
            display_name: Some("Aranel".into()),
            image: Some("https://cdn.example/a.png".into()),
        };
        assert_eq!(patch.columns(), vec!["username", "display_name", "image"]);
    }

    #[test]
    fn empty_patch_has_no_columns() {
        let patch = UserPatch::default();
        assert!(patch.columns().is_empty());
        assert!(patch.is_empty());
    }

    #[test]
    fn password_only_patch_is_not_empty_but_touches_no_columns() {
        let patch = UserPatch {
            password: Some("hunter2".into()),
            ..Default::default()
        };
        assert!(patch.columns().is_empty());
        assert!(!patch.is_empty());
    }
}
