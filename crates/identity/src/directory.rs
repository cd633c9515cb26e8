//! The dual-backend user component.
//!
//! [`UserDirectory`] coordinates the identity provider (system of record
//! for credentials and sessions) with the relational mirror (profile
//! fields, subscription gate). Provider calls always run first and a
//! provider failure aborts the operation before any relational write; the
//! one compensation is registration, which deletes the freshly minted
//! provider account when a later step fails so neither backend is left
//! pointing at the other.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tarrasque_core::error::CoreError;
use tarrasque_core::types::{Timestamp, UserUid};
use tarrasque_db::models::user::{NewUserRow, UserPatch, UserProfile, UserRow, UserRowUpdate};
use tarrasque_db::repositories::UserMirrorRepo;
use tarrasque_db::DbPool;

use crate::claims;
use crate::email::VerificationMailer;
use crate::error::IdentityResult;
use crate::provider::{AccountChanges, IdentityProvider, NewAccount};

/// Avatar assigned at registration when the caller supplies no image.
const DEFAULT_AVATAR_URL: &str = "https://tarrasque.app/static/default-avatar.png";

/// Session cookie lifetime.
const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 48);

/// Registration payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Forwarded to the provider only; never stored locally.
    pub password: String,
    pub display_name: String,
    pub image: Option<String>,
}

/// Full-profile update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    /// Applied at the provider when set.
    pub password: Option<String>,
    pub display_name: String,
    pub image: Option<String>,
}

/// Unified claims assembled from the mirror and the provider.
#[derive(Debug, Clone, Serialize)]
pub struct TokenInfo {
    pub uid: UserUid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub image: Option<String>,
    pub sub_expiration: Timestamp,
    pub email_verified: bool,
}

/// Coordinates the identity provider with the relational mirror.
pub struct UserDirectory {
    pool: DbPool,
    provider: Arc<dyn IdentityProvider>,
    mailer: Arc<dyn VerificationMailer>,
}

impl UserDirectory {
    pub fn new(
        pool: DbPool,
        provider: Arc<dyn IdentityProvider>,
        mailer: Arc<dyn VerificationMailer>,
    ) -> Self {
        Self {
            pool,
            provider,
            mailer,
        }
    }

    /// Register a user: provider account, custom claims, verification
    /// email, then the mirror row keyed by the provider uid.
    ///
    /// Any failure after the provider account exists rolls that account
    /// back before the error propagates.
    pub async fn create(&self, input: NewUser) -> IdentityResult<UserRow> {
        let account = self
            .provider
            .create_account(&NewAccount {
                email: input.email.clone(),
                password: input.password.clone(),
                // The provider-side display name mirrors the username; the
                // chosen display name travels in the custom claims.
                display_name: input.username.clone(),
                photo_url: Some(
                    input
                        .image
                        .clone()
                        .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string()),
                ),
            })
            .await?;

        match self.finish_registration(&account.uid, &input).await {
            Ok(row) => {
                tracing::info!(uid = %row.uid, "user registered");
                Ok(row)
            }
            Err(err) => {
                self.rollback_account(&account.uid).await;
                Err(err)
            }
        }
    }

    /// Steps after the provider account exists; a failure here triggers
    /// rollback in [`Self::create`].
    async fn finish_registration(&self, uid: &str, input: &NewUser) -> IdentityResult<UserRow> {
        let claims = serde_json::json!({
            "displayName": input.display_name,
            "subExpiration": DateTime::<Utc>::UNIX_EPOCH.to_rfc3339(),
        });
        self.provider.set_custom_claims(uid, &claims).await?;

        let link = self.provider.email_verification_link(&input.email).await?;
        self.mailer
            .send_verification_link(&input.email, &link)
            .await?;

        let row = UserMirrorRepo::insert(
            &self.pool,
            &NewUserRow {
                uid: uid.to_string(),
                username: input.username.clone(),
                email: input.email.clone(),
                display_name: input.display_name.clone(),
                image: Some(
                    input
                        .image
                        .clone()
                        .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string()),
                ),
            },
        )
        .await?;
        Ok(row)
    }

    /// Best-effort deletion of a provider account whose registration was
    /// aborted mid-way.
    async fn rollback_account(&self, uid: &str) {
        match self.provider.delete_account(uid).await {
            Ok(()) => {
                tracing::warn!(uid, "rolled back provider account after aborted registration");
            }
            Err(err) => {
                tracing::error!(
                    uid,
                    error = %err,
                    "failed to roll back provider account; manual reconciliation required"
                );
            }
        }
    }

    /// All user profiles, from the mirror.
    pub async fn get_all(&self) -> IdentityResult<Vec<UserProfile>> {
        Ok(UserMirrorRepo::list(&self.pool).await?)
    }

    /// One user profile by uid, from the mirror. Fails with `NotFound`.
    pub async fn get_by_uid(&self, uid: &str) -> IdentityResult<UserProfile> {
        Ok(UserMirrorRepo::find_by_uid(&self.pool, uid).await?)
    }

    /// Users whose provider display name matches `name` exactly.
    ///
    /// Pages through the provider's full account listing: a linear scan
    /// with no index, acceptable at current account counts only. The
    /// provider listing does not carry the mirror's display name, so the
    /// provider-side name fills both name fields.
    pub async fn get_by_name(&self, name: &str) -> IdentityResult<Vec<UserProfile>> {
        let mut matches = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.provider.list_accounts(page_token.as_deref()).await?;
            for account in page.accounts {
                if account.display_name == name {
                    matches.push(UserProfile {
                        uid: account.uid,
                        username: account.display_name.clone(),
                        email: account.email,
                        display_name: account.display_name,
                        image: account.photo_url,
                    });
                }
            }
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(matches)
    }

    /// Full profile update: provider first (fatal on failure), then the
    /// mirror row.
    pub async fn update(&self, uid: &str, input: UserUpdate) -> IdentityResult<UserProfile> {
        self.provider
            .update_account(
                uid,
                &AccountChanges {
                    email: Some(input.email.clone()),
                    password: input.password.clone(),
                    display_name: Some(input.username.clone()),
                },
            )
            .await?;

        let profile = UserMirrorRepo::update(
            &self.pool,
            uid,
            &UserRowUpdate {
                username: input.username,
                email: input.email,
                display_name: input.display_name,
                image: input.image,
            },
        )
        .await?;
        Ok(profile)
    }

    /// Partial update. Username, email, and password changes are applied at
    /// the provider individually (each fatal on failure); the mirror then
    /// receives one statement covering the assembled column set. Fails with
    /// `EmptyUpdate` when nothing is set.
    pub async fn patch(&self, uid: &str, patch: UserPatch) -> IdentityResult<UserProfile> {
        if patch.is_empty() {
            return Err(CoreError::EmptyUpdate.into());
        }

        if let Some(username) = &patch.username {
            self.provider
                .update_account(
                    uid,
                    &AccountChanges {
                        display_name: Some(username.clone()),
                        ..Default::default()
                    },
                )
                .await?;
        }
        if let Some(email) = &patch.email {
            self.provider
                .update_account(
                    uid,
                    &AccountChanges {
                        email: Some(email.clone()),
                        ..Default::default()
                    },
                )
                .await?;
        }
        if let Some(password) = &patch.password {
            self.provider
                .update_account(
                    uid,
                    &AccountChanges {
                        password: Some(password.clone()),
                        ..Default::default()
                    },
                )
                .await?;
        }

        Ok(UserMirrorRepo::patch(&self.pool, uid, &patch).await?)
    }

    /// Delete a user from both backends. The provider delete runs first
    /// and is fatal on failure, so a surviving provider account never
    /// points at a deleted mirror row.
    pub async fn delete(&self, uid: &str) -> IdentityResult<()> {
        self.provider.delete_account(uid).await?;
        UserMirrorRepo::delete(&self.pool, uid).await?;
        tracing::info!(uid, "user deleted");
        Ok(())
    }

    /// Exchange a verified identity token for a session cookie. Stateless;
    /// there is no local session table.
    pub async fn login(&self, id_token: &str) -> IdentityResult<String> {
        self.provider
            .create_session_cookie(id_token, SESSION_TTL)
            .await
    }

    /// Decode a session token (unverified; see [`claims`]) and assemble the
    /// unified claims from the mirror and the provider.
    pub async fn token_info(&self, session_token: &str) -> IdentityResult<TokenInfo> {
        let uid = claims::session_subject(session_token)?;
        let row = UserMirrorRepo::full_by_uid(&self.pool, &uid).await?;
        let account = self.provider.account(&uid).await?;
        Ok(TokenInfo {
            uid: row.uid,
            username: row.username,
            email: row.email,
            display_name: row.display_name,
            image: row.image,
            sub_expiration: row.sub_expiration,
            email_verified: account.email_verified,
        })
    }

    /// Premium gate: succeeds only while the current time is strictly
    /// before the stored expiration.
    pub async fn check_sub_expiration(&self, uid: &str) -> IdentityResult<()> {
        let expires = UserMirrorRepo::sub_expiration(&self.pool, uid).await?;
        if Utc::now() < expires {
            Ok(())
        } else {
            Err(CoreError::SubscriptionExpired {
                expired_at: expires,
            }
            .into())
        }
    }

    /// Record a premium subscription: the subject comes from the session
    /// token (either claim shape), the expiration from the caller.
    pub async fn subscribe_to_premium(
        &self,
        session_token: &str,
        until: Timestamp,
    ) -> IdentityResult<Timestamp> {
        let uid = claims::session_subject(session_token)?;
        UserMirrorRepo::set_sub_expiration(&self.pool, &uid, until).await?;
        tracing::info!(%uid, %until, "premium subscription recorded");
        Ok(until)
    }

    /// Bulk-load provider accounts into the mirror (parameterized
    /// multi-row insert). Returns the number of rows inserted.
    pub async fn import_users(&self, rows: &[NewUserRow]) -> IdentityResult<u64> {
        let inserted = UserMirrorRepo::bulk_insert(&self.pool, rows).await?;
        tracing::info!(rows = inserted, "imported provider accounts into the mirror");
        Ok(inserted)
    }

    /// Mint a fresh verification link at the provider and send it.
    pub async fn send_verification_email(&self, email: &str) -> IdentityResult<()> {
        let link = self.provider.email_verification_link(email).await?;
        self.mailer.send_verification_link(email, &link).await?;
        Ok(())
    }
}
