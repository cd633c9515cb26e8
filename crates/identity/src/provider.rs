//! The identity-provider port.
//!
//! Any provider offering equivalent operations (account CRUD, custom
//! claims, verification links, session cookies) can sit behind
//! [`IdentityProvider`]; [`crate::rest::RestIdentityProvider`] is the
//! production implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tarrasque_core::types::UserUid;

use crate::error::IdentityResult;

/// An account as the provider reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderAccount {
    pub uid: UserUid,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub disabled: bool,
}

/// Registration payload for a new provider account.
#[derive(Debug, Clone, Serialize)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub photo_url: Option<String>,
}

/// Partial account update; only the set fields are applied.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
}

/// One page of the provider's account listing.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountPage {
    pub accounts: Vec<ProviderAccount>,
    pub next_page_token: Option<String>,
}

/// Operations the repositories need from an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register an account; the provider mints and returns the uid.
    async fn create_account(&self, account: &NewAccount) -> IdentityResult<ProviderAccount>;

    /// Fetch an account by uid.
    async fn account(&self, uid: &str) -> IdentityResult<ProviderAccount>;

    /// Apply the set fields of `changes` to an account.
    async fn update_account(
        &self,
        uid: &str,
        changes: &AccountChanges,
    ) -> IdentityResult<ProviderAccount>;

    /// Delete an account by uid.
    async fn delete_account(&self, uid: &str) -> IdentityResult<()>;

    /// One page of the account listing; `None` token starts at the front.
    async fn list_accounts(&self, page_token: Option<&str>) -> IdentityResult<AccountPage>;

    /// Replace the custom claims attached to an account.
    async fn set_custom_claims(
        &self,
        uid: &str,
        claims: &serde_json::Value,
    ) -> IdentityResult<()>;

    /// Mint an email-verification link for the given address.
    async fn email_verification_link(&self, email: &str) -> IdentityResult<String>;

    /// Exchange a verified identity token for a session cookie.
    async fn create_session_cookie(&self, id_token: &str, ttl: Duration) -> IdentityResult<String>;
}
