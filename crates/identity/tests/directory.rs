//! Integration tests for the dual-backend user directory, driven by an
//! in-memory provider and mailer against a real mirror database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::PgPool;
use tarrasque_core::error::CoreError;
use tarrasque_db::models::user::{NewUserRow, UserPatch};
use tarrasque_db::repositories::UserMirrorRepo;
use tarrasque_identity::directory::{NewUser, UserDirectory, UserUpdate};
use tarrasque_identity::email::{EmailError, VerificationMailer};
use tarrasque_identity::error::{IdentityError, IdentityResult};
use tarrasque_identity::provider::{
    AccountChanges, AccountPage, IdentityProvider, NewAccount, ProviderAccount,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// In-memory identity provider with failure toggles.
#[derive(Default)]
struct FakeProvider {
    accounts: Mutex<HashMap<String, ProviderAccount>>,
    claims: Mutex<HashMap<String, serde_json::Value>>,
    counter: AtomicU64,
    fail_claims: AtomicBool,
    fail_delete: AtomicBool,
}

impl FakeProvider {
    fn account_snapshot(&self, uid: &str) -> Option<ProviderAccount> {
        self.accounts.lock().unwrap().get(uid).cloned()
    }

    fn claims_snapshot(&self, uid: &str) -> Option<serde_json::Value> {
        self.claims.lock().unwrap().get(uid).cloned()
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn create_account(&self, account: &NewAccount) -> IdentityResult<ProviderAccount> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let created = ProviderAccount {
            uid: format!("uid-{n}"),
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            photo_url: account.photo_url.clone(),
            email_verified: false,
            disabled: false,
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(created.uid.clone(), created.clone());
        Ok(created)
    }

    async fn account(&self, uid: &str) -> IdentityResult<ProviderAccount> {
        self.account_snapshot(uid)
            .ok_or_else(|| IdentityError::Provider(format!("404: no account {uid}")))
    }

    async fn update_account(
        &self,
        uid: &str,
        changes: &AccountChanges,
    ) -> IdentityResult<ProviderAccount> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get_mut(uid)
            .ok_or_else(|| IdentityError::Provider(format!("404: no account {uid}")))?;
        if let Some(email) = &changes.email {
            account.email = email.clone();
        }
        if let Some(display_name) = &changes.display_name {
            account.display_name = display_name.clone();
        }
        // Password changes have no observable shape here.
        Ok(account.clone())
    }

    async fn delete_account(&self, uid: &str) -> IdentityResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(IdentityError::Provider("503: delete unavailable".into()));
        }
        self.accounts
            .lock()
            .unwrap()
            .remove(uid)
            .map(|_| ())
            .ok_or_else(|| IdentityError::Provider(format!("404: no account {uid}")))
    }

    async fn list_accounts(&self, page_token: Option<&str>) -> IdentityResult<AccountPage> {
        // One account per page, ordered by uid, to exercise paging.
        let mut uids: Vec<String> = self.accounts.lock().unwrap().keys().cloned().collect();
        uids.sort();
        let start = match page_token {
            Some(token) => uids.iter().position(|u| u == token).unwrap_or(uids.len()),
            None => 0,
        };
        let accounts = uids
            .get(start)
            .and_then(|uid| self.account_snapshot(uid))
            .into_iter()
            .collect();
        Ok(AccountPage {
            accounts,
            next_page_token: uids.get(start + 1).cloned(),
        })
    }

    async fn set_custom_claims(
        &self,
        uid: &str,
        claims: &serde_json::Value,
    ) -> IdentityResult<()> {
        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(IdentityError::Provider("500: claims unavailable".into()));
        }
        self.claims
            .lock()
            .unwrap()
            .insert(uid.to_string(), claims.clone());
        Ok(())
    }

    async fn email_verification_link(&self, email: &str) -> IdentityResult<String> {
        Ok(format!("https://id.fake/verify?email={email}"))
    }

    async fn create_session_cookie(
        &self,
        id_token: &str,
        ttl: Duration,
    ) -> IdentityResult<String> {
        Ok(format!("cookie:{id_token}:{}", ttl.as_secs()))
    }
}

/// Records outgoing mail instead of sending it.
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

#[async_trait]
impl VerificationMailer for RecordingMailer {
    async fn send_verification_link(&self, to: &str, link: &str) -> Result<(), EmailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmailError::Build("mailer offline".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), link.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    directory: UserDirectory,
    provider: Arc<FakeProvider>,
    mailer: Arc<RecordingMailer>,
}

fn harness(pool: PgPool) -> Harness {
    let provider = Arc::new(FakeProvider::default());
    let mailer = Arc::new(RecordingMailer::default());
    let directory = UserDirectory::new(pool, provider.clone(), mailer.clone());
    Harness {
        directory,
        provider,
        mailer,
    }
}

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password: "correct horse battery staple".to_string(),
        display_name: format!("{username} the Bold"),
        image: None,
    }
}

/// Sign a session-token payload; the directory never checks the signature.
fn session_token(payload: &serde_json::Value) -> String {
    encode(
        &Header::default(),
        payload,
        &EncodingKey::from_secret(b"irrelevant"),
    )
    .expect("encoding should succeed")
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn create_populates_both_backends_and_sends_mail(pool: PgPool) {
    let h = harness(pool.clone());

    let row = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap();

    // Provider side: account with default avatar, claims with the sentinel.
    let account = h.provider.account_snapshot(&row.uid).unwrap();
    assert_eq!(account.email, "aranel@example.com");
    assert_eq!(account.display_name, "aranel");
    assert!(account.photo_url.unwrap().contains("default-avatar"));

    let claims = h.provider.claims_snapshot(&row.uid).unwrap();
    assert_eq!(claims["displayName"], "aranel the Bold");
    assert!(claims["subExpiration"].as_str().unwrap().starts_with("1970"));

    // Mail side: one verification link to the new address.
    let sent = h.mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "aranel@example.com");
    assert!(sent[0].1.contains("verify"));

    // Mirror side: profile row keyed by the provider uid.
    let profile = UserMirrorRepo::find_by_uid(&pool, &row.uid).await.unwrap();
    assert_eq!(profile.username, "aranel");
    assert_eq!(profile.email, "aranel@example.com");
    assert_eq!(profile.display_name, "aranel the Bold");
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_aborts_before_mirror_when_claims_fail(pool: PgPool) {
    let h = harness(pool.clone());
    h.provider.fail_claims.store(true, Ordering::SeqCst);

    let err = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap_err();
    assert_matches!(err, IdentityError::Provider(_));

    // Rolled back: no provider account, no mail, no mirror row.
    assert!(h.provider.accounts.lock().unwrap().is_empty());
    assert!(h.mailer.sent.lock().unwrap().is_empty());
    assert!(UserMirrorRepo::list(&pool).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_rolls_back_provider_account_when_mirror_insert_fails(pool: PgPool) {
    let h = harness(pool.clone());

    // First registration takes uid-1.
    h.directory
        .create(new_user("first", "first@example.com"))
        .await
        .unwrap();

    // Occupy the uid the provider will mint next, so the mirror insert
    // collides on the primary key.
    UserMirrorRepo::insert(
        &pool,
        &NewUserRow {
            uid: "uid-2".to_string(),
            username: "squatter".to_string(),
            email: "squatter@example.com".to_string(),
            display_name: "Squatter".to_string(),
            image: None,
        },
    )
    .await
    .unwrap();

    let err = h
        .directory
        .create(new_user("second", "second@example.com"))
        .await
        .unwrap_err();
    assert_matches!(err, IdentityError::Db(_));

    // The half-registered provider account was compensated away.
    assert!(h.provider.account_snapshot("uid-2").is_none());
    // The first registration is untouched.
    assert!(h.provider.account_snapshot("uid-1").is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_rolls_back_when_mailer_fails(pool: PgPool) {
    let h = harness(pool.clone());
    h.mailer.fail.store(true, Ordering::SeqCst);

    let err = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap_err();
    assert_matches!(err, IdentityError::Email(_));

    assert!(h.provider.accounts.lock().unwrap().is_empty());
    assert!(UserMirrorRepo::list(&pool).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn get_by_name_scans_every_provider_page(pool: PgPool) {
    let h = harness(pool.clone());

    h.directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap();
    h.directory
        .create(new_user("brynn", "brynn@example.com"))
        .await
        .unwrap();
    // Same provider display name as the first user, on a later page.
    h.directory
        .create(new_user("aranel", "aranel2@example.com"))
        .await
        .unwrap();

    let matches = h.directory.get_by_name("aranel").await.unwrap();
    assert_eq!(matches.len(), 2);
    assert!(matches.iter().all(|p| p.username == "aranel"));

    let none = h.directory.get_by_name("nobody").await.unwrap();
    assert!(none.is_empty());
}

// ---------------------------------------------------------------------------
// Update / patch / delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn patch_display_name_keeps_email_unchanged(pool: PgPool) {
    let h = harness(pool.clone());
    let row = h
        .directory
        .create(new_user("aranel", "a@b.com"))
        .await
        .unwrap();

    let patched = h
        .directory
        .patch(
            &row.uid,
            UserPatch {
                display_name: Some("Bob".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.display_name, "Bob");
    assert_eq!(patched.email, "a@b.com");

    let reread = h.directory.get_by_uid(&row.uid).await.unwrap();
    assert_eq!(reread.display_name, "Bob");
    assert_eq!(reread.email, "a@b.com");
}

#[sqlx::test(migrations = "../../migrations")]
async fn patch_username_syncs_the_provider_display_name(pool: PgPool) {
    let h = harness(pool.clone());
    let row = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap();

    h.directory
        .patch(
            &row.uid,
            UserPatch {
                username: Some("aranel-renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let account = h.provider.account_snapshot(&row.uid).unwrap();
    assert_eq!(account.display_name, "aranel-renamed");
}

#[sqlx::test(migrations = "../../migrations")]
async fn empty_patch_fails_empty_update(pool: PgPool) {
    let h = harness(pool.clone());
    let row = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap();

    let err = h
        .directory
        .patch(&row.uid, UserPatch::default())
        .await
        .unwrap_err();
    assert_matches!(err, IdentityError::Core(CoreError::EmptyUpdate));
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_pushes_provider_changes_then_overwrites_mirror(pool: PgPool) {
    let h = harness(pool.clone());
    let row = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap();

    let profile = h
        .directory
        .update(
            &row.uid,
            UserUpdate {
                username: "aranel2".to_string(),
                email: "new@example.com".to_string(),
                password: None,
                display_name: "Aranel the Renamed".to_string(),
                image: Some("https://cdn.example/new.png".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(profile.username, "aranel2");
    assert_eq!(profile.email, "new@example.com");

    let account = h.provider.account_snapshot(&row.uid).unwrap();
    assert_eq!(account.email, "new@example.com");
    assert_eq!(account.display_name, "aranel2");
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_removes_both_backends(pool: PgPool) {
    let h = harness(pool.clone());
    let row = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap();

    h.directory.delete(&row.uid).await.unwrap();

    assert!(h.provider.account_snapshot(&row.uid).is_none());
    let err = UserMirrorRepo::find_by_uid(&pool, &row.uid).await.unwrap_err();
    assert_matches!(
        err,
        tarrasque_db::error::DbError::Core(CoreError::NotFound { .. })
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_aborts_mirror_delete_when_provider_fails(pool: PgPool) {
    let h = harness(pool.clone());
    let row = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap();

    h.provider.fail_delete.store(true, Ordering::SeqCst);
    let err = h.directory.delete(&row.uid).await.unwrap_err();
    assert_matches!(err, IdentityError::Provider(_));

    // Mirror row survives; nothing is orphaned.
    assert!(UserMirrorRepo::find_by_uid(&pool, &row.uid).await.is_ok());
}

// ---------------------------------------------------------------------------
// Sessions and premium gate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn login_exchanges_the_id_token_for_a_cookie(pool: PgPool) {
    let h = harness(pool);
    let cookie = h.directory.login("verified-id-token").await.unwrap();
    assert_eq!(cookie, format!("cookie:verified-id-token:{}", 60 * 60 * 48));
}

#[sqlx::test(migrations = "../../migrations")]
async fn token_info_merges_mirror_and_provider_state(pool: PgPool) {
    let h = harness(pool.clone());
    let row = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap();

    let token = session_token(&serde_json::json!({ "user_id": row.uid }));
    let info = h.directory.token_info(&token).await.unwrap();
    assert_eq!(info.uid, row.uid);
    assert_eq!(info.username, "aranel");
    assert_eq!(info.email, "aranel@example.com");
    assert_eq!(info.display_name, "aranel the Bold");
    assert!(!info.email_verified);
    assert_eq!(info.sub_expiration.timestamp(), 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn token_info_handles_the_nested_claim_shape(pool: PgPool) {
    let h = harness(pool.clone());
    let row = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap();

    let token = session_token(&serde_json::json!({
        "claims": { "user_id": row.uid }
    }));
    let info = h.directory.token_info(&token).await.unwrap();
    assert_eq!(info.uid, row.uid);
}

#[sqlx::test(migrations = "../../migrations")]
async fn fresh_account_fails_the_premium_gate(pool: PgPool) {
    let h = harness(pool.clone());
    let row = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap();

    // The registration sentinel is the epoch, which is never in the future.
    let err = h.directory.check_sub_expiration(&row.uid).await.unwrap_err();
    assert_matches!(err, IdentityError::Core(CoreError::SubscriptionExpired { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn subscribe_then_check_passes_until_the_expiration(pool: PgPool) {
    let h = harness(pool.clone());
    let row = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap();

    let until = Utc::now() + chrono::Duration::days(30);
    let token = session_token(&serde_json::json!({ "user_id": row.uid }));
    let stored = h.directory.subscribe_to_premium(&token, until).await.unwrap();
    assert_eq!(stored, until);

    h.directory.check_sub_expiration(&row.uid).await.unwrap();
}

#[sqlx::test(migrations = "../../migrations")]
async fn elapsed_expiration_fails_the_premium_gate(pool: PgPool) {
    let h = harness(pool.clone());
    let row = h
        .directory
        .create(new_user("aranel", "aranel@example.com"))
        .await
        .unwrap();

    // An expiration at or before now must fail; by execution time the
    // stored instant is never in the future.
    UserMirrorRepo::set_sub_expiration(&pool, &row.uid, Utc::now())
        .await
        .unwrap();
    let err = h.directory.check_sub_expiration(&row.uid).await.unwrap_err();
    assert_matches!(err, IdentityError::Core(CoreError::SubscriptionExpired { .. }));
}

// ---------------------------------------------------------------------------
// Imports and verification mail
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn import_users_bulk_inserts_mirror_rows(pool: PgPool) {
    let h = harness(pool.clone());

    let rows: Vec<NewUserRow> = (0..4)
        .map(|i| NewUserRow {
            uid: format!("import-{i}"),
            username: format!("import-user-{i}"),
            email: format!("import-{i}@example.com"),
            display_name: format!("Import {i}"),
            image: None,
        })
        .collect();

    let inserted = h.directory.import_users(&rows).await.unwrap();
    assert_eq!(inserted, 4);
    assert_eq!(UserMirrorRepo::list(&pool).await.unwrap().len(), 4);
}

#[sqlx::test(migrations = "../../migrations")]
async fn send_verification_email_forwards_the_provider_link(pool: PgPool) {
    let h = harness(pool);

    h.directory
        .send_verification_email("resend@example.com")
        .await
        .unwrap();

    let sent = h.mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "resend@example.com");
    assert_eq!(sent[0].1, "https://id.fake/verify?email=resend@example.com");
}
