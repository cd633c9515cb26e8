//! REST client for the identity provider's admin API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{IdentityError, IdentityResult};
use crate::provider::{
    AccountChanges, AccountPage, IdentityProvider, NewAccount, ProviderAccount,
};

/// Configuration for the REST identity provider client.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Base URL of the provider admin API, e.g. `https://id.example.com`.
    pub base_url: String,
    /// Service token sent as a Bearer credential on every request.
    pub service_token: String,
}

impl IdentityConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                  | Required |
    /// |--------------------------|----------|
    /// | `IDENTITY_BASE_URL`      | **yes**  |
    /// | `IDENTITY_SERVICE_TOKEN` | **yes**  |
    ///
    /// # Panics
    ///
    /// Panics if either variable is missing.
    pub fn from_env() -> Self {
        let base_url = std::env::var("IDENTITY_BASE_URL")
            .expect("IDENTITY_BASE_URL must be set in the environment");
        let service_token = std::env::var("IDENTITY_SERVICE_TOKEN")
            .expect("IDENTITY_SERVICE_TOKEN must be set in the environment");
        Self {
            base_url,
            service_token,
        }
    }
}

/// Response returned by the verification-link endpoint.
#[derive(Debug, Deserialize)]
struct LinkResponse {
    link: String,
}

/// Response returned by the session-cookie endpoint.
#[derive(Debug, Deserialize)]
struct CookieResponse {
    cookie: String,
}

/// HTTP implementation of [`IdentityProvider`].
pub struct RestIdentityProvider {
    client: reqwest::Client,
    config: IdentityConfig,
}

impl RestIdentityProvider {
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`] (useful for
    /// connection pooling with other outbound calls).
    pub fn with_client(client: reqwest::Client, config: IdentityConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.config.base_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.config.service_token)
    }

    /// Ensure the response has a success status code, or turn the status
    /// and body into a provider error.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, IdentityError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(IdentityError::Provider(format!("{status}: {body}")));
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, IdentityError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), IdentityError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn create_account(&self, account: &NewAccount) -> IdentityResult<ProviderAccount> {
        let response = self
            .authorized(self.client.post(self.url("/accounts")))
            .json(account)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn account(&self, uid: &str) -> IdentityResult<ProviderAccount> {
        let response = self
            .authorized(self.client.get(self.url(&format!("/accounts/{uid}"))))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn update_account(
        &self,
        uid: &str,
        changes: &AccountChanges,
    ) -> IdentityResult<ProviderAccount> {
        let response = self
            .authorized(self.client.patch(self.url(&format!("/accounts/{uid}"))))
            .json(changes)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn delete_account(&self, uid: &str) -> IdentityResult<()> {
        let response = self
            .authorized(self.client.delete(self.url(&format!("/accounts/{uid}"))))
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn list_accounts(&self, page_token: Option<&str>) -> IdentityResult<AccountPage> {
        let mut request = self.authorized(self.client.get(self.url("/accounts")));
        if let Some(token) = page_token {
            request = request.query(&[("page_token", token)]);
        }
        let response = request.send().await?;
        Self::parse_response(response).await
    }

    async fn set_custom_claims(
        &self,
        uid: &str,
        claims: &serde_json::Value,
    ) -> IdentityResult<()> {
        let response = self
            .authorized(
                self.client
                    .put(self.url(&format!("/accounts/{uid}/claims"))),
            )
            .json(claims)
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn email_verification_link(&self, email: &str) -> IdentityResult<String> {
        let response = self
            .authorized(self.client.post(self.url("/verification-links")))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        let link: LinkResponse = Self::parse_response(response).await?;
        Ok(link.link)
    }

    async fn create_session_cookie(
        &self,
        id_token: &str,
        ttl: Duration,
    ) -> IdentityResult<String> {
        let response = self
            .authorized(self.client.post(self.url("/session-cookies")))
            .json(&serde_json::json!({
                "id_token": id_token,
                "ttl_secs": ttl.as_secs(),
            }))
            .send()
            .await?;
        let cookie: CookieResponse = Self::parse_response(response).await?;
        Ok(cookie.cookie)
    }
}
