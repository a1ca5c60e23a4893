//! Users service client for provisioning test users.
//!
//! Every request addresses `{USERS_URL}/{hash(email)}` and carries a freshly
//! minted service token. Batches fan out one request per user and wait for
//! all of them.

use crate::config::{E2eConfig, ServiceTokenSettings};
use crate::error::{E2eError, E2eResult};
use crate::hash::hash;
use crate::models::{CreateOutcome, StatusMismatch, TestUser};
use crate::service_token::create_service_token;
use futures::future::join_all;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, error};

/// HTTP client for the Users service.
#[derive(Debug, Clone)]
pub struct UsersClient {
    /// Base URL of the Users service (e.g. `http://localhost/v1/users`).
    base_url: String,
    token_settings: ServiceTokenSettings,
    http_client: Client,
}

impl UsersClient {
    /// Create a client from the loaded configuration.
    pub fn new(config: &E2eConfig) -> E2eResult<Self> {
        let http_client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("sso-e2e/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_http_client(
            config.users_url.clone(),
            config.service_token.clone(),
            http_client,
        ))
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(
        base_url: impl Into<String>,
        token_settings: ServiceTokenSettings,
        http_client: Client,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token_settings,
            http_client,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a user's record.
    #[must_use]
    pub fn user_url(&self, email: &str) -> String {
        format!("{}/{}", self.base_url, hash(email))
    }

    // ── Batch operations ──────────────────────────────────────────────

    /// Create every user, tolerating users that already exist.
    ///
    /// 201 and 400 both count as success. Any other status or a transport
    /// failure is logged and reported as [`CreateOutcome::Failed`]; the rest
    /// of the batch still runs. Outcomes are in input order.
    pub async fn create_users(&self, users: &[TestUser]) -> Vec<CreateOutcome> {
        join_all(users.iter().map(|user| self.create_user(user))).await
    }

    /// Delete every user. Response statuses are returned but not checked.
    ///
    /// # Errors
    ///
    /// Returns the first transport or token error.
    pub async fn cleanup_users(&self, users: &[TestUser]) -> E2eResult<Vec<StatusCode>> {
        join_all(users.iter().map(|user| self.delete_user(user)))
            .await
            .into_iter()
            .collect()
    }

    /// Check that looking up each user returns `expected`.
    ///
    /// # Errors
    ///
    /// Returns `E2eError::StatusMismatch` naming every user whose status
    /// differed, or the first transport error.
    pub async fn ensure_users(&self, users: &[TestUser], expected: StatusCode) -> E2eResult<()> {
        let statuses = join_all(users.iter().map(|user| self.fetch_user_status(user))).await;

        let mut mismatches = Vec::new();
        for (user, status) in users.iter().zip(statuses) {
            let status = status?;
            if status != expected {
                mismatches.push(StatusMismatch {
                    email: user.email.clone(),
                    expected: expected.as_u16(),
                    actual: status.as_u16(),
                });
            }
        }

        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(E2eError::StatusMismatch(mismatches))
        }
    }

    /// [`Self::ensure_users`] expecting `200 OK`.
    pub async fn ensure_users_exist(&self, users: &[TestUser]) -> E2eResult<()> {
        self.ensure_users(users, StatusCode::OK).await
    }

    // ── Single-user requests ──────────────────────────────────────────

    async fn create_user(&self, user: &TestUser) -> CreateOutcome {
        match self.try_create_user(user).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    email = %user.email,
                    error = %e,
                    "Unable to create user with Users service"
                );
                CreateOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_create_user(&self, user: &TestUser) -> E2eResult<CreateOutcome> {
        let url = self.user_url(&user.email);
        debug!(method = "POST", url = %url, email = %user.email, "creating user");

        let response = self
            .authorized(self.http_client.post(&url))?
            .json(user)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => Ok(CreateOutcome::Created),
            StatusCode::BAD_REQUEST => Ok(CreateOutcome::AlreadyExists),
            status => Err(E2eError::UnexpectedStatus {
                email: user.email.clone(),
                status: status.as_u16(),
            }),
        }
    }

    async fn delete_user(&self, user: &TestUser) -> E2eResult<StatusCode> {
        let url = self.user_url(&user.email);
        debug!(method = "DELETE", url = %url, email = %user.email, "deleting user");

        let response = self
            .authorized(self.http_client.delete(&url))?
            .send()
            .await?;
        Ok(response.status())
    }

    async fn fetch_user_status(&self, user: &TestUser) -> E2eResult<StatusCode> {
        let url = self.user_url(&user.email);
        let response = self.authorized(self.http_client.get(&url))?.send().await?;
        let status = response.status();
        debug!(
            method = "GET",
            url = %url,
            email = %user.email,
            status = status.as_u16(),
            "fetched user"
        );
        Ok(status)
    }

    fn authorized(&self, builder: RequestBuilder) -> E2eResult<RequestBuilder> {
        let token = create_service_token(&self.token_settings)?;
        Ok(builder.header(AUTHORIZATION, format!("bearer {token}")))
    }
}
