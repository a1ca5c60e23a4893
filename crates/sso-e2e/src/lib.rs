//! End-to-end test helpers for the SAML-backed SSO login flow.
//!
//! This crate provides:
//! - Users service provisioning (`create_users`, `cleanup_users`, `ensure_users`)
//! - A browser-driven login/logout flow over any [`Page`]
//! - Extraction of the access token and state from the callback URL
//!
//! # Example
//!
//! ```rust,ignore
//! use sso_e2e::{flow, E2eConfig, TestUser, UsersClient, WebDriverPage};
//!
//! let config = E2eConfig::from_env()?;
//! let users = vec![TestUser::new("user1@example.com", "user1pass")];
//!
//! let client = UsersClient::new(&config)?;
//! client.create_users(&users).await;
//!
//! let page = WebDriverPage::connect(&config).await?;
//! page.goto("http://localhost:8888/auth.html").await?;
//! let result = flow::login(&page, "user1", "user1pass").await?;
//! assert!(result.jwt.is_some());
//!
//! client.cleanup_users(&users).await?;
//! ```

pub mod config;
pub mod error;
pub mod flow;
pub mod hash;
pub mod logging;
pub mod models;
pub mod page;
pub mod service_token;
pub mod users;

pub use config::{E2eConfig, ServiceTokenSettings, DEFAULT_USERS_URL};
pub use error::{ConfigError, E2eError, E2eResult};
pub use flow::{get_token_and_state, login, logout, token_and_state_from_url};
pub use hash::hash;
pub use models::{
    AccessTokenClaims, CreateOutcome, GithubProfile, StatusMismatch, TestUser, TokenAndState,
};
pub use page::{click_and_wait_for_navigation, Page, Selector, WaitUntil, WebDriverPage};
pub use service_token::{create_service_token, decode_unverified};
pub use users::UsersClient;
