//! Integration test helpers for sso-e2e.
//!
//! Provides fixture users, a Users service client pointed at a wiremock
//! server, and a scripted in-memory [`Page`] that follows pre-registered
//! navigations.

#![allow(dead_code)]

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use regex::Regex;
use serde_json::json;
use sso_e2e::{
    E2eError, E2eResult, Page, Selector, ServiceTokenSettings, TestUser, UsersClient, WaitUntil,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use url::Url;
use wiremock::MockServer;

pub const TEST_SECRET: &str = "test-service-secret";
pub const TEST_ISSUER: &str = "http://localhost/v1/auth";
pub const TEST_AUDIENCE: &str = "http://localhost";

pub const APP_URL: &str = "http://localhost:8888/auth.html";
pub const IDP_FORM_URL: &str =
    "http://localhost:8081/simplesaml/module.php/core/loginuserpass.php?AuthState=_abc123";
pub const LOGIN_BUTTON: &str = "text=/.*Login.*/";

pub fn init_test_logging() {
    sso_e2e::logging::init_test_logging();
}

pub fn token_settings() -> ServiceTokenSettings {
    ServiceTokenSettings::new(TEST_SECRET, TEST_ISSUER, TEST_AUDIENCE)
}

/// A Users service client talking to `server` under `/v1/users`.
pub fn users_client(server: &MockServer) -> UsersClient {
    UsersClient::with_http_client(
        format!("{}/v1/users", server.uri()),
        token_settings(),
        reqwest::Client::new(),
    )
}

pub fn fixture_users() -> Vec<TestUser> {
    vec![
        TestUser::new("user1@example.com", "user1pass").with_name("Johannes", "Kepler"),
        TestUser::new("user2@example.com", "user2pass").with_name("Galileo", "Galilei"),
        TestUser::new("user3@example.com", "user3pass")
            .with_name("Tycho", "Brahe")
            .admin(),
    ]
}

/// An HS256 access token as the auth service would issue it.
pub fn access_token_for(email: &str) -> String {
    encode(
        &Header::default(),
        &json!({
            "sub": sso_e2e::hash(email),
            "email": email,
            "name": "Johannes Kepler",
            "roles": ["seneca"],
            "iss": TEST_ISSUER,
            "aud": TEST_AUDIENCE,
            "iat": 1_700_000_000,
            "exp": 1_700_003_600
        }),
        &EncodingKey::from_secret(b"auth-service-secret"),
    )
    .expect("encode access token")
}

pub fn login_callback_url(token: &str, state: &str) -> String {
    format!("{APP_URL}?access_token={token}&state={state}")
}

pub fn logout_callback_url(state: &str) -> String {
    format!("{APP_URL}?state={state}")
}

#[derive(Debug, Default)]
struct ScriptState {
    url: Option<Url>,
    elements: HashSet<String>,
    navigations: HashMap<String, Url>,
    values: HashMap<String, String>,
    clicks: Vec<String>,
}

/// In-memory page that navigates when scripted selectors are clicked.
///
/// Selectors are keyed by their display form (`#login`,
/// `input[name="username"]`, `text=/.*Login.*/`).
#[derive(Debug)]
pub struct ScriptedPage {
    state: Mutex<ScriptState>,
}

impl ScriptedPage {
    pub fn new(start_url: &str) -> Self {
        let state = ScriptState {
            url: Some(Url::parse(start_url).expect("valid start URL")),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// A page with the app's triggers, the IdP form and both callbacks
    /// scripted.
    pub fn sso_app(token: &str) -> Self {
        Self::new(APP_URL)
            .on_click("#login", IDP_FORM_URL)
            .with_element(r#"input[name="username"]"#)
            .with_element(r#"input[name="password"]"#)
            .on_click(LOGIN_BUTTON, &login_callback_url(token, "login-state"))
            .on_click("#logout", &logout_callback_url("logout-state"))
    }

    pub fn with_element(self, selector: &str) -> Self {
        self.lock().elements.insert(selector.to_string());
        self
    }

    pub fn without_element(self, selector: &str) -> Self {
        {
            let mut state = self.lock();
            state.elements.remove(selector);
            state.navigations.remove(selector);
        }
        self
    }

    pub fn on_click(self, selector: &str, navigate_to: &str) -> Self {
        {
            let mut state = self.lock();
            state.elements.insert(selector.to_string());
            state.navigations.insert(
                selector.to_string(),
                Url::parse(navigate_to).expect("valid navigation URL"),
            );
        }
        self
    }

    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.lock().values.get(selector).cloned()
    }

    pub fn current_url(&self) -> String {
        self.lock()
            .url
            .as_ref()
            .map(Url::to_string)
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().expect("script state poisoned")
    }
}

#[async_trait]
impl Page for ScriptedPage {
    async fn url(&self) -> E2eResult<Url> {
        self.lock()
            .url
            .clone()
            .ok_or_else(|| E2eError::Browser("page has no URL".to_string()))
    }

    async fn click(&self, selector: &Selector) -> E2eResult<()> {
        let key = selector.to_string();
        let mut state = self.lock();
        if !state.elements.contains(&key) {
            return Err(E2eError::ElementNotFound(key));
        }
        state.clicks.push(key.clone());
        if let Some(target) = state.navigations.get(&key).cloned() {
            state.url = Some(target);
        }
        Ok(())
    }

    async fn fill(&self, selector: &Selector, value: &str) -> E2eResult<()> {
        let key = selector.to_string();
        let mut state = self.lock();
        if !state.elements.contains(&key) {
            return Err(E2eError::ElementNotFound(key));
        }
        state.values.insert(key, value.to_string());
        Ok(())
    }

    async fn wait_for_navigation(
        &self,
        pattern: &Regex,
        _until: WaitUntil,
        from: &Url,
    ) -> E2eResult<Url> {
        let current = self
            .lock()
            .url
            .clone()
            .ok_or_else(|| E2eError::Browser("page has no URL".to_string()))?;
        if current != *from && pattern.is_match(current.as_str()) {
            Ok(current)
        } else {
            Err(E2eError::NavigationTimeout {
                pattern: pattern.as_str().to_string(),
                last_url: current.to_string(),
            })
        }
    }
}
