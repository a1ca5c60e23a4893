//! Data types shared by the provisioning helpers and the browser flow.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A test user known to both the identity provider and the Users service.
///
/// Serialized as the camelCase JSON body the Users service expects. The
/// password only ever goes into the identity provider's login form, so it is
/// never serialized.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestUser {
    pub email: String,

    #[serde(skip_serializing, default)]
    pub password: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_admin: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_flagged: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feeds: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubProfile>,

    /// Any other profile fields, passed through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestUser {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
            display_name: None,
            is_admin: false,
            is_flagged: false,
            feeds: Vec::new(),
            github: None,
            extra: Map::new(),
        }
    }

    /// Set first and last name; the display name becomes "First Last".
    #[must_use]
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        let first = first.into();
        let last = last.into();
        self.display_name = Some(format!("{first} {last}"));
        self.first_name = Some(first);
        self.last_name = Some(last);
        self
    }

    #[must_use]
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    #[must_use]
    pub fn with_github(mut self, username: impl Into<String>, avatar_url: impl Into<String>) -> Self {
        self.github = Some(GithubProfile {
            username: username.into(),
            avatar_url: avatar_url.into(),
        });
        self
    }

    /// Add an arbitrary profile field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Debug for TestUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestUser")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

/// GitHub account linked to a user profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GithubProfile {
    pub username: String,
    pub avatar_url: String,
}

/// Per-user result of a create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// 201: the user was created.
    Created,
    /// 400: the user already existed.
    AlreadyExists,
    /// Anything else; logged and swallowed by the batch.
    Failed(String),
}

impl CreateOutcome {
    /// Created and already-existing users both count as provisioned.
    #[must_use]
    pub fn is_provisioned(&self) -> bool {
        matches!(self, CreateOutcome::Created | CreateOutcome::AlreadyExists)
    }
}

/// A user whose Users service lookup did not return the expected status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMismatch {
    pub email: String,
    pub expected: u16,
    pub actual: u16,
}

/// Access token and state pulled off the callback URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenAndState {
    pub access_token: Option<String>,
    pub state: Option<String>,
    /// Claims of `access_token`, decoded without verifying the signature.
    pub jwt: Option<AccessTokenClaims>,
}

/// Claims of a decoded (unverified) access token.
///
/// Kept as a raw claim map so tokens from any issuer decode; the accessors
/// cover the registered claims tests usually look at.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct AccessTokenClaims(Map<String, Value>);

impl AccessTokenClaims {
    #[must_use]
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Look up any claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn sub(&self) -> Option<&str> {
        self.get_str("sub")
    }

    #[must_use]
    pub fn iss(&self) -> Option<&str> {
        self.get_str("iss")
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    /// `aud` may be a single string or an array.
    #[must_use]
    pub fn audiences(&self) -> Vec<&str> {
        match self.get("aud") {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(auds)) => auds.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn roles(&self) -> Vec<&str> {
        match self.get("roles") {
            Some(Value::Array(roles)) => roles.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles().contains(&role)
    }

    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.get_timestamp("iat")
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.get_timestamp("exp")
    }

    /// Raw claim map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    fn get_timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        let secs = self.get(name).and_then(|v| {
            v.as_i64()
                // Some issuers emit fractional seconds.
                .or_else(|| v.as_f64().map(|f| f as i64))
        })?;
        Utc.timestamp_opt(secs, 0).single()
    }
}
