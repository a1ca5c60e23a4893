//! SAML-backed login and logout through the browser.
//!
//! The app under test starts the flow from a page exposing `#login` and
//! `#logout` triggers. The identity provider renders a username/password form;
//! on success the browser lands back on the local `auth.html` callback with
//! `access_token` and `state` on the query string. Logging out lands on the
//! same callback carrying only `state`.

use crate::error::E2eResult;
use crate::models::TokenAndState;
use crate::page::{click_and_wait_for_navigation, Page, Selector, WaitUntil};
use crate::service_token::decode_unverified;
use regex::Regex;
use std::sync::LazyLock;
use tracing::info;
use url::Url;

pub const LOGIN_TRIGGER: &str = "#login";
pub const LOGOUT_TRIGGER: &str = "#logout";
pub const USERNAME_INPUT: &str = r#"input[name="username"]"#;
pub const PASSWORD_INPUT: &str = r#"input[name="password"]"#;

/// The identity provider's username/password form.
static IDP_LOGIN_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"simplesaml/module\.php/core/loginuserpass\.php")
        .expect("IDP_LOGIN_FORM is a valid regex pattern")
});

/// Callback after a successful login.
static LOGIN_CALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^http://localhost:\d+/auth\.html\?access_token=[^&]+&state=")
        .expect("LOGIN_CALLBACK is a valid regex pattern")
});

/// Callback after logout.
static LOGOUT_CALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^http://localhost:\d+/auth\.html\?state=")
        .expect("LOGOUT_CALLBACK is a valid regex pattern")
});

/// Submit button on the identity provider's form.
static LOGIN_BUTTON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*Login.*").expect("LOGIN_BUTTON is a valid regex pattern"));

/// Run the full login flow and return the token and state from the callback.
///
/// # Errors
///
/// Fails if an element is missing or a navigation wait times out.
pub async fn login<P: Page + ?Sized>(
    page: &P,
    username: &str,
    password: &str,
) -> E2eResult<TokenAndState> {
    info!(username, "starting SSO login");

    click_and_wait_for_navigation(
        page,
        &Selector::css(LOGIN_TRIGGER),
        &IDP_LOGIN_FORM,
        WaitUntil::NetworkIdle,
    )
    .await?;

    let username_input = Selector::css(USERNAME_INPUT);
    page.click(&username_input).await?;
    page.fill(&username_input, username).await?;

    let password_input = Selector::css(PASSWORD_INPUT);
    page.click(&password_input).await?;
    page.fill(&password_input, password).await?;

    click_and_wait_for_navigation(
        page,
        &Selector::Text(LOGIN_BUTTON.clone()),
        &LOGIN_CALLBACK,
        WaitUntil::Load,
    )
    .await?;

    let result = get_token_and_state(page).await?;
    info!(
        username,
        has_token = result.access_token.is_some(),
        "SSO login complete"
    );
    Ok(result)
}

/// Log out of a logged-in session and return the callback's state.
///
/// # Errors
///
/// Fails if `#logout` is missing or the callback never loads.
pub async fn logout<P: Page + ?Sized>(page: &P) -> E2eResult<TokenAndState> {
    info!("starting SSO logout");

    click_and_wait_for_navigation(
        page,
        &Selector::css(LOGOUT_TRIGGER),
        &LOGOUT_CALLBACK,
        WaitUntil::Load,
    )
    .await?;

    get_token_and_state(page).await
}

/// Read `access_token` and `state` from the page's current URL.
pub async fn get_token_and_state<P: Page + ?Sized>(page: &P) -> E2eResult<TokenAndState> {
    let url = page.url().await?;
    Ok(token_and_state_from_url(&url))
}

/// Read `access_token` and `state` from a URL's query string.
///
/// The first occurrence of each parameter wins. The token's claims are
/// decoded without verification; an empty or undecodable token leaves `jwt`
/// empty.
#[must_use]
pub fn token_and_state_from_url(url: &Url) -> TokenAndState {
    let mut access_token = None;
    let mut state = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "access_token" if access_token.is_none() => access_token = Some(value.into_owned()),
            "state" if state.is_none() => state = Some(value.into_owned()),
            _ => {}
        }
    }

    let jwt = access_token
        .as_deref()
        .filter(|token| !token.is_empty())
        .and_then(decode_unverified);

    TokenAndState {
        access_token,
        state,
        jwt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn token() -> String {
        encode(
            &Header::default(),
            &json!({ "sub": "a1b2c3d4e5", "email": "user1@example.com" }),
            &EncodingKey::from_secret(b"idp-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_no_query_returns_all_none() {
        let url = Url::parse("http://localhost:8888/auth.html").unwrap();
        assert_eq!(token_and_state_from_url(&url), TokenAndState::default());
    }

    #[test]
    fn test_token_and_state() {
        let url = Url::parse(&format!(
            "http://localhost:8888/auth.html?access_token={}&state=abc123",
            token()
        ))
        .unwrap();

        let result = token_and_state_from_url(&url);

        assert_eq!(result.access_token.as_deref(), Some(token().as_str()));
        assert_eq!(result.state.as_deref(), Some("abc123"));
        let jwt = result.jwt.unwrap();
        assert_eq!(jwt.sub(), Some("a1b2c3d4e5"));
        assert_eq!(jwt.email(), Some("user1@example.com"));
    }

    #[test]
    fn test_state_only() {
        let url = Url::parse("http://localhost:8888/auth.html?state=xyz").unwrap();
        let result = token_and_state_from_url(&url);

        assert_eq!(result.access_token, None);
        assert_eq!(result.state.as_deref(), Some("xyz"));
        assert!(result.jwt.is_none());
    }

    #[test]
    fn test_state_is_percent_decoded() {
        let url = Url::parse("http://localhost:8888/auth.html?state=a%20b%2Fc").unwrap();
        assert_eq!(token_and_state_from_url(&url).state.as_deref(), Some("a b/c"));
    }

    #[test]
    fn test_opaque_token_has_no_claims() {
        let url =
            Url::parse("http://localhost:8888/auth.html?access_token=opaque&state=s").unwrap();
        let result = token_and_state_from_url(&url);

        assert_eq!(result.access_token.as_deref(), Some("opaque"));
        assert!(result.jwt.is_none());
    }

    #[test]
    fn test_empty_token_is_kept_without_claims() {
        let url = Url::parse("http://localhost:8888/auth.html?access_token=&state=s").unwrap();
        let result = token_and_state_from_url(&url);

        assert_eq!(result.access_token.as_deref(), Some(""));
        assert!(result.jwt.is_none());
    }

    #[test]
    fn test_first_parameter_wins() {
        let url = Url::parse("http://localhost:8888/auth.html?state=first&state=second").unwrap();
        assert_eq!(token_and_state_from_url(&url).state.as_deref(), Some("first"));
    }

    #[test]
    fn test_callback_patterns() {
        assert!(IDP_LOGIN_FORM.is_match(
            "http://localhost:8081/simplesaml/module.php/core/loginuserpass.php?AuthState=x"
        ));
        assert!(LOGIN_CALLBACK.is_match("http://localhost:8888/auth.html?access_token=t&state=s"));
        assert!(!LOGIN_CALLBACK.is_match("http://localhost:8888/auth.html?state=s"));
        assert!(LOGOUT_CALLBACK.is_match("http://localhost:8888/auth.html?state=s"));
        assert!(!LOGOUT_CALLBACK.is_match("http://localhost:8888/auth.html?access_token=t&state=s"));
        assert!(LOGIN_BUTTON.is_match("Login"));
    }
}
