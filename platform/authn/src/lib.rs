//! Login exchange against the tinyauth service and the session cookie
//! contract.
//!
//! Tokens are opaque strings: nothing here parses or verifies them, and
//! the cookie lifetime is fixed at issuance rather than read out of the
//! token.

use axum_extra::extract::cookie::Cookie;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tinyauth_authz::{AuthClient, AuthzError};
use tracing::debug;

pub const SESSION_COOKIE: &str = "tinysess";
pub const CSRF_COOKIE: &str = "tinycsrf";

/// Fixed session horizon, deliberately independent of any expiry the
/// token itself may encode.
pub const SESSION_TTL: Duration = Duration::hours(8);

#[derive(Debug, Error)]
pub enum AuthnError {
    /// The service answered but did not grant a session token; the body
    /// rides along for the caller to surface.
    #[error("login rejected by the authorization service")]
    Rejected(Map<String, Value>),
    /// Transport failure. Not caught here; the embedding application's
    /// general error path decides how it surfaces.
    #[error(transparent)]
    Transport(#[from] AuthzError),
}

/// Raw credentials as posted by the login form. No local validation; the
/// remote service owns all rejection logic.
#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// What a successful login yields: a session token, and a CSRF token when
/// the service runs the cookie double-submit strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct LoginTokens {
    pub token: String,
    pub csrf: Option<String>,
}

/// Post credentials to the service and pull the tokens out of the reply.
pub async fn exchange(
    client: &AuthClient,
    credentials: &Credentials,
) -> Result<LoginTokens, AuthnError> {
    let body = json!({
        "username": credentials.username,
        "password": credentials.password,
        "csrf-strategy": "cookie",
    });
    let response = client.call("get-token-for-login", &body).await?;
    debug!(username = %credentials.username, "login exchange completed");
    parse_tokens(response)
}

fn parse_tokens(response: Map<String, Value>) -> Result<LoginTokens, AuthnError> {
    match response.get("token").and_then(Value::as_str) {
        Some(token) => Ok(LoginTokens {
            token: token.to_string(),
            csrf: response
                .get("csrf")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        None => Err(AuthnError::Rejected(response)),
    }
}

/// Build the session cookie, plus the CSRF cookie when the service issued
/// one; both expire [`SESSION_TTL`] after `now`.
///
/// The session cookie is http-only. The CSRF cookie must stay readable
/// from client script for the double-submit echo, so it is secure but not
/// http-only.
pub fn issue_cookies(
    tokens: &LoginTokens,
    now: OffsetDateTime,
) -> (Cookie<'static>, Option<Cookie<'static>>) {
    let expires = now + SESSION_TTL;
    let session = Cookie::build((SESSION_COOKIE, tokens.token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .expires(expires)
        .build();
    let csrf = tokens.csrf.as_ref().map(|value| {
        Cookie::build((CSRF_COOKIE, value.clone()))
            .path("/")
            .http_only(false)
            .secure(true)
            .expires(expires)
            .build()
    });
    (session, csrf)
}

/// Expired replacements for both cookies. Set unconditionally on logout,
/// whether or not the client still holds them.
pub fn clear_cookies() -> [Cookie<'static>; 2] {
    [expired(SESSION_COOKIE), expired(CSRF_COOKIE)]
}

fn expired(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}
