//! Master-password auth: setup, login, logout, and password rotation.
//!
//! There are no user accounts. One credential row gates the whole app:
//!
//! - `/setup` runs once while the credential store is empty and signs the
//!   caller in.
//! - `/login` is rate limited per source address (failures only; successes do
//!   not clear the count) and appends every verified-or-not attempt to the
//!   ledger.
//! - `/logout` clears session state unconditionally.
//! - `/change_password` sits behind the session guard and re-checks the
//!   current password before rotating the hash.
//!
//! Outcomes a user can recover from travel as flash notices across redirects;
//! everything else is a 500 after logging.

pub mod attempts;
pub mod credentials;
mod guard;
pub mod password;
pub mod session;
mod state;

pub use guard::RequireSession;
pub use state::{AuthConfig, AuthState};

use anyhow::Context;
use axum::{
    extract::{ConnectInfo, Extension, Form},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use super::now_unix_seconds;
use credentials::CreateOutcome;

/// User-recoverable outcomes of the auth flows. The display strings double as
/// the flash messages shown on the next page render.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthFlowError {
    #[error("Setup has already been completed.")]
    AlreadyInitialized,
    #[error("Invalid password!")]
    InvalidCredentials,
    #[error("{0}")]
    WeakPassword(&'static str),
    #[error("Passwords do not match!")]
    PasswordMismatch,
    #[error("Too many failed login attempts. Please try again in 15 minutes.")]
    RateLimited,
    #[error("Session expired. Please login again.")]
    SessionExpired,
}

#[derive(Deserialize)]
pub struct SetupForm {
    password: SecretString,
    confirm_password: SecretString,
}

#[derive(Deserialize)]
pub struct LoginForm {
    password: SecretString,
}

#[derive(Deserialize)]
pub struct ChangePasswordForm {
    current_password: SecretString,
    new_password: SecretString,
    confirm_password: SecretString,
}

/// `GET /setup`: only reachable while no credential exists.
pub async fn setup_page(headers: HeaderMap, pool: Extension<SqlitePool>) -> Response {
    match credentials::exists(&pool).await {
        Ok(true) => Redirect::to("/login").into_response(),
        Ok(false) => render_form_page(&headers, "Set master password", SETUP_FORM),
        Err(err) => internal_error(&err),
    }
}

/// `POST /setup`: validate, store the credential, sign the caller in.
pub async fn setup(
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
    Form(form): Form<SetupForm>,
) -> Response {
    match credentials::exists(&pool).await {
        Ok(true) => return Redirect::to("/login").into_response(),
        Ok(false) => {}
        Err(err) => return internal_error(&err),
    }

    let password = form.password.expose_secret();
    if password != form.confirm_password.expose_secret() {
        return flash_redirect("/setup", "error", &AuthFlowError::PasswordMismatch.to_string());
    }
    if let Err(reason) = password::validate_strength(password) {
        return flash_redirect(
            "/setup",
            "error",
            &AuthFlowError::WeakPassword(reason).to_string(),
        );
    }

    let hash = match password::hash_password(password) {
        Ok(hash) => hash,
        Err(err) => return internal_error(&err),
    };

    let now = now_unix_seconds();
    match credentials::create(&pool, &hash, now).await {
        Ok(CreateOutcome::Created) => {}
        // Lost the race against another setup request.
        Ok(CreateOutcome::AlreadyInitialized) => {
            return flash_redirect(
                "/login",
                "error",
                &AuthFlowError::AlreadyInitialized.to_string(),
            );
        }
        Err(err) => return internal_error(&err),
    }

    match establish_session(&auth_state, now).await {
        Ok(cookie) => {
            let mut response_headers = HeaderMap::new();
            response_headers.append(SET_COOKIE, cookie);
            if let Ok(flash) = session::flash_cookie("success", "Setup complete! Welcome to Brandkit!")
            {
                response_headers.append(SET_COOKIE, flash);
            }
            (response_headers, Redirect::to("/")).into_response()
        }
        Err(err) => internal_error(&err),
    }
}

/// `GET /login`
pub async fn login_page(headers: HeaderMap) -> Response {
    render_form_page(&headers, "Login", LOGIN_FORM)
}

/// `POST /login`: rate limit per source address, then verify. Every attempt
/// that reaches verification lands in the ledger, success or not; a
/// rate-limited submission is turned away before verification and appends
/// nothing.
pub async fn login(
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let config = auth_state.config();
    let address = source_address(&headers, peer.map(|info| info.0));
    let now = now_unix_seconds();

    match attempts::is_allowed(
        &pool,
        &address,
        config.max_login_failures(),
        config.failure_window_seconds(),
        now,
    )
    .await
    {
        Ok(true) => {}
        Ok(false) => {
            return flash_redirect("/login", "error", &AuthFlowError::RateLimited.to_string())
        }
        Err(err) => return internal_error(&err),
    }

    let verified = match credentials::verify(&pool, form.password.expose_secret()).await {
        Ok(verified) => verified,
        Err(err) => return internal_error(&err),
    };

    if let Err(err) = attempts::record(&pool, &address, verified, now).await {
        return internal_error(&err);
    }

    if !verified {
        return flash_redirect(
            "/login",
            "error",
            &AuthFlowError::InvalidCredentials.to_string(),
        );
    }

    match establish_session(&auth_state, now).await {
        Ok(cookie) => {
            let mut response_headers = HeaderMap::new();
            response_headers.append(SET_COOKIE, cookie);
            if let Ok(flash) = session::flash_cookie("success", "Login successful!") {
                response_headers.append(SET_COOKIE, flash);
            }
            (response_headers, Redirect::to("/")).into_response()
        }
        Err(err) => internal_error(&err),
    }
}

/// `GET /logout`: clears session state unconditionally.
pub async fn logout(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    if let Some(token) = session::extract_session_token(&headers) {
        let token_hash = session::hash_session_token(&token);
        auth_state.sessions().remove(&token_hash).await;
    }

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = session::clear_session_cookie(auth_state.config().secure_cookies()) {
        response_headers.append(SET_COOKIE, cookie);
    }
    if let Ok(flash) = session::flash_cookie("success", "You have been logged out successfully.") {
        response_headers.append(SET_COOKIE, flash);
    }
    (response_headers, Redirect::to("/login")).into_response()
}

/// `GET /change_password`
pub async fn change_password_page(_session: RequireSession, headers: HeaderMap) -> Response {
    render_form_page(&headers, "Change password", CHANGE_PASSWORD_FORM)
}

/// `POST /change_password`: requires the current password, a matching
/// confirmation, and validator approval before rotating the hash.
pub async fn change_password(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Form(form): Form<ChangePasswordForm>,
) -> Response {
    match credentials::verify(&pool, form.current_password.expose_secret()).await {
        Ok(true) => {}
        Ok(false) => {
            return flash_redirect("/change_password", "error", "Current password is incorrect!")
        }
        Err(err) => return internal_error(&err),
    }

    let new_password = form.new_password.expose_secret();
    if new_password != form.confirm_password.expose_secret() {
        return flash_redirect(
            "/change_password",
            "error",
            &AuthFlowError::PasswordMismatch.to_string(),
        );
    }
    if let Err(reason) = password::validate_strength(new_password) {
        return flash_redirect(
            "/change_password",
            "error",
            &AuthFlowError::WeakPassword(reason).to_string(),
        );
    }

    let new_hash = match password::hash_password(new_password) {
        Ok(hash) => hash,
        Err(err) => return internal_error(&err),
    };
    if let Err(err) = credentials::update(&pool, &new_hash).await {
        return internal_error(&err);
    }

    flash_redirect("/", "success", "Password changed successfully!")
}

/// Resolve the caller's rate-limit key: the first `X-Forwarded-For` hop, else
/// the peer address, else the shared `"unknown"` bucket.
fn source_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    if let Some(address) = forwarded {
        return address;
    }
    peer.map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string())
}

async fn establish_session(auth_state: &AuthState, now: i64) -> anyhow::Result<HeaderValue> {
    let token = auth_state.sessions().create(now).await?;
    session::session_cookie(
        &token,
        auth_state.config().session_ttl_seconds(),
        auth_state.config().secure_cookies(),
    )
    .context("failed to build session cookie")
}

fn flash_redirect(target: &str, level: &str, message: &str) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(cookie) = session::flash_cookie(level, message) {
        headers.append(SET_COOKIE, cookie);
    }
    (headers, Redirect::to(target)).into_response()
}

fn internal_error(err: &anyhow::Error) -> Response {
    error!("auth flow failed: {err:#}");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

const SETUP_FORM: &str = r#"<form method="post" action="/setup">
  <label>Master password <input type="password" name="password" required></label>
  <label>Confirm password <input type="password" name="confirm_password" required></label>
  <button type="submit">Save</button>
</form>"#;

const LOGIN_FORM: &str = r#"<form method="post" action="/login">
  <label>Master password <input type="password" name="password" required></label>
  <button type="submit">Login</button>
</form>"#;

const CHANGE_PASSWORD_FORM: &str = r#"<form method="post" action="/change_password">
  <label>Current password <input type="password" name="current_password" required></label>
  <label>New password <input type="password" name="new_password" required></label>
  <label>Confirm new password <input type="password" name="confirm_password" required></label>
  <button type="submit">Change password</button>
</form>"#;

/// Render one of the auth form pages with any pending flash notice.
///
/// The flash cookie is cleared on the same response that displays it.
fn render_form_page(headers: &HeaderMap, title: &str, form: &str) -> Response {
    let flash = session::take_flash(headers);
    let notice = flash.as_ref().map_or_else(String::new, |flash| {
        format!(
            "<p class=\"flash {}\">{}</p>\n",
            escape_html(&flash.level),
            escape_html(&flash.message)
        )
    });
    let body = format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\">\
         <title>{title} - Brandkit</title></head>\n\
         <body><h1>{title}</h1>\n{notice}{form}</body></html>"
    );

    let mut response_headers = HeaderMap::new();
    if flash.is_some() {
        response_headers.append(SET_COOKIE, session::clear_flash_cookie());
    }
    (response_headers, Html(body)).into_response()
}

// The flash cookie is client-controlled, so its text never lands in the page
// unescaped.
fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn source_address_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        let peer = "9.9.9.9:1234".parse().ok();
        assert_eq!(source_address(&headers, peer), "1.2.3.4");
    }

    #[test]
    fn source_address_falls_back_to_peer() {
        let headers = HeaderMap::new();
        let peer = "9.9.9.9:1234".parse().ok();
        assert_eq!(source_address(&headers, peer), "9.9.9.9");
    }

    #[test]
    fn source_address_pools_unresolvable_callers() {
        let headers = HeaderMap::new();
        assert_eq!(source_address(&headers, None), "unknown");

        // An empty forwarded-for header is treated as absent.
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));
        assert_eq!(source_address(&headers, None), "unknown");
    }

    #[test]
    fn auth_flow_errors_read_as_flash_messages() {
        assert_eq!(
            AuthFlowError::RateLimited.to_string(),
            "Too many failed login attempts. Please try again in 15 minutes."
        );
        assert_eq!(
            AuthFlowError::WeakPassword("Password must contain at least one number").to_string(),
            "Password must contain at least one number"
        );
        assert_eq!(AuthFlowError::InvalidCredentials.to_string(), "Invalid password!");
    }

    #[test]
    fn escape_html_neutralizes_markup() {
        assert_eq!(
            escape_html(r#"<script>"&"</script>"#),
            "&lt;script&gt;&quot;&amp;&quot;&lt;/script&gt;"
        );
    }
}
