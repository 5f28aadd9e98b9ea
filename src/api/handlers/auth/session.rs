//! Server-side session store, cookies, and flash notices.
//!
//! Sessions are deliberately never persisted: the store maps the SHA-256 hash
//! of a random cookie token to a last-activity timestamp. Presence in the map
//! is the authenticated flag; sitting idle past the TTL evicts the entry. The
//! cookie's `Max-Age` only makes it outlive the browser process; the
//! server-side inactivity check is authoritative.

use anyhow::{Context, Result};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::Mutex;

pub(crate) const SESSION_COOKIE_NAME: &str = "brandkit_session";
pub(crate) const FLASH_COOKIE_NAME: &str = "brandkit_flash";

/// Result of checking a presented session token against the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCheck {
    /// No session is known for the token.
    Missing,
    /// The session existed but sat idle past the TTL; it has been dropped.
    Expired,
    /// The session is live and its activity clock was reset.
    Active,
}

struct SessionEntry {
    last_activity: i64,
}

/// In-memory session store keyed by token hash.
pub struct SessionStore {
    ttl_seconds: i64,
    sessions: Mutex<HashMap<Vec<u8>, SessionEntry>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            ttl_seconds,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create a session and return the raw cookie token.
    ///
    /// Expired entries are pruned on the way in so the map only ever holds
    /// live sessions.
    ///
    /// # Errors
    /// Returns an error if the system RNG fails.
    pub async fn create(&self, now: i64) -> Result<String> {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);
        let ttl = self.ttl_seconds;
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| now - entry.last_activity <= ttl);
        sessions.insert(token_hash, SessionEntry { last_activity: now });
        Ok(token)
    }

    /// Check a token and refresh its activity clock.
    ///
    /// A session idle for exactly the TTL is still valid; one second past it
    /// is expired and removed.
    pub async fn touch(&self, token_hash: &[u8], now: i64) -> SessionCheck {
        let mut sessions = self.sessions.lock().await;
        let Some(entry) = sessions.get_mut(token_hash) else {
            return SessionCheck::Missing;
        };
        if now - entry.last_activity > self.ttl_seconds {
            sessions.remove(token_hash);
            return SessionCheck::Expired;
        }
        entry.last_activity = now;
        SessionCheck::Active
    }

    /// Drop a session. Logout is idempotent; unknown tokens are fine.
    pub async fn remove(&self, token_hash: &[u8]) {
        self.sessions.lock().await.remove(token_hash);
    }
}

/// One-shot user notice carried across a redirect in a short-lived cookie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flash {
    pub level: String,
    pub message: String,
}

/// Create a new session token for the auth cookie.
/// The raw value is only returned to set the cookie; the store keeps a hash.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a session token so raw values never sit in the store.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Build the persistent `HttpOnly` cookie for the session token.
pub(crate) fn session_cookie(
    token: &str,
    ttl_seconds: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Set a flash notice for the next page render.
/// The payload is base64 so arbitrary message text survives cookie syntax.
pub(crate) fn flash_cookie(level: &str, message: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let payload =
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(format!("{level}:{message}"));
    HeaderValue::from_str(&format!(
        "{FLASH_COOKIE_NAME}={payload}; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
    ))
}

pub(crate) fn clear_flash_cookie() -> HeaderValue {
    HeaderValue::from_static("brandkit_flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Read the pending flash notice, if any.
pub(crate) fn take_flash(headers: &HeaderMap) -> Option<Flash> {
    let raw = cookie_value(headers, FLASH_COOKIE_NAME)?;
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(raw.as_bytes())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (level, message) = decoded.split_once(':')?;
    Some(Flash {
        level: level.to_string(),
        message: message.to_string(),
    })
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, SESSION_COOKIE_NAME)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    const TTL: i64 = 8 * 60 * 60;

    #[tokio::test]
    async fn touch_refreshes_live_session() {
        let store = SessionStore::new(TTL);
        let token = store.create(1_000).await.expect("create");
        let hash = hash_session_token(&token);

        assert_eq!(store.touch(&hash, 2_000).await, SessionCheck::Active);
        // The clock was reset at 2_000, so TTL now counts from there.
        assert_eq!(store.touch(&hash, 2_000 + TTL).await, SessionCheck::Active);
    }

    #[tokio::test]
    async fn touch_is_inclusive_at_the_ttl_boundary() {
        let store = SessionStore::new(TTL);
        let token = store.create(1_000).await.expect("create");
        let hash = hash_session_token(&token);

        // Exactly TTL old: still valid.
        assert_eq!(store.touch(&hash, 1_000 + TTL).await, SessionCheck::Active);
    }

    #[tokio::test]
    async fn touch_expires_one_second_past_the_ttl() {
        let store = SessionStore::new(TTL);
        let token = store.create(1_000).await.expect("create");
        let hash = hash_session_token(&token);

        assert_eq!(
            store.touch(&hash, 1_000 + TTL + 1).await,
            SessionCheck::Expired
        );
        // The entry is gone; a second probe reports missing, not expired.
        assert_eq!(store.touch(&hash, 1_000 + TTL + 1).await, SessionCheck::Missing);
    }

    #[tokio::test]
    async fn unknown_token_is_missing() {
        let store = SessionStore::new(TTL);
        let hash = hash_session_token("never-issued");
        assert_eq!(store.touch(&hash, 1_000).await, SessionCheck::Missing);
    }

    #[tokio::test]
    async fn remove_drops_the_session() {
        let store = SessionStore::new(TTL);
        let token = store.create(1_000).await.expect("create");
        let hash = hash_session_token(&token);

        store.remove(&hash).await;
        assert_eq!(store.touch(&hash, 1_001).await, SessionCheck::Missing);
    }

    #[test]
    fn generate_session_token_round_trip() {
        let decoded_len = generate_session_token()
            .ok()
            .and_then(|token| URL_SAFE_NO_PAD.decode(token.as_bytes()).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(32));
    }

    #[test]
    fn hash_session_token_stable() {
        let first = hash_session_token("token");
        let second = hash_session_token("token");
        let different = hash_session_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
    }

    #[test]
    fn session_cookie_carries_attributes() {
        let cookie = session_cookie("tok", 28_800, false).expect("cookie");
        let value = cookie.to_str().expect("ascii");
        assert!(value.starts_with("brandkit_session=tok;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=28800"));
        assert!(!value.contains("Secure"));

        let secure = session_cookie("tok", 28_800, true).expect("cookie");
        assert!(secure.to_str().expect("ascii").contains("; Secure"));
    }

    #[test]
    fn extract_session_token_finds_our_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=x; brandkit_session=abc123; theme=dark"),
        );
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_session_token_none_when_absent() {
        let headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn flash_round_trip() {
        let cookie = flash_cookie("error", "Session expired. Please login again.").expect("flash");
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie_as_request(&cookie));

        let flash = take_flash(&headers).expect("flash present");
        assert_eq!(flash.level, "error");
        assert_eq!(flash.message, "Session expired. Please login again.");
    }

    // Turn a Set-Cookie value into the Cookie header a client would send back.
    fn cookie_as_request(set_cookie: &HeaderValue) -> HeaderValue {
        let pair = set_cookie
            .to_str()
            .expect("ascii")
            .split(';')
            .next()
            .expect("pair")
            .to_string();
        HeaderValue::from_str(&pair).expect("cookie")
    }
}
