//! Session guard for protected routes.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::SET_COOKIE, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::error;

use super::session::{self, SessionCheck};
use super::state::AuthState;
use super::AuthFlowError;
use crate::api::handlers::now_unix_seconds;

/// Admission ticket for protected handlers.
///
/// Extracting it runs the per-request session state machine: a missing or
/// unknown session bounces to the login page, an idle one is evicted with a
/// notice, and a live one has its activity clock refreshed before the target
/// handler runs.
pub struct RequireSession;

#[derive(Debug)]
pub enum GuardRejection {
    NotAuthenticated,
    SessionExpired,
    MissingState,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated => Redirect::to("/login").into_response(),
            Self::SessionExpired => {
                let mut headers = HeaderMap::new();
                if let Ok(cookie) =
                    session::flash_cookie("error", &AuthFlowError::SessionExpired.to_string())
                {
                    headers.append(SET_COOKIE, cookie);
                }
                if let Ok(cookie) = session::clear_session_cookie(false) {
                    headers.append(SET_COOKIE, cookie);
                }
                (headers, Redirect::to("/login")).into_response()
            }
            Self::MissingState => {
                error!("auth state missing from request extensions");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = parts
            .extensions
            .get::<Arc<AuthState>>()
            .cloned()
            .ok_or(GuardRejection::MissingState)?;

        let Some(token) = session::extract_session_token(&parts.headers) else {
            return Err(GuardRejection::NotAuthenticated);
        };

        let token_hash = session::hash_session_token(&token);
        match auth_state
            .sessions()
            .touch(&token_hash, now_unix_seconds())
            .await
        {
            SessionCheck::Active => Ok(RequireSession),
            SessionCheck::Expired => Err(GuardRejection::SessionExpired),
            SessionCheck::Missing => Err(GuardRejection::NotAuthenticated),
        }
    }
}
