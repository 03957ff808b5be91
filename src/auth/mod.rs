//! # Authentication
//!
//! Sign-in is delegated to the hosted auth service. This module exposes the
//! HTTP client for that service, the [`AuthContext`] holding one browser's
//! session, the [`SessionStore`] mapping session cookies to contexts, and
//! extractors guarding console pages and API routes.

pub mod client;
pub mod context;
pub mod sessions;

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;

pub use client::{AuthError, HostedAuthClient, Session, SignUpOutcome, User};
pub use context::{AuthContext, AuthState, Subscription};
pub use sessions::{SESSION_COOKIE, SessionStore};

use crate::error::{ApiError, unauthorized};

/// Signed-in user for console pages; anonymous requests are sent to `/login`
#[derive(Debug, Clone)]
pub struct SignedInUser(pub User);

/// Signed-in user for JSON API routes; anonymous requests get a 401
#[derive(Debug, Clone)]
pub struct ApiUser(pub User);

impl<S> FromRequestParts<S> for SignedInUser
where
    Arc<SessionStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = Arc::<SessionStore>::from_ref(state);
        sessions
            .user(&CookieJar::from_headers(&parts.headers))
            .map(SignedInUser)
            .ok_or_else(|| Redirect::to("/login"))
    }
}

impl<S> FromRequestParts<S> for ApiUser
where
    Arc<SessionStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = Arc::<SessionStore>::from_ref(state);
        sessions
            .user(&CookieJar::from_headers(&parts.headers))
            .map(ApiUser)
            .ok_or_else(|| unauthorized(Some("Sign in to the console first")))
    }
}
