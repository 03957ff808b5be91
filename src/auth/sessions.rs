//! Per-browser console sessions.
//!
//! Each signed-in browser owns its own [`AuthContext`], registered under a
//! random id carried in an HttpOnly cookie. Removing an entry drops the
//! context, which releases its session listener.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;
use uuid::Uuid;

use super::client::{HostedAuthClient, User};
use super::context::AuthContext;

/// Name of the cookie carrying the console session id
pub const SESSION_COOKIE: &str = "vendor_console_session";

/// Registry of signed-in browsers
pub struct SessionStore {
    client: HostedAuthClient,
    secure_cookies: bool,
    sessions: RwLock<HashMap<Uuid, Arc<AuthContext>>>,
}

impl SessionStore {
    /// `client` is the template every session's client is forked from
    pub fn new(client: HostedAuthClient, secure_cookies: bool) -> Self {
        Self {
            client,
            secure_cookies,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// A context with its own hosted session, not yet registered.
    ///
    /// Must be called from within a tokio runtime.
    pub fn unregistered(&self) -> Arc<AuthContext> {
        Arc::new(AuthContext::new(Arc::new(self.client.fork())))
    }

    /// Register a signed-in context and return its id
    pub fn insert(&self, context: Arc<AuthContext>) -> Uuid {
        let id = Uuid::new_v4();
        self.write().insert(id, context);
        debug!(session_id = %id, "Console session opened");
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<AuthContext>> {
        self.sessions
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .get(&id)
            .cloned()
    }

    pub fn remove(&self, id: Uuid) -> Option<Arc<AuthContext>> {
        let removed = self.write().remove(&id);
        if removed.is_some() {
            debug!(session_id = %id, "Console session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Session id named by the request's cookie, if it is still registered
    pub fn session_id(&self, jar: &CookieJar) -> Option<Uuid> {
        let id = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())?;
        self.get(id).map(|_| id)
    }

    /// Context belonging to the request's cookie
    pub fn context(&self, jar: &CookieJar) -> Option<Arc<AuthContext>> {
        self.session_id(jar).and_then(|id| self.get(id))
    }

    /// Signed-in user for the request's cookie
    pub fn user(&self, jar: &CookieJar) -> Option<User> {
        self.context(jar).and_then(|context| context.current_user())
    }

    pub fn session_cookie(&self, id: Uuid) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies)
            .build()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE).path("/").build()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Arc<AuthContext>>> {
        self.sessions
            .write()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}
