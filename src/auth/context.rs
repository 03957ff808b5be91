//! Session state shared with the console.
//!
//! [`AuthContext`] mirrors the hosted client's session into a small
//! [`AuthState`] (current user plus a loading flag) and forwards sign-in,
//! sign-up and sign-out to the client. The mirror is kept current by a
//! listener on the client's session channel; dropping the context releases
//! that listener.

use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::client::{AuthError, HostedAuthClient, Session, SignUpOutcome, User};

/// Snapshot of the console's view of authentication
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    /// True until the initial session has been resolved
    pub loading: bool,
}

impl AuthState {
    fn apply(&mut self, session: Option<&Session>) {
        self.user = session.map(|s| s.user.clone());
        self.loading = false;
    }
}

/// Session-change subscription; the listener stops when this is dropped
pub struct Subscription {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Auth state and operations for the console
pub struct AuthContext {
    client: Arc<HostedAuthClient>,
    state: Arc<RwLock<AuthState>>,
    subscription: Subscription,
}

impl AuthContext {
    /// Subscribe to `client` and start mirroring its session.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(client: Arc<HostedAuthClient>) -> Self {
        let state = Arc::new(RwLock::new(AuthState {
            user: None,
            loading: true,
        }));
        let subscription = subscribe(client.on_auth_state_change(), Arc::clone(&state));

        Self {
            client,
            state,
            subscription,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poison| poison.into_inner().clone())
    }

    pub fn current_user(&self) -> Option<User> {
        self.state().user
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let session = self.client.sign_in_with_password(email, password).await?;
        self.apply(Some(&session));
        Ok(session.user)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let outcome = self.client.sign_up(email, password).await?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.apply(Some(session));
        }
        Ok(outcome)
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.client.sign_out().await?;
        self.apply(None);
        Ok(())
    }

    fn apply(&self, session: Option<&Session>) {
        apply_to(&self.state, session);
    }
}

fn apply_to(state: &RwLock<AuthState>, session: Option<&Session>) {
    let mut guard = state.write().unwrap_or_else(|poison| poison.into_inner());
    guard.apply(session);
}

fn subscribe(
    mut receiver: watch::Receiver<Option<Session>>,
    state: Arc<RwLock<AuthState>>,
) -> Subscription {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let handle = tokio::spawn(async move {
        apply_to(&state, receiver.borrow_and_update().as_ref());

        loop {
            let changed = tokio::select! {
                _ = token.cancelled() => break,
                changed = receiver.changed() => changed,
            };
            if changed.is_err() {
                break;
            }

            let session = receiver.borrow_and_update().clone();
            debug!(signed_in = session.is_some(), "Auth state changed");
            apply_to(&state, session.as_ref());
        }
        debug!("Auth state listener stopped");
    });

    Subscription { cancel, handle }
}
