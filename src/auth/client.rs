//! HTTP client for the hosted auth service.
//!
//! Speaks the GoTrue REST dialect (`/token?grant_type=password`, `/signup`,
//! `/logout`) and keeps the current session in a watch channel so that
//! listeners are notified whenever it changes.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::AppConfig;

/// Errors returned by the hosted auth service
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Auth service unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Not signed in")]
    NotSignedIn,
}

/// User as reported by the auth service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Active session returned on sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: User,
}

/// Result of a sign-up request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account was confirmed immediately and is now signed in
    SignedIn(Session),
    /// The auth service sent a confirmation email
    ConfirmationPending(User),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(User),
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Client for the hosted auth service
pub struct HostedAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    session_tx: watch::Sender<Option<Session>>,
}

impl HostedAuthClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let (session_tx, _) = watch::channel(None);

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            session_tx,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.auth_url.clone(),
            config.auth_api_key.clone(),
            Duration::from_millis(config.auth_timeout_ms),
        )
    }

    /// Client for the same service with its own, empty session
    pub fn fork(&self) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            session_tx,
        }
    }

    /// Current session, if any
    pub fn session(&self) -> Option<Session> {
        self.session_tx.borrow().clone()
    }

    /// Subscribe to session changes. The receiver starts at the current value.
    pub fn on_auth_state_change(&self) -> watch::Receiver<Option<Session>> {
        self.session_tx.subscribe()
    }

    /// Password sign-in
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let response = self
            .request(reqwest::Method::POST, "/token")
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password })
            .send()
            .await?;

        let session: Session = parse_response(response).await?;
        info!(user_id = %session.user.id, "Signed in");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Account registration
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .request(reqwest::Method::POST, "/signup")
            .json(&Credentials { email, password })
            .send()
            .await?;

        match parse_response::<SignUpResponse>(response).await? {
            SignUpResponse::Session(session) => {
                info!(user_id = %session.user.id, "Signed up and signed in");
                self.publish(Some(session.clone()));
                Ok(SignUpOutcome::SignedIn(session))
            }
            SignUpResponse::User(user) => {
                info!(user_id = %user.id, "Signed up, confirmation pending");
                Ok(SignUpOutcome::ConfirmationPending(user))
            }
        }
    }

    /// Revoke the current session
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.session().ok_or(AuthError::NotSignedIn)?;

        let response = self
            .request(reqwest::Method::POST, "/logout")
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        // An expired token is as good as revoked.
        let status = response.status();
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            info!(user_id = %session.user.id, "Signed out");
            self.publish(None);
            return Ok(());
        }

        Err(rejection(status, response.text().await.unwrap_or_default()))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header("apikey", key),
            None => builder,
        }
    }

    fn publish(&self, session: Option<Session>) {
        self.session_tx.send_replace(session);
    }
}

async fn parse_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    Err(rejection(status, response.text().await.unwrap_or_default()))
}

/// Pull the most descriptive message out of an auth error body
fn rejection(status: StatusCode, body: String) -> AuthError {
    debug!(status = status.as_u16(), body = %body, "Auth service rejected request");

    let parsed: Value = serde_json::from_str(&body).unwrap_or_else(|_| json!({}));
    let message = ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| parsed.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Auth service returned {}", status.as_u16()));

    AuthError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_prefers_error_description() {
        let err = rejection(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
                .to_string(),
        );
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[test]
    fn rejection_reads_msg_field() {
        let err = rejection(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"code":422,"msg":"Password should be at least 6 characters"}"#.to_string(),
        );
        assert!(matches!(err, AuthError::Rejected { status: 422, .. }));
        assert_eq!(err.to_string(), "Password should be at least 6 characters");
    }

    #[test]
    fn rejection_falls_back_to_status() {
        let err = rejection(StatusCode::BAD_GATEWAY, "<html>".to_string());
        assert_eq!(err.to_string(), "Auth service returned 502");
    }

    #[test]
    fn sign_up_response_distinguishes_session_from_user() {
        let with_session: SignUpResponse = serde_json::from_str(
            r#"{"access_token":"t","refresh_token":"r","expires_in":3600,"user":{"id":"u1","email":"a@b.c"}}"#,
        )
        .unwrap();
        assert!(matches!(with_session, SignUpResponse::Session(_)));

        let pending: SignUpResponse =
            serde_json::from_str(r#"{"id":"u2","email":"a@b.c","confirmation_sent_at":"2025-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(matches!(pending, SignUpResponse::User(_)));
    }

    #[test]
    fn forked_client_starts_signed_out() {
        let client = HostedAuthClient::new("http://auth.test/", None, Duration::from_millis(100));
        client.publish(Some(Session {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_in: None,
            user: User {
                id: "u1".to_string(),
                email: None,
            },
        }));

        let fork = client.fork();
        assert!(fork.session().is_none());
        assert_eq!(fork.base_url, "http://auth.test");
        assert!(client.session().is_some());
    }

    #[tokio::test]
    async fn sign_out_without_session_is_an_error() {
        let client = HostedAuthClient::new("http://127.0.0.1:9", None, Duration::from_millis(100));
        assert!(matches!(
            client.sign_out().await,
            Err(AuthError::NotSignedIn)
        ));
    }
}
