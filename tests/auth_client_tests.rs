//! Hosted auth client and auth context against a mock auth service.

mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use test_utils::mount_password_grant;
use vendor_console::auth::{AuthContext, AuthError, HostedAuthClient, SignUpOutcome};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Arc<HostedAuthClient> {
    Arc::new(HostedAuthClient::new(
        server.uri(),
        Some("anon-key".to_string()),
        Duration::from_secs(2),
    ))
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn sign_in_sends_credentials_and_publishes_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon-key"))
        .and(body_json(json!({"email": "ops@example.com", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-token-1",
            "expires_in": 3600,
            "user": { "id": "user-1", "email": "ops@example.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut changes = client.on_auth_state_change();

    let session = client
        .sign_in_with_password("ops@example.com", "hunter22")
        .await
        .unwrap();
    assert_eq!(session.user.id, "user-1");

    changes.changed().await.unwrap();
    let published = changes.borrow().clone().unwrap();
    assert_eq!(published.access_token, "access-token-1");
}

#[tokio::test]
async fn sign_in_rejection_carries_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .sign_in_with_password("ops@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Rejected { status: 400, .. }));
    assert_eq!(err.to_string(), "Invalid login credentials");
    assert!(client.session().is_none());
}

#[tokio::test]
async fn sign_up_without_session_is_pending_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-2",
            "email": "new@example.com",
            "confirmation_sent_at": "2025-01-06T09:00:00Z"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client.sign_up("new@example.com", "hunter22").await.unwrap();

    match outcome {
        SignUpOutcome::ConfirmationPending(user) => assert_eq!(user.id, "user-2"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(client.session().is_none());
}

#[tokio::test]
async fn sign_out_revokes_token_and_clears_session() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "ops@example.com").await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .and(header("authorization", "Bearer access-token-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .sign_in_with_password("ops@example.com", "hunter22")
        .await
        .unwrap();
    client.sign_out().await.unwrap();

    assert!(client.session().is_none());
}

#[tokio::test]
async fn auth_context_tracks_sign_in_and_sign_out() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "ops@example.com").await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let context = AuthContext::new(client_for(&server));
    settle().await;
    assert!(!context.is_loading());
    assert!(context.current_user().is_none());

    let user = context.sign_in("ops@example.com", "hunter22").await.unwrap();
    assert_eq!(user.email.as_deref(), Some("ops@example.com"));
    assert_eq!(context.current_user(), Some(user));

    // An already-expired token still counts as signed out.
    context.sign_out().await.unwrap();
    assert!(context.current_user().is_none());
}

#[tokio::test]
async fn auth_context_follows_client_session_changes() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "ops@example.com").await;

    let client = client_for(&server);
    let context = AuthContext::new(Arc::clone(&client));
    settle().await;

    // Sign in through the client directly; the listener mirrors it.
    client
        .sign_in_with_password("ops@example.com", "hunter22")
        .await
        .unwrap();

    for _ in 0..50 {
        if context.current_user().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        context.current_user().and_then(|user| user.email),
        Some("ops@example.com".to_string())
    );
}

#[tokio::test]
async fn unreachable_auth_service_is_a_network_error() {
    let client = HostedAuthClient::new("http://127.0.0.1:9", None, Duration::from_millis(500));
    let err = client
        .sign_in_with_password("ops@example.com", "hunter22")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Network(_)));
}
