//! Sign-in, sign-up and identity exchange against a mock backend.

mod fixtures;

use std::time::Duration;

use estate_client::config::ApiConfig;
use estate_client::session::{SessionRecord, SESSION_KEY};
use estate_client::{FailureKind, IdentityProvider, SignUpRequest};
use fixtures::{client_for, client_with, config_for, unreachable_base};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn credentials_success_writes_session_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signin"))
        .and(body_json(json!({ "email": "ana@example.com", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "user": { "id": 17, "name": "Ana" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (client, store) = client_for(&server);

    let user = client
        .submit_credentials("ana@example.com", "hunter2")
        .await
        .expect("signed in");

    assert_eq!(user, json!({ "id": 17, "name": "Ana" }));
    assert_eq!(store.writes(), vec![SESSION_KEY.to_string()]);
    let record = SessionRecord::load(&store)
        .expect("store readable")
        .expect("record saved");
    assert_eq!(record.user["name"], "Ana");
}

#[tokio::test]
async fn rejected_credentials_surface_server_message_without_writing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Account is suspended"
        })))
        .mount(&server)
        .await;
    let (client, store) = client_for(&server);

    let failure = client
        .submit_credentials("ana@example.com", "wrong")
        .await
        .expect_err("rejected");

    assert_eq!(failure.kind, FailureKind::Server);
    assert_eq!(failure.message, "Account is suspended");
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn duplicated_message_key_reads_the_last_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"message":"error","message":"Your Password or Username is wrong"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;
    let (client, store) = client_for(&server);

    let failure = client
        .submit_credentials("ana@example.com", "wrong")
        .await
        .expect_err("rejected");

    assert_eq!(failure.message, "Your Password or Username is wrong");
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn unreachable_backend_reads_invalid_credentials() {
    let (client, store) = client_with(ApiConfig::for_base_url(unreachable_base()));

    let failure = client
        .submit_credentials("ana@example.com", "hunter2")
        .await
        .expect_err("no backend");

    assert_eq!(failure.kind, FailureKind::Transport);
    assert_eq!(failure.message, "invalid credentials");
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn malformed_body_reads_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    let (client, _store) = client_for(&server);

    let failure = client
        .submit_credentials("ana@example.com", "hunter2")
        .await
        .expect_err("not json");

    assert_eq!(failure.kind, FailureKind::Parse);
    assert_eq!(failure.message, "invalid credentials");
}

#[tokio::test]
async fn google_exchange_posts_profile_and_saves_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identity/google/me"))
        .and(header("authorization", "Bearer google-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "g-1",
            "email": "ana@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/google-signin"))
        .and(body_partial_json(json!({ "profile": { "id": "g-1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "success",
            "data": { "id": 5, "provider": "google" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (client, store) = client_for(&server);

    let user = client
        .exchange_identity_token(IdentityProvider::Google, "google-token")
        .await
        .expect("exchanged");

    assert_eq!(user["provider"], "google");
    assert_eq!(store.writes(), vec![SESSION_KEY.to_string()]);
}

#[tokio::test]
async fn failed_profile_fetch_reads_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identity/facebook/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "token expired" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/facebook-signin"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let (client, store) = client_for(&server);

    let failure = client
        .exchange_identity_token(IdentityProvider::Facebook, "stale")
        .await
        .expect_err("profile fetch fails");

    assert_eq!(failure.message, "Facebook sign-in failed");
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn rejected_exchange_reads_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identity/google/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "g-2" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/google-signin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "internal detail"
        })))
        .mount(&server)
        .await;
    let (client, store) = client_for(&server);

    let failure = client
        .exchange_identity_token(IdentityProvider::Google, "google-token")
        .await
        .expect_err("backend refuses");

    assert_eq!(failure.message, "Google sign-in failed");
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn blank_access_token_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let (client, _store) = client_for(&server);

    let failure = client
        .exchange_identity_token(IdentityProvider::Google, "  ")
        .await
        .expect_err("token required");

    assert!(failure.is_validation());
}

fn sign_up_request() -> SignUpRequest {
    SignUpRequest {
        name: "Ana".to_string(),
        email: "ana@example.com".to_string(),
        phone: "+15550100".to_string(),
        password: "hunter2".to_string(),
    }
}

#[tokio::test]
async fn sign_up_saves_the_new_account() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signup/user-info"))
        .and(body_partial_json(json!({ "email": "ana@example.com", "phone": "+15550100" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "user": { "id": 99 }
        })))
        .mount(&server)
        .await;
    let (client, store) = client_for(&server);

    let user = client
        .register_account(&sign_up_request())
        .await
        .expect("account created");

    assert_eq!(user["id"], 99);
    assert_eq!(store.writes().len(), 1);
}

#[tokio::test]
async fn slow_sign_up_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signup/user-info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "user": { "id": 1 } }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let mut config = config_for(&server);
    config.signup_timeout = Duration::from_millis(200);
    let (client, store) = client_with(config);

    let failure = client
        .register_account(&sign_up_request())
        .await
        .expect_err("timed out");

    assert_eq!(failure.kind, FailureKind::Transport);
    assert_eq!(
        failure.message,
        "Unable to create your account, please try again"
    );
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn duplicate_email_on_sign_up_surfaces_server_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signup/user-info"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "error",
            "error": "Email already registered"
        })))
        .mount(&server)
        .await;
    let (client, _store) = client_for(&server);

    let failure = client
        .register_account(&sign_up_request())
        .await
        .expect_err("conflict");

    assert_eq!(failure.kind, FailureKind::Server);
    assert_eq!(failure.message, "Email already registered");
}
