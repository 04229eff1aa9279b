/// Integration tests for the account lifecycle
///
/// These walk the full flows end-to-end against a real database:
/// - Registration, email verification, and login
/// - Single-use semantics of verification and reset tokens
/// - Refresh token rotation and replay rejection
/// - Password reset and change

mod common;

use axum::http::{Method, StatusCode};
use common::{TestContext, TEST_PASSWORD};
use serde_json::json;
use uuid::Uuid;

fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_register_verify_login_flow() {
    let ctx = TestContext::new().await.unwrap();

    let email = unique_email("flow");
    let username = format!("flow-{}", Uuid::new_v4().simple());

    // Register
    let (status, body) = ctx
        .request(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({
                "email": email,
                "username": username,
                "password": TEST_PASSWORD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    let user_id: Uuid = body["user"]["id"].as_str().unwrap().parse().unwrap();
    ctx.track_user(user_id);

    // Outside production the token plaintext rides along in the response
    let token = body["verification_token"].as_str().unwrap().to_string();

    // The verification email was sent and carries the same token
    let message = ctx.mailer.last_message().unwrap();
    assert_eq!(message.to, email);
    assert!(message.body.contains(&token));

    // Login before verification is refused
    let (status, _) = ctx
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Verify
    let (status, _) = ctx
        .request(
            Method::GET,
            &format!("/v1/auth/verify-email/{token}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // The token is single use
    let (status, _) = ctx
        .request(
            Method::GET,
            &format!("/v1/auth/verify-email/{token}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Login now works
    let (status, body) = ctx
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());

    // The access token reaches /me
    let access_token = body["access_token"].as_str().unwrap();
    let (status, body) = ctx
        .request(Method::GET, "/v1/auth/me", Some(access_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], email);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_register_duplicate_email_conflicts() {
    let ctx = TestContext::new().await.unwrap();

    let existing = ctx.signup("dupe").await.unwrap();

    let (status, _) = ctx
        .request(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({
                "email": existing.user.email,
                "username": format!("other-{}", Uuid::new_v4().simple()),
                "password": TEST_PASSWORD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_refresh_rotation_rejects_replay() {
    let ctx = TestContext::new().await.unwrap();

    let account = ctx.signup("rotator").await.unwrap();

    let (status, body) = ctx
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": account.user.email, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let first_refresh = body["refresh_token"].as_str().unwrap().to_string();

    // Rotate
    let (status, body) = ctx
        .request(
            Method::POST,
            "/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": first_refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second_refresh = body["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(first_refresh, second_refresh);

    // The rotated-out token is dead
    let (status, _) = ctx
        .request(
            Method::POST,
            "/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": first_refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The fresh one still works
    let (status, _) = ctx
        .request(
            Method::POST,
            "/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": second_refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_logout_invalidates_refresh_token() {
    let ctx = TestContext::new().await.unwrap();

    let account = ctx.signup("leaver").await.unwrap();

    let (status, body) = ctx
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": account.user.email, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access_token"].as_str().unwrap().to_string();
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .request(Method::POST, "/v1/auth/logout", Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .request(
            Method::POST,
            "/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_password_reset_flow() {
    let ctx = TestContext::new().await.unwrap();

    let account = ctx.signup("resetter").await.unwrap();

    let (status, body) = ctx
        .request(
            Method::POST,
            "/v1/auth/forgot-password",
            None,
            Some(json!({ "email": account.user.email })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let message = ctx.mailer.last_message().unwrap();
    assert_eq!(message.to, account.user.email);
    assert!(message.body.contains(&token));

    // Weak replacement password is refused, token survives
    let (status, _) = ctx
        .request(
            Method::POST,
            &format!("/v1/auth/reset-password/{token}"),
            None,
            Some(json!({ "password": "alllowercase1!" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let new_password = "An0ther-Secret!";
    let (status, _) = ctx
        .request(
            Method::POST,
            &format!("/v1/auth/reset-password/{token}"),
            None,
            Some(json!({ "password": new_password })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Single use
    let (status, _) = ctx
        .request(
            Method::POST,
            &format!("/v1/auth/reset-password/{token}"),
            None,
            Some(json!({ "password": new_password })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Old password is dead, new one works
    let (status, _) = ctx
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": account.user.email, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": account.user.email, "password": new_password })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_change_password_requires_current() {
    let ctx = TestContext::new().await.unwrap();

    let account = ctx.signup("changer").await.unwrap();
    let new_password = "Fresh-Secret-99!";

    let (status, _) = ctx
        .request(
            Method::POST,
            "/v1/auth/change-password",
            Some(&account.token),
            Some(json!({
                "current_password": "Wrong-Guess-1!",
                "new_password": new_password,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .request(
            Method::POST,
            "/v1/auth/change-password",
            Some(&account.token),
            Some(json!({
                "current_password": TEST_PASSWORD,
                "new_password": new_password,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": account.user.email, "password": new_password })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_authentication_required() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.request(Method::GET, "/v1/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .request(Method::GET, "/v1/projects", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_forgot_password_never_confirms_accounts() {
    let ctx = TestContext::new().await.unwrap();

    // Unknown address gets the same 200 as a known one
    let (status, body) = ctx
        .request(
            Method::POST,
            "/v1/auth/forgot-password",
            None,
            Some(json!({ "email": unique_email("ghost") })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_null());

    let (status, _) = ctx
        .request(
            Method::POST,
            "/v1/auth/resend-verification",
            None,
            Some(json!({ "email": unique_email("ghost") })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await.unwrap();
}
