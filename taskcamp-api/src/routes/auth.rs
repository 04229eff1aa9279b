/// Authentication endpoints
///
/// This module provides the account lifecycle endpoints:
/// - Registration and email verification
/// - Login, refresh (with rotation), logout
/// - Password reset and password change
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new user
/// - `GET  /v1/auth/verify-email/:token` - Consume a verification link
/// - `POST /v1/auth/resend-verification` - Re-issue a verification link
/// - `POST /v1/auth/login` - Login and get a token pair
/// - `POST /v1/auth/refresh` - Rotate the refresh token
/// - `POST /v1/auth/forgot-password` - Request a reset link
/// - `POST /v1/auth/reset-password/:token` - Consume a reset link
/// - `POST /v1/auth/logout` - Invalidate the current session (JWT)
/// - `POST /v1/auth/change-password` - Change password, re-proving the old one (JWT)
/// - `GET  /v1/auth/me` - Current user profile (JWT)

use crate::{
    app::{AppState, AuthContext},
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskcamp_shared::{
    auth::{jwt, password, token},
    gateway::mail,
    models::user::{CreateUser, PublicUser, User},
};
use tracing::{info, warn};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Username (stored lowercase)
    #[validate(length(min = 3, max = 100, message = "Username must be 3-100 characters"))]
    pub username: String,

    /// Password (will be validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub full_name: Option<String>,
}

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// The created user (sanitized)
    pub user: PublicUser,

    /// What happens next
    pub message: String,

    /// Verification token plaintext, exposed only outside production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// The logged-in user (sanitized)
    pub user: PublicUser,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Email-only request (resend verification, forgot password)
#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Reset password request
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    /// New password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Change password request
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    /// Current password (re-proof)
    pub current_password: String,

    /// New password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Generic message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable outcome
    pub message: String,

    /// Token plaintext, exposed only outside production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Registers a new user
///
/// Creates the account unverified, stores the digest of a fresh
/// verification token, and emails the link. Email delivery failure is
/// logged, never surfaced: the user can always request a resend.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email or username already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            username: req.username,
            password_hash,
            full_name: req.full_name,
        },
    )
    .await?;

    let (plaintext, digest) = token::generate_temp_token();
    User::set_verification_token(&state.db, user.id, &digest, token::token_expiry()).await?;

    let message = mail::verification_email(
        &user.email,
        &state.config.api.public_base_url,
        &plaintext,
    );
    if let Err(e) = state.mailer.send(message).await {
        warn!(user_id = %user.id, error = %e, "Failed to send verification email");
    }

    info!(user_id = %user.id, "User registered");

    let verification_token = (!state.config.api.production).then_some(plaintext);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: PublicUser::from(&user),
            message: "Registration successful. Check your email to verify your account."
                .to_string(),
            verification_token,
        }),
    ))
}

/// Consumes an email verification token
///
/// The token is hashed and matched against the stored digest in a single
/// atomic update, so it works exactly once.
///
/// # Errors
///
/// - `404 Not Found`: Token unknown, expired, or already used
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token_plaintext): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let digest = token::hash_temp_token(&token_plaintext);

    let user = User::consume_verification_token(&state.db, &digest)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid or expired verification token".to_string()))?;

    info!(user_id = %user.id, "Email verified");

    Ok(Json(MessageResponse {
        message: "Email verified. You can now log in.".to_string(),
        token: None,
    }))
}

/// Re-issues a verification link
///
/// Always answers 200 with the same message whether or not the email maps
/// to an account, so the endpoint cannot be used to probe registrations.
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let mut dev_token = None;

    if let Some(user) = User::find_by_email(&state.db, &req.email).await? {
        if !user.email_verified {
            let (plaintext, digest) = token::generate_temp_token();
            User::set_verification_token(&state.db, user.id, &digest, token::token_expiry())
                .await?;

            let message = mail::verification_email(
                &user.email,
                &state.config.api.public_base_url,
                &plaintext,
            );
            if let Err(e) = state.mailer.send(message).await {
                warn!(user_id = %user.id, error = %e, "Failed to send verification email");
            }

            dev_token = (!state.config.api.production).then_some(plaintext);
        }
    }

    Ok(Json(MessageResponse {
        message: "If that address has an unverified account, a new link is on its way."
            .to_string(),
        token: dev_token,
    }))
}

/// Logs a user in
///
/// Issues a fresh token pair and stores the refresh token on the user row,
/// invalidating any previous session.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: Email not verified yet
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !user.email_verified {
        return Err(ApiError::Forbidden(
            "Email not verified. Check your inbox for the verification link.".to_string(),
        ));
    }

    let pair = jwt::generate_token_pair(user.id, state.jwt_secret())?;
    User::store_refresh_token(&state.db, user.id, Some(&pair.refresh_token)).await?;
    User::update_last_login(&state.db, user.id).await?;

    info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        user: PublicUser::from(&user),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// Rotates a refresh token
///
/// The presented token must decode validly AND match the copy stored on
/// the user row; on success a new pair is issued and stored, so the old
/// refresh token is dead. Every failure collapses to the same generic 401
/// to avoid leaking which check tripped.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<jwt::TokenPair>> {
    let generic = || ApiError::Unauthorized("Invalid refresh token".to_string());

    let claims =
        jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret()).map_err(|_| generic())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(generic)?;

    let stored = user.refresh_token.as_deref().ok_or_else(generic)?;
    if !token::constant_time_compare(stored, &req.refresh_token) {
        return Err(generic());
    }

    let pair = jwt::generate_token_pair(user.id, state.jwt_secret())?;
    User::store_refresh_token(&state.db, user.id, Some(&pair.refresh_token)).await?;

    Ok(Json(pair))
}

/// Requests a password reset link
///
/// Same anti-probing shape as [`resend_verification`]: the response never
/// says whether the address exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let mut dev_token = None;

    if let Some(user) = User::find_by_email(&state.db, &req.email).await? {
        let (plaintext, digest) = token::generate_temp_token();
        User::set_password_reset_token(&state.db, user.id, &digest, token::token_expiry()).await?;

        let message = mail::password_reset_email(
            &user.email,
            &state.config.api.public_base_url,
            &plaintext,
        );
        if let Err(e) = state.mailer.send(message).await {
            warn!(user_id = %user.id, error = %e, "Failed to send password reset email");
        }

        dev_token = (!state.config.api.production).then_some(plaintext);
    }

    Ok(Json(MessageResponse {
        message: "If that address has an account, a reset link is on its way.".to_string(),
        token: dev_token,
    }))
}

/// Consumes a password reset token
///
/// Installs the new password and kills the current session in one atomic
/// update; like verification, the token works exactly once.
///
/// # Errors
///
/// - `404 Not Found`: Token unknown, expired, or already used
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token_plaintext): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let digest = token::hash_temp_token(&token_plaintext);
    let new_hash = password::hash_password(&req.password)?;

    let user = User::consume_password_reset_token(&state.db, &digest, &new_hash)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid or expired reset token".to_string()))?;

    info!(user_id = %user.id, "Password reset");

    Ok(Json(MessageResponse {
        message: "Password reset. Log in with your new password.".to_string(),
        token: None,
    }))
}

/// Logs the current user out
///
/// Clears the stored refresh token; the access token simply ages out.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MessageResponse>> {
    User::store_refresh_token(&state.db, auth.user_id, None).await?;

    Ok(Json(MessageResponse {
        message: "Logged out.".to_string(),
        token: None,
    }))
}

/// Changes the current user's password
///
/// Requires re-proof of the current password, then rotates the session.
///
/// # Errors
///
/// - `401 Unauthorized`: Current password doesn't match
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    password::validate_password_strength(&req.new_password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "new_password".to_string(),
            message: e,
        }])
    })?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let valid = password::verify_password(&req.current_password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let new_hash = password::hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &new_hash).await?;
    User::store_refresh_token(&state.db, user.id, None).await?;

    info!(user_id = %user.id, "Password changed");

    Ok(Json(MessageResponse {
        message: "Password changed. Other sessions have been logged out.".to_string(),
        token: None,
    }))
}

/// Returns the current user's profile
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(PublicUser::from(&user)))
}
