use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use enx_core::{User, models::normalize_email};
use enx_platform::contracts::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest, UpdateProfileRequest,
};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    auth::{AuthUser, TokenPurpose, issue_token, verify_token},
    error::ApiError,
    extract::ApiJson,
    state::AppState,
    validation::Checks,
};

const MIN_PASSWORD: usize = 6;
const MAX_NAME: usize = 50;
const RESET_NOTICE: &str =
    "If an account with that email exists, a password reset link has been sent";

fn password_rule(
    checks: &mut Checks,
    field: &str,
    value: Option<&str>,
    required: &str,
    short: &str,
) -> Option<String> {
    let password = value.filter(|text| !text.is_empty());
    match password {
        None => {
            checks.fail(field, required);
            None
        }
        Some(text) if text.chars().count() < MIN_PASSWORD => {
            checks.fail(field, short);
            None
        }
        Some(text) => Some(text.to_string()),
    }
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut checks = Checks::new();
    let first_name = checks.required(
        "firstName",
        payload.first_name.as_deref(),
        "First name is required",
    );
    checks.max_chars(
        "firstName",
        payload.first_name.as_deref(),
        MAX_NAME,
        "First name cannot exceed 50 characters",
    );
    let last_name = checks.required(
        "lastName",
        payload.last_name.as_deref(),
        "Last name is required",
    );
    checks.max_chars(
        "lastName",
        payload.last_name.as_deref(),
        MAX_NAME,
        "Last name cannot exceed 50 characters",
    );
    let email = checks.email("email", payload.email.as_deref(), "Please provide a valid email");
    let password = password_rule(
        &mut checks,
        "password",
        payload.password.as_deref(),
        "Password is required",
        "Password must be at least 6 characters",
    );
    let phone = checks.optional_phone(
        "phone",
        payload.phone.as_deref(),
        "Please provide a valid phone number",
    );
    checks.finish()?;

    let email = email.unwrap_or_default();
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("User with this email already exists".into()));
    }

    let password_hash = state.passwords.hash(&password.unwrap_or_default()).await?;
    let user = User::new(
        first_name.unwrap_or_default(),
        last_name.unwrap_or_default(),
        email,
        phone,
        password_hash,
    );
    if !state.users.insert(&user).await? {
        return Err(ApiError::Conflict("User with this email already exists".into()));
    }

    let token = issue_token(&state.settings.auth, &user, TokenPurpose::Access, Utc::now())?;
    info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "token": token,
            "user": user.view(),
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let email = checks.email("email", payload.email.as_deref(), "Please provide a valid email");
    let password = payload.password.filter(|text| !text.is_empty());
    checks.check(password.is_some(), "password", "Password is required");
    checks.finish()?;

    let invalid = || ApiError::unauthorized("Invalid credentials");
    let user = state
        .users
        .find_by_email(&email.unwrap_or_default())
        .await?
        .ok_or_else(invalid)?;
    if !state
        .passwords
        .verify(&password.unwrap_or_default(), &user.password_hash)
        .await
    {
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::unauthorized("Account is deactivated."));
    }

    let token = issue_token(&state.settings.auth, &user, TokenPurpose::Access, Utc::now())?;
    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": user.view(),
    })))
}

pub async fn me(caller: AuthUser) -> Json<Value> {
    Json(json!({ "user": caller.user.view() }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let first_name = checks.not_blank(
        "firstName",
        payload.first_name.as_deref(),
        "First name cannot be empty",
    );
    checks.max_chars(
        "firstName",
        payload.first_name.as_deref(),
        MAX_NAME,
        "First name cannot exceed 50 characters",
    );
    let last_name = checks.not_blank(
        "lastName",
        payload.last_name.as_deref(),
        "Last name cannot be empty",
    );
    checks.max_chars(
        "lastName",
        payload.last_name.as_deref(),
        MAX_NAME,
        "Last name cannot exceed 50 characters",
    );
    let phone = checks.optional_phone(
        "phone",
        payload.phone.as_deref(),
        "Please provide a valid phone number",
    );
    checks.finish()?;

    let mut user = caller.user;
    if let Some(first_name) = first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = last_name {
        user.last_name = last_name;
    }
    if phone.is_some() {
        user.phone = phone;
    }
    user.updated_at = Utc::now();
    state.users.save(&user).await?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": user.view(),
    })))
}

pub async fn change_password(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let current = payload.current_password.filter(|text| !text.is_empty());
    checks.check(current.is_some(), "currentPassword", "Current password is required");
    let new_password = password_rule(
        &mut checks,
        "newPassword",
        payload.new_password.as_deref(),
        "New password is required",
        "New password must be at least 6 characters",
    );
    checks.finish()?;

    let mut user = caller.user;
    if !state
        .passwords
        .verify(&current.unwrap_or_default(), &user.password_hash)
        .await
    {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    user.password_hash = state.passwords.hash(&new_password.unwrap_or_default()).await?;
    user.updated_at = Utc::now();
    state.users.save(&user).await?;
    info!(user_id = %user.id, "password changed");

    Ok(Json(json!({ "message": "Password changed successfully" })))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let email = checks.email("email", payload.email.as_deref(), "Please provide a valid email");
    checks.finish()?;

    let email = normalize_email(&email.unwrap_or_default());
    let Some(user) = state
        .users
        .find_by_email(&email)
        .await?
        .filter(|user| user.is_active)
    else {
        return Ok(Json(json!({ "message": RESET_NOTICE })));
    };

    let token = issue_token(&state.settings.auth, &user, TokenPurpose::Reset, Utc::now())?;
    // No mail transport: the reset link is only recorded in the log.
    info!(
        user_id = %user.id,
        link = %format!(
            "{}/reset-password.html?token={token}",
            state.settings.frontend_url.trim_end_matches('/')
        ),
        "password reset requested"
    );

    let mut body = json!({ "message": RESET_NOTICE });
    if state.settings.auth.expose_reset_token {
        body["resetToken"] = json!(token);
    }
    Ok(Json(body))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let token = checks.required("token", payload.token.as_deref(), "Token is required");
    let new_password = password_rule(
        &mut checks,
        "newPassword",
        payload.new_password.as_deref(),
        "New password is required",
        "New password must be at least 6 characters",
    );
    checks.finish()?;

    let claims = verify_token(
        &state.settings.auth.jwt_secret,
        &token.unwrap_or_default(),
        TokenPurpose::Reset,
    )
    .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    let mut user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::not_found("Invalid or expired token"))?;

    user.password_hash = state.passwords.hash(&new_password.unwrap_or_default()).await?;
    user.updated_at = Utc::now();
    state.users.save(&user).await?;
    info!(user_id = %user.id, "password reset");

    Ok(Json(json!({ "message": "Password reset successful" })))
}
