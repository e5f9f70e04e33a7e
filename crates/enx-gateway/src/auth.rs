//! Bearer tokens, password hashing, and the extractors that gate handlers.

use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{DateTime, Utc};
use enx_core::{Principal, Role, User, models::normalize_email};
use enx_platform::{AdminSeed, AuthSettings};
use enx_store::UserStore;
use jsonwebtoken::{
    Algorithm as JwtAlgorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Access,
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub purpose: TokenPurpose,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
}

pub fn issue_token(
    settings: &AuthSettings,
    user: &User,
    purpose: TokenPurpose,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let ttl = match purpose {
        TokenPurpose::Access => settings.token_ttl,
        TokenPurpose::Reset => settings.reset_token_ttl,
    };
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        purpose,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|err| anyhow!("failed to sign token: {err}"))
}

/// Checks signature, expiry and purpose. A reset token never authenticates
/// a request and an access token never resets a password.
pub fn verify_token(
    secret: &str,
    token: &str,
    purpose: TokenPurpose,
) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(JwtAlgorithm::HS256);
    validation.leeway = 0;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })?;

    if data.claims.purpose != purpose {
        return Err(TokenError::Invalid);
    }
    Ok(data.claims)
}

/// Argon2id hashing. Work runs on the blocking pool.
#[derive(Clone, Default)]
pub struct Passwords {
    params: Params,
}

impl Passwords {
    pub fn with_params(params: Params) -> Self {
        Self { params }
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub async fn hash(&self, password: &str) -> anyhow::Result<String> {
        let hasher = self.hasher();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|err| anyhow!("failed to hash password: {err}"))
        })
        .await?
    }

    pub async fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let hasher = self.hasher();
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();
        tokio::task::spawn_blocking(move || {
            PasswordHash::new(&stored_hash)
                .map(|parsed| hasher.verify_password(password.as_bytes(), &parsed).is_ok())
                .unwrap_or(false)
        })
        .await
        .unwrap_or(false)
    }
}

/// The caller behind a valid, active access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub principal: Principal,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Access denied. No token provided."))?;

        let claims = verify_token(&state.settings.auth.jwt_secret, token, TokenPurpose::Access)
            .map_err(|err| match err {
                TokenError::Expired => ApiError::unauthorized("Token expired."),
                TokenError::Invalid => ApiError::unauthorized("Invalid token."),
            })?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid token. User not found."))?;
        if !user.is_active {
            return Err(ApiError::unauthorized("Account is deactivated."));
        }

        let principal = user.principal();
        Ok(Self { user, principal })
    }
}

#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let caller = AuthUser::from_request_parts(parts, state).await?;
        if !caller.principal.is_admin() {
            return Err(ApiError::forbidden(
                "Access denied. Admin privileges required.",
            ));
        }
        Ok(Self(caller))
    }
}

/// Evaluated once the resource is loaded; admins always pass.
pub fn require_owner_or_admin(principal: &Principal, owner: Option<Uuid>) -> Result<(), ApiError> {
    if principal.owns_or_admin(owner) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "Access denied. You do not own this resource.",
        ))
    }
}

/// Creates the configured admin account unless the email is already taken.
/// Returns whether an account was created.
pub async fn seed_admin(
    users: &dyn UserStore,
    passwords: &Passwords,
    seed: &AdminSeed,
) -> anyhow::Result<bool> {
    if users.find_by_email(&normalize_email(&seed.email)).await?.is_some() {
        return Ok(false);
    }
    let mut admin = User::new(
        "System".into(),
        "Administrator".into(),
        seed.email.clone(),
        None,
        passwords.hash(&seed.password).await?,
    );
    admin.role = Role::Admin;
    users.insert(&admin).await
}
