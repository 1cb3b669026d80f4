// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: email/password accounts, wallet connect and the session
//! cookie.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidationError};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::{Activity, ActivityEvent, MemberProfile, User};
use crate::services::password::{hash_password_blocking, verify_password_blocking};
use crate::time_utils::now_utc;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/connect", post(connect_wallet))
        .route("/api/auth/disconnect", post(logout))
}

/// Routes that need a valid session (auth layer applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/session", get(session))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 256))]
    pub password: String,
    #[validate(length(min = 3, max = 100))]
    pub username: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 320))]
    pub email: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWalletRequest {
    #[validate(custom(function = "validate_wallet_address"))]
    pub wallet_address: String,
}

/// `0x` followed by exactly 40 hex digits, either case.
fn validate_wallet_address(value: &str) -> std::result::Result<(), ValidationError> {
    let ok = value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("wallet_address"))
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub user: MemberProfile,
}

/// Session cookie carrying `token`; an empty token with zero max-age clears it.
fn session_cookie(token: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

fn start_session(state: &AppState, jar: CookieJar, user_id: &str) -> Result<CookieJar> {
    let jwt = create_jwt(user_id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;
    Ok(jar.add(session_cookie(
        jwt,
        SESSION_TTL_SECS,
        state.config.secure_cookies,
    )))
}

/// Referral code handed to new members, e.g. `REF_LX2K9Q1A`.
fn new_referral_code(now: chrono::DateTime<chrono::Utc>) -> String {
    let mut n = now.timestamp_millis().unsigned_abs();
    let mut digits = Vec::new();
    while n > 0 {
        let d = (n % 36) as u32;
        digits.push(char::from_digit(d, 36).unwrap_or('0').to_ascii_uppercase());
        n /= 36;
    }
    digits.reverse();
    format!("REF_{}", digits.into_iter().collect::<String>())
}

/// Create an account and start a session.
async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignupRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    body.validate()?;

    let email = body.email.trim().to_lowercase();
    if state.db.get_user_by_email(&email).await?.is_some() {
        tracing::warn!("Signup rejected: email already registered");
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password_blocking(body.password).await?;
    let now = now_utc();
    let user = User::new(
        uuid::Uuid::new_v4().to_string(),
        email,
        password_hash,
        body.username.trim().to_string(),
        new_referral_code(now),
        now,
    );
    state.db.upsert_user(&user).await?;

    let activity = Activity::new(
        &user.id,
        ActivityEvent::NewContributor {
            username: Some(user.username.clone()),
            tier: Some(user.tier.clone()),
            wallet_address: None,
        },
        now,
    );
    if let Err(e) = state.db.create_activity(&activity).await {
        tracing::warn!(error = %e, user_id = %user.id, "Failed to record signup activity");
    }

    tracing::info!(user_id = %user.id, "Member signed up");

    let jar = start_session(&state, jar, &user.id)?;
    Ok((
        jar,
        Json(SessionResponse {
            user: MemberProfile::from(user),
        }),
    ))
}

/// Log in with email and password.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    body.validate()?;

    let email = body.email.trim().to_lowercase();
    let user = state
        .db
        .get_user_by_email(&email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if user.password_hash.is_empty() {
        tracing::warn!(user_id = %user.id, "Login rejected: wallet-only member");
        return Err(AppError::InvalidCredentials);
    }
    if !verify_password_blocking(body.password, user.password_hash.clone()).await? {
        tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!(user_id = %user.id, "Member logged in");

    let jar = start_session(&state, jar, &user.id)?;
    Ok((
        jar,
        Json(SessionResponse {
            user: MemberProfile::from(user),
        }),
    ))
}

/// Sign in with a wallet address, creating the member on first connect.
async fn connect_wallet(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<ConnectWalletRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    body.validate()?;

    let address = body.wallet_address.to_ascii_lowercase();
    let user = match state.db.get_user_by_wallet(&address).await? {
        Some(user) => user,
        None => {
            let now = now_utc();
            let user = User::from_wallet(&address, now);
            if state.db.create_user_if_absent(&user).await? {
                let activity = Activity::new(
                    &user.id,
                    ActivityEvent::NewContributor {
                        username: None,
                        tier: None,
                        wallet_address: Some(address.clone()),
                    },
                    now,
                );
                if let Err(e) = state.db.create_activity(&activity).await {
                    tracing::warn!(
                        error = %e,
                        user_id = %user.id,
                        "Failed to record signup activity"
                    );
                }
                tracing::info!(user_id = %user.id, "Member connected a new wallet");
                user
            } else {
                // Lost a race with a concurrent connect for the same address.
                state.db.get_user(&user.id).await?.ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!("Wallet member {} vanished", user.id))
                })?
            }
        }
    };

    let jar = start_session(&state, jar, &user.id)?;
    Ok((
        jar,
        Json(SessionResponse {
            user: MemberProfile::from(user),
        }),
    ))
}

/// Clear the session cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.add(session_cookie(String::new(), 0, state.config.secure_cookies));
    (jar, StatusCode::NO_CONTENT)
}

/// Current member for a valid session.
async fn session(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SessionResponse>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(SessionResponse {
        user: MemberProfile::from(user),
    }))
}
