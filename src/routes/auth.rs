use axum::extract::State;
use axum::Json;
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::auth::session::{self, AuthResponse, clear_auth_cookies, hash_token};
use crate::config::RegistrationMode;
use crate::db;
use crate::error::AppError;
use crate::extract::Payload;
use crate::middleware::audit;
use crate::models::Role;
use crate::services::directory::{self, MemberFields};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// The first account becomes the platform admin; later ones are customers
/// while registration is open.
pub async fn register(
    State(state): State<SharedState>,
    Payload(req): Payload<MemberFields>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    if req.password.as_deref().is_none_or(str::is_empty) {
        return Err(AppError::BadRequest("Password is required".to_string()));
    }
    let member = req.into_member()?;

    // Advisory lock prevents concurrent bootstrap registrations
    let mut tx = state.pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(1)")
        .execute(&mut *tx)
        .await?;

    let count = db::users::count_all(&mut *tx).await?;
    let user = if count == 0 {
        let user = directory::insert_user(&mut *tx, &member, Role::Admin).await?;
        db::general_admins::create(&mut *tx, user.id).await?;
        user
    } else {
        if state.config.registration == RegistrationMode::Closed {
            return Err(AppError::Forbidden(
                "Registration is disabled. Contact your administrator.".to_string(),
            ));
        }
        let customer = directory::create_customer_in(&mut tx, &member, false).await?;
        db::users::find_by_email(&mut *tx, &customer.email)
            .await?
            .ok_or_else(|| AppError::Internal("Registered user missing".to_string()))?
    };

    tx.commit().await?;

    audit::log_event(
        &state.pool,
        Some(user.id),
        "user.registered",
        "user",
        Some(user.id),
        Some(serde_json::json!({ "role": user.role })),
    )
    .await;

    let (jar, body) = session::issue(&state, user).await?;
    Ok((jar, Json(body)))
}

pub async fn login(
    State(state): State<SharedState>,
    Payload(req): Payload<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let email = req.email.trim().to_lowercase();

    if state.login_limiter.check(&email).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let user = db::users::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = password::verify(&req.password, user.password_hash.as_deref())
        .map_err(AppError::Internal)?;

    if !valid || !user.is_active {
        state.login_limiter.record_failure(&email);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }
    state.login_limiter.reset(&email);

    audit::log_event(
        &state.pool,
        Some(user.id),
        "user.login",
        "user",
        Some(user.id),
        None,
    )
    .await;

    let (jar, body) = session::issue(&state, user).await?;
    Ok((jar, Json(body)))
}

pub async fn refresh(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let refresh_value = jar
        .get("refresh_token")
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let stored = db::refresh_tokens::find_by_hash(&state.pool, &hash_token(&refresh_value))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if stored.used || !db::refresh_tokens::mark_used(&state.pool, stored.id).await? {
        tracing::warn!(
            "Refresh token reuse detected for user {}. Revoking all sessions.",
            stored.user_id
        );
        db::refresh_tokens::delete_all_for_user(&state.pool, stored.user_id).await?;
        return Err(AppError::Unauthorized(
            "Refresh token reuse detected. All sessions revoked.".to_string(),
        ));
    }

    if stored.expires_at < Utc::now() {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    let user = db::users::find_by_id(&state.pool, stored.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let (jar, body) = session::issue(&state, user).await?;
    Ok((jar, Json(body)))
}

pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    if let Some(cookie) = jar.get("refresh_token") {
        db::refresh_tokens::delete_by_hash(&state.pool, &hash_token(cookie.value())).await?;
    }

    Ok((
        clear_auth_cookies(),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

pub async fn change_password(
    auth: AuthUser,
    State(state): State<SharedState>,
    Payload(req): Payload<ChangePasswordRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    password::check_length(&req.new_password).map_err(AppError::BadRequest)?;

    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    // Federated accounts have no current password to check
    if user.password_hash.is_some() {
        let valid = password::verify(&req.current_password, user.password_hash.as_deref())
            .map_err(AppError::Internal)?;
        if !valid {
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }
    }

    let pw_hash = password::hash(&req.new_password).map_err(AppError::Internal)?;
    db::users::update_password(&state.pool, user.id, &pw_hash).await?;
    db::refresh_tokens::delete_all_for_user(&state.pool, user.id).await?;

    audit::log_event(
        &state.pool,
        Some(user.id),
        "user.password_changed",
        "user",
        Some(user.id),
        None,
    )
    .await;

    let (jar, body) = session::issue(&state, user).await?;
    Ok((jar, Json(body)))
}
