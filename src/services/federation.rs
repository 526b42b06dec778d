//! Sign-in through an external identity provider.

use sqlx::PgPool;

use crate::db;
use crate::error::AppError;
use crate::identity::{IdentityError, IdentityProvider};
use crate::models::{Role, User};
use crate::validate;

/// Resolve a provider token to a local user, creating it on first sign-in.
///
/// Newly created users are active customers without a local password. An
/// existing user is returned untouched.
pub async fn sign_in(
    pool: &PgPool,
    provider: &dyn IdentityProvider,
    token: Option<&str>,
) -> Result<User, AppError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Token is required.".to_string()))?;

    let profile = provider.exchange(token).await.map_err(|e| match e {
        IdentityError::Rejected { body, .. } => {
            AppError::Upstream(format!("Google API request failed: {body}"))
        }
        IdentityError::Transport(msg) => AppError::Internal(msg),
    })?;

    let email = profile
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email is required.".to_string()))?;

    if !validate::is_valid_email(email) {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    let email = email.to_lowercase();

    if let Some(user) = db::users::find_by_email(pool, &email).await? {
        return Ok(user);
    }

    let name = profile.name.unwrap_or_default();
    let mut tx = pool.begin().await?;
    let created = db::users::create_federated(&mut *tx, &email, &name, Role::Customer).await?;

    let user = match created {
        Some(user) => {
            db::customers::create(&mut *tx, user.id, false).await?;
            tx.commit().await?;
            tracing::info!(user_id = %user.id, "federated user created");
            user
        }
        // Lost a race with a concurrent first sign-in for the same email
        None => {
            tx.rollback().await?;
            db::users::find_by_email(pool, &email)
                .await?
                .ok_or_else(|| AppError::Internal("Federated user disappeared".to_string()))?
        }
    };

    Ok(user)
}
