//! Guests registered by, and visible to, their owning customer.

use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::extractor::AuthUser;
use crate::auth::scope::guest_visibility;
use crate::db;
use crate::db::guests::{GuestFilter, GuestStatistics};
use crate::db::query::Page;
use crate::error::AppError;
use crate::models::{Guest, GuestStatus};
use crate::services::directory::{self, MemberFields};

#[derive(Debug, Default, Deserialize)]
pub struct GuestRegistration {
    #[serde(flatten)]
    pub member: MemberFields,
    pub status: Option<GuestStatus>,
}

/// Create a guest owned by the calling customer.
pub async fn register(
    pool: &PgPool,
    auth: &AuthUser,
    registration: GuestRegistration,
) -> Result<Guest, AppError> {
    let customer = db::customers::find_by_user(pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;

    let member = registration.member.into_member()?;
    let status = registration.status.unwrap_or_default();

    let guest = directory::create_guest(pool, &member, customer.id, status).await?;
    tracing::info!(guest_id = %guest.id, customer_id = %customer.id, "guest registered");
    Ok(guest)
}

pub async fn list(
    pool: &PgPool,
    auth: &AuthUser,
    filter: &GuestFilter,
    page: Page,
) -> Result<(Vec<Guest>, i64), AppError> {
    let owner = guest_visibility(pool, auth).await?.owner();
    Ok(db::guests::list(pool, owner, filter, page).await?)
}

/// Counts over exactly the guests `list` would return without filters.
pub async fn statistics(pool: &PgPool, auth: &AuthUser) -> Result<GuestStatistics, AppError> {
    let owner = guest_visibility(pool, auth).await?.owner();
    Ok(db::guests::statistics(pool, owner).await?)
}
