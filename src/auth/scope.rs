//! Row visibility applied before every listing, lookup and statistic.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    All,
    /// Only rows owned by this id (a user id or a customer id, depending on the resource).
    Owner(Uuid),
}

impl Visibility {
    /// The owner id to bind into a query, `None` meaning unrestricted.
    pub fn owner(self) -> Option<Uuid> {
        match self {
            Visibility::All => None,
            Visibility::Owner(id) => Some(id),
        }
    }
}

/// Guests are owned by customers: admins see all of them, customers their own.
/// A non-admin caller with no customer record has nothing to scope by.
pub async fn guest_visibility(pool: &PgPool, auth: &AuthUser) -> Result<Visibility, AppError> {
    if auth.is_admin() {
        return Ok(Visibility::All);
    }
    let customer = db::customers::find_by_user(pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;
    Ok(Visibility::Owner(customer.id))
}
