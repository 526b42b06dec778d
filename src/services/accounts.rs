//! Balance-moving operations on the billing ledger.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::query::Page;
use crate::db::transactions::TransactionFilter;
use crate::error::{AppError, out_of_range};
use crate::models::{BillingAccount, Transaction, TransactionStatus};

const BALANCE_OVERFLOW: &str = "The resulting balance exceeds the maximum allowed.";

/// Credit `amount` to the user's account, opening one if needed.
///
/// The balance update and its ledger entry commit together or not at all.
pub async fn deposit(
    pool: &PgPool,
    user_id: Uuid,
    amount: Decimal,
) -> Result<(BillingAccount, Transaction), AppError> {
    let mut tx = pool.begin().await?;

    db::billing_accounts::ensure(&mut *tx, user_id).await?;
    let account = db::billing_accounts::increment_for_user(&mut *tx, user_id, amount)
        .await
        .map_err(|e| out_of_range(e, "amount", BALANCE_OVERFLOW))?
        .ok_or_else(|| AppError::Internal(format!("Billing account for {user_id} vanished")))?;
    let entry =
        db::transactions::create(&mut *tx, account.id, amount, TransactionStatus::Completed)
            .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user_id, account_id = %account.id, %amount, "deposit recorded");
    Ok((account, entry))
}

/// Apply a signed ledger adjustment to an existing account.
pub async fn adjust(
    pool: &PgPool,
    account_id: Uuid,
    amount: Decimal,
    status: TransactionStatus,
) -> Result<(BillingAccount, Transaction), AppError> {
    if amount.is_zero() {
        return Err(AppError::BadRequest("Amount must not be zero.".to_string()));
    }

    let mut tx = pool.begin().await?;

    let account = db::billing_accounts::increment(&mut *tx, account_id, amount)
        .await
        .map_err(|e| out_of_range(e, "amount", BALANCE_OVERFLOW))?
        .ok_or_else(|| AppError::NotFound("Billing account not found".to_string()))?;
    let entry = db::transactions::create(&mut *tx, account.id, amount, status).await?;

    tx.commit().await?;

    tracing::info!(account_id = %account.id, %amount, "ledger adjusted");
    Ok((account, entry))
}

/// Current balance. Reading never opens an account.
pub async fn balance(pool: &PgPool, user_id: Uuid) -> Result<Decimal, AppError> {
    let account = db::billing_accounts::find_by_user(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Billing account not found".to_string()))?;
    Ok(account.amount)
}

/// Admins see every transaction; anyone else only those on their own account.
pub async fn list_transactions(
    pool: &PgPool,
    auth: &AuthUser,
    filter: &TransactionFilter,
    page: Page,
) -> Result<(Vec<Transaction>, i64), AppError> {
    let owner = auth.visibility().owner();
    Ok(db::transactions::list(pool, owner, filter, page).await?)
}
