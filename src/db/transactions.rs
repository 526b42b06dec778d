use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::query::{Page, Predicates};
use crate::models::{Transaction, TransactionStatus};

const FROM: &str = " FROM transactions t
     JOIN billing_accounts a ON a.id = t.account_id
     JOIN users u ON u.id = a.user_id";

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    account_id: Uuid,
    amount: Decimal,
    status: TransactionStatus,
) -> Result<Transaction, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "INSERT INTO transactions (account_id, amount, status)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(account_id)
    .bind(amount)
    .bind(status)
    .fetch_one(executor)
    .await
}

/// `owner` narrows the lookup to transactions on that user's account.
pub async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
    owner: Option<Uuid>,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT t.*{FROM} WHERE t.id = $1 AND ($2::uuid IS NULL OR a.user_id = $2)"
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await
}

#[derive(Debug, Default)]
pub struct TransactionFilter {
    pub amount: Option<Decimal>,
    pub account: Option<Uuid>,
    pub account_user_id: Option<Uuid>,
    pub account_user_email: Option<String>,
    pub status: Option<TransactionStatus>,
    pub search: Option<String>,
}

fn apply(qb: &mut QueryBuilder<'_, Postgres>, owner: Option<Uuid>, filter: &TransactionFilter) {
    Predicates::new(qb)
        .eq("a.user_id", owner)
        .eq("t.amount", filter.amount)
        .eq("t.account_id", filter.account)
        .eq("a.user_id", filter.account_user_id)
        .eq("u.email", filter.account_user_email.clone())
        .eq("t.status", filter.status)
        .search(
            &["t.amount", "t.account_id", "t.status"],
            filter.search.as_deref(),
        );
}

pub async fn list(
    pool: &PgPool,
    owner: Option<Uuid>,
    filter: &TransactionFilter,
    page: Page,
) -> Result<(Vec<Transaction>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::new(format!("SELECT t.*{FROM}"));
    apply(&mut qb, owner, filter);
    qb.push(" ORDER BY t.created_at DESC, t.id");
    page.push_limit(&mut qb);
    let transactions = qb.build_query_as::<Transaction>().fetch_all(pool).await?;

    let mut count = QueryBuilder::new(format!("SELECT COUNT(*){FROM}"));
    apply(&mut count, owner, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((transactions, total))
}

/// Only the status of a ledger entry may change.
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    status: TransactionStatus,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "UPDATE transactions SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await
}
