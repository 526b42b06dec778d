use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::query::{Page, Predicates};
use crate::models::BillingAccount;

pub async fn create(pool: &PgPool, user_id: Uuid) -> Result<BillingAccount, sqlx::Error> {
    sqlx::query_as::<_, BillingAccount>(
        "INSERT INTO billing_accounts (user_id) VALUES ($1) RETURNING *",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Make sure `user_id` has an account; a no-op when it already does.
pub async fn ensure<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO billing_accounts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Add `delta` to the balance of the user's account and return the updated row.
pub async fn increment_for_user<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    delta: Decimal,
) -> Result<Option<BillingAccount>, sqlx::Error> {
    sqlx::query_as::<_, BillingAccount>(
        "UPDATE billing_accounts SET amount = amount + $2, updated_at = now()
         WHERE user_id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(delta)
    .fetch_optional(executor)
    .await
}

pub async fn increment<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    delta: Decimal,
) -> Result<Option<BillingAccount>, sqlx::Error> {
    sqlx::query_as::<_, BillingAccount>(
        "UPDATE billing_accounts SET amount = amount + $2, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(delta)
    .fetch_optional(executor)
    .await
}

pub async fn find_by_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<BillingAccount>, sqlx::Error> {
    sqlx::query_as::<_, BillingAccount>("SELECT * FROM billing_accounts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// `owner` narrows the lookup to that user's account.
pub async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
    owner: Option<Uuid>,
) -> Result<Option<BillingAccount>, sqlx::Error> {
    sqlx::query_as::<_, BillingAccount>(
        "SELECT * FROM billing_accounts WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)",
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await
}

#[derive(Debug, Default)]
pub struct AccountFilter {
    pub user: Option<Uuid>,
    pub amount: Option<Decimal>,
    pub user_email: Option<String>,
    pub search: Option<String>,
}

fn apply(qb: &mut QueryBuilder<'_, Postgres>, owner: Option<Uuid>, filter: &AccountFilter) {
    Predicates::new(qb)
        .eq("a.user_id", owner)
        .eq("a.user_id", filter.user)
        .eq("a.amount", filter.amount)
        .eq("u.email", filter.user_email.clone())
        .search(&["a.user_id", "a.amount"], filter.search.as_deref());
}

pub async fn list(
    pool: &PgPool,
    owner: Option<Uuid>,
    filter: &AccountFilter,
    page: Page,
) -> Result<(Vec<BillingAccount>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::new(
        "SELECT a.* FROM billing_accounts a JOIN users u ON u.id = a.user_id",
    );
    apply(&mut qb, owner, filter);
    qb.push(" ORDER BY a.created_at DESC");
    page.push_limit(&mut qb);
    let accounts = qb.build_query_as::<BillingAccount>().fetch_all(pool).await?;

    let mut count = QueryBuilder::new(
        "SELECT COUNT(*) FROM billing_accounts a JOIN users u ON u.id = a.user_id",
    );
    apply(&mut count, owner, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((accounts, total))
}
