use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::query::{Page, Predicates};
use crate::models::{Subscription, SubscriptionStatus};

const FROM: &str = " FROM subscriptions s
     JOIN billing_accounts a ON a.id = s.account_id
     JOIN users u ON u.id = a.user_id
     JOIN rate_plans p ON p.id = s.plan_id";

pub async fn create(
    pool: &PgPool,
    account_id: Uuid,
    plan_id: Uuid,
    status: SubscriptionStatus,
) -> Result<Subscription, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        "INSERT INTO subscriptions (account_id, plan_id, status)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(account_id)
    .bind(plan_id)
    .bind(status)
    .fetch_one(pool)
    .await
}

/// `owner` narrows the lookup to subscriptions on that user's account.
pub async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
    owner: Option<Uuid>,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(&format!(
        "SELECT s.*{FROM} WHERE s.id = $1 AND ($2::uuid IS NULL OR a.user_id = $2)"
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await
}

#[derive(Debug, Default)]
pub struct SubscriptionFilter {
    pub plan: Option<Uuid>,
    pub account: Option<Uuid>,
    pub account_user_id: Option<Uuid>,
    pub status: Option<SubscriptionStatus>,
    pub search: Option<String>,
}

fn apply(qb: &mut QueryBuilder<'_, Postgres>, owner: Option<Uuid>, filter: &SubscriptionFilter) {
    Predicates::new(qb)
        .eq("a.user_id", owner)
        .eq("s.plan_id", filter.plan)
        .eq("s.account_id", filter.account)
        .eq("a.user_id", filter.account_user_id)
        .eq("s.status", filter.status)
        .search(
            &["p.plan", "u.name", "u.email", "s.status"],
            filter.search.as_deref(),
        );
}

pub async fn list(
    pool: &PgPool,
    owner: Option<Uuid>,
    filter: &SubscriptionFilter,
    page: Page,
) -> Result<(Vec<Subscription>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::new(format!("SELECT s.*{FROM}"));
    apply(&mut qb, owner, filter);
    qb.push(" ORDER BY s.created_at DESC");
    page.push_limit(&mut qb);
    let subscriptions = qb.build_query_as::<Subscription>().fetch_all(pool).await?;

    let mut count = QueryBuilder::new(format!("SELECT COUNT(*){FROM}"));
    apply(&mut count, owner, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((subscriptions, total))
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    plan_id: Uuid,
    status: SubscriptionStatus,
) -> Result<Subscription, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        "UPDATE subscriptions SET plan_id = $2, status = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(plan_id)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
