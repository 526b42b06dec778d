use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::query::{Page, Predicates};
use crate::models::{Guest, GuestStatus};

const SELECT: &str = "SELECT g.id, g.user_id, g.customer_id, u.email, u.name, u.is_active, g.status, g.created_at
     FROM guests g
     JOIN users u ON u.id = g.user_id
     JOIN customers c ON c.id = g.customer_id
     JOIN users cu ON cu.id = c.user_id";

const COUNT: &str = "SELECT COUNT(*)
     FROM guests g
     JOIN users u ON u.id = g.user_id
     JOIN customers c ON c.id = g.customer_id
     JOIN users cu ON cu.id = c.user_id";

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    customer_id: Uuid,
    status: GuestStatus,
) -> Result<Uuid, sqlx::Error> {
    let row: (Uuid,) = sqlx::query_as(
        "INSERT INTO guests (user_id, customer_id, status) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(customer_id)
    .bind(status)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// `owner` narrows the lookup to guests of that customer.
pub async fn find_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    owner: Option<Uuid>,
) -> Result<Option<Guest>, sqlx::Error> {
    sqlx::query_as::<_, Guest>(&format!(
        "{SELECT} WHERE g.id = $1 AND ($2::uuid IS NULL OR g.customer_id = $2)"
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(executor)
    .await
}

#[derive(Debug, Default)]
pub struct GuestFilter {
    pub status: Option<GuestStatus>,
    pub customer_email: Option<String>,
    pub customer_user_id: Option<Uuid>,
    pub search: Option<String>,
}

fn apply(qb: &mut QueryBuilder<'_, Postgres>, owner: Option<Uuid>, filter: &GuestFilter) {
    Predicates::new(qb)
        .eq("g.customer_id", owner)
        .eq("g.status", filter.status)
        .eq("cu.email", filter.customer_email.clone())
        .eq("cu.id", filter.customer_user_id)
        .search(&["u.name", "u.email"], filter.search.as_deref());
}

pub async fn list(
    pool: &PgPool,
    owner: Option<Uuid>,
    filter: &GuestFilter,
    page: Page,
) -> Result<(Vec<Guest>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::new(SELECT);
    apply(&mut qb, owner, filter);
    qb.push(" ORDER BY g.created_at DESC");
    page.push_limit(&mut qb);
    let guests = qb.build_query_as::<Guest>().fetch_all(pool).await?;

    let mut count = QueryBuilder::new(COUNT);
    apply(&mut count, owner, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((guests, total))
}

pub async fn update_status<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    status: GuestStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE guests SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct GuestStatistics {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

pub async fn statistics(pool: &PgPool, owner: Option<Uuid>) -> Result<GuestStatistics, sqlx::Error> {
    sqlx::query_as::<_, GuestStatistics>(
        "SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = 'active') AS active,
            COUNT(*) FILTER (WHERE status = 'inactive') AS inactive
         FROM guests
         WHERE $1::uuid IS NULL OR customer_id = $1",
    )
    .bind(owner)
    .fetch_one(pool)
    .await
}
