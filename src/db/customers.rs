use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::query::{Page, Predicates};
use crate::models::Customer;

const SELECT: &str = "SELECT c.id, c.user_id, u.email, u.name, u.is_active, c.suspended, c.created_at
     FROM customers c JOIN users u ON u.id = c.user_id";

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    suspended: bool,
) -> Result<Uuid, sqlx::Error> {
    let row: (Uuid,) =
        sqlx::query_as("INSERT INTO customers (user_id, suspended) VALUES ($1, $2) RETURNING id")
            .bind(user_id)
            .bind(suspended)
            .fetch_one(executor)
            .await?;
    Ok(row.0)
}

pub async fn find_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as::<_, Customer>(&format!("{SELECT} WHERE c.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_user<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as::<_, Customer>(&format!("{SELECT} WHERE c.user_id = $1"))
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

#[derive(Debug, Default)]
pub struct CustomerFilter {
    pub suspended: Option<bool>,
    pub search: Option<String>,
}

fn apply(qb: &mut QueryBuilder<'_, Postgres>, filter: &CustomerFilter) {
    Predicates::new(qb)
        .eq("c.suspended", filter.suspended)
        .search(&["u.name", "u.email"], filter.search.as_deref());
}

pub async fn list(
    pool: &PgPool,
    filter: &CustomerFilter,
    page: Page,
) -> Result<(Vec<Customer>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::new(SELECT);
    apply(&mut qb, filter);
    qb.push(" ORDER BY c.created_at DESC");
    page.push_limit(&mut qb);
    let customers = qb.build_query_as::<Customer>().fetch_all(pool).await?;

    let mut count =
        QueryBuilder::new("SELECT COUNT(*) FROM customers c JOIN users u ON u.id = c.user_id");
    apply(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((customers, total))
}

/// Returns the number of rows touched; setting the current value still counts.
pub async fn set_suspended<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    suspended: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE customers SET suspended = $2 WHERE id = $1")
        .bind(id)
        .bind(suspended)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CustomerStatistics {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    /// Every guest in the system, not only those of the counted customers.
    pub guests: i64,
}

pub async fn statistics(pool: &PgPool) -> Result<CustomerStatistics, sqlx::Error> {
    sqlx::query_as::<_, CustomerStatistics>(
        "SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE NOT suspended) AS active,
            COUNT(*) FILTER (WHERE suspended) AS inactive,
            (SELECT COUNT(*) FROM guests) AS guests
         FROM customers",
    )
    .fetch_one(pool)
    .await
}
