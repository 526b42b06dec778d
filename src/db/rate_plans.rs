use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::query::{Page, Predicates};
use crate::models::RatePlan;

pub struct PlanFields<'a> {
    pub plan: &'a str,
    pub price: Decimal,
    pub vm_limit: i32,
    pub backup_limit: i32,
}

pub async fn create(pool: &PgPool, fields: &PlanFields<'_>) -> Result<RatePlan, sqlx::Error> {
    sqlx::query_as::<_, RatePlan>(
        "INSERT INTO rate_plans (plan, price, vm_limit, backup_limit)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(fields.plan)
    .bind(fields.price)
    .bind(fields.vm_limit)
    .bind(fields.backup_limit)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<RatePlan>, sqlx::Error> {
    sqlx::query_as::<_, RatePlan>("SELECT * FROM rate_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

#[derive(Debug, Default)]
pub struct RatePlanFilter {
    pub plan: Option<String>,
    pub price: Option<Decimal>,
    pub vm_limit: Option<i32>,
    pub backup_limit: Option<i32>,
    pub search: Option<String>,
}

fn apply(qb: &mut QueryBuilder<'_, Postgres>, filter: &RatePlanFilter) {
    Predicates::new(qb)
        .eq("plan", filter.plan.clone())
        .eq("price", filter.price)
        .eq("vm_limit", filter.vm_limit)
        .eq("backup_limit", filter.backup_limit)
        .search(
            &["plan", "price", "vm_limit", "backup_limit"],
            filter.search.as_deref(),
        );
}

pub async fn list(
    pool: &PgPool,
    filter: &RatePlanFilter,
    page: Page,
) -> Result<(Vec<RatePlan>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT * FROM rate_plans");
    apply(&mut qb, filter);
    qb.push(" ORDER BY price ASC, created_at ASC");
    page.push_limit(&mut qb);
    let plans = qb.build_query_as::<RatePlan>().fetch_all(pool).await?;

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM rate_plans");
    apply(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((plans, total))
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    fields: &PlanFields<'_>,
) -> Result<RatePlan, sqlx::Error> {
    sqlx::query_as::<_, RatePlan>(
        "UPDATE rate_plans SET plan = $2, price = $3, vm_limit = $4, backup_limit = $5
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(fields.plan)
    .bind(fields.price)
    .bind(fields.vm_limit)
    .bind(fields.backup_limit)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM rate_plans WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
