use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::query::{Page, Predicates};
use crate::models::GeneralAdmin;

const SELECT: &str = "SELECT a.id, a.user_id, u.email, u.name, u.is_active, a.created_at
     FROM general_admins a JOIN users u ON u.id = a.user_id";

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> Result<Uuid, sqlx::Error> {
    let row: (Uuid,) =
        sqlx::query_as("INSERT INTO general_admins (user_id) VALUES ($1) RETURNING id")
            .bind(user_id)
            .fetch_one(executor)
            .await?;
    Ok(row.0)
}

pub async fn find_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<GeneralAdmin>, sqlx::Error> {
    sqlx::query_as::<_, GeneralAdmin>(&format!("{SELECT} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

fn apply(qb: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    Predicates::new(qb).search(&["u.name", "u.email"], search);
}

pub async fn list(
    pool: &PgPool,
    search: Option<&str>,
    page: Page,
) -> Result<(Vec<GeneralAdmin>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::new(SELECT);
    apply(&mut qb, search);
    qb.push(" ORDER BY a.created_at DESC");
    page.push_limit(&mut qb);
    let admins = qb.build_query_as::<GeneralAdmin>().fetch_all(pool).await?;

    let mut count = QueryBuilder::new(
        "SELECT COUNT(*) FROM general_admins a JOIN users u ON u.id = a.user_id",
    );
    apply(&mut count, search);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((admins, total))
}
