use sqlx::PgPool;
use uuid::Uuid;

use crate::db::query::Page;
use crate::models::AuditEvent;

pub async fn log_event(
    pool: &PgPool,
    user_id: Option<Uuid>,
    action: &str,
    resource_type: &str,
    resource_id: Option<Uuid>,
    details: Option<serde_json::Value>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_events (user_id, action, resource_type, resource_id, details)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(action)
    .bind(resource_type)
    .bind(resource_id)
    .bind(details)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list(
    pool: &PgPool,
    resource_type: Option<&str>,
    page: Page,
) -> Result<(Vec<AuditEvent>, i64), sqlx::Error> {
    let events = sqlx::query_as::<_, AuditEvent>(
        "SELECT * FROM audit_events WHERE $1::text IS NULL OR resource_type = $1
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(resource_type)
    .bind(page.per_page)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audit_events WHERE $1::text IS NULL OR resource_type = $1",
    )
    .bind(resource_type)
    .fetch_one(pool)
    .await?;

    Ok((events, total))
}
