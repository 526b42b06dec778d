use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::query::{Page, Predicates};
use crate::models::{Role, User};

pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub role: Role,
    pub password_hash: Option<&'a str>,
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    new: &NewUser<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (email, name, role, password_hash)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(new.email)
    .bind(new.name)
    .bind(new.role)
    .bind(new.password_hash)
    .fetch_one(executor)
    .await
}

/// Insert a password-less user unless the email is taken.
/// Returns `None` when a row with that email already exists.
pub async fn create_federated<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    email: &str,
    name: &str,
    role: Role,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (email, name, role, is_active, password_hash)
         VALUES ($1, $2, $3, true, NULL)
         ON CONFLICT (email) DO NOTHING RETURNING *",
    )
    .bind(email)
    .bind(name)
    .bind(role)
    .fetch_optional(executor)
    .await
}

pub async fn find_by_email<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn count_all<'e, E: sqlx::PgExecutor<'e>>(executor: E) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(executor)
        .await?;
    Ok(row.0)
}

#[derive(Debug, Default)]
pub struct UserFilter {
    pub id: Option<Uuid>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

fn apply(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    Predicates::new(qb)
        .eq("id", filter.id)
        .eq("role", filter.role)
        .eq("is_active", filter.is_active)
        .search(&["name", "email"], filter.search.as_deref());
}

pub async fn list(
    pool: &PgPool,
    filter: &UserFilter,
    page: Page,
) -> Result<(Vec<User>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT * FROM users");
    apply(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC");
    page.push_limit(&mut qb);
    let users = qb.build_query_as::<User>().fetch_all(pool).await?;

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users");
    apply(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((users, total))
}

/// Update profile fields; `None` leaves a column unchanged.
pub async fn update_profile<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    email: Option<&str>,
    name: Option<&str>,
    is_active: Option<bool>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET
            email = COALESCE($2, email),
            name = COALESCE($3, name),
            is_active = COALESCE($4, is_active)
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(email)
    .bind(name)
    .bind(is_active)
    .fetch_one(executor)
    .await
}

pub async fn update_password<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn delete<'e, E: sqlx::PgExecutor<'e>>(executor: E, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
