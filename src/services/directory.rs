//! Creation of users together with their role record.

use serde::Deserialize;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::auth::password;
use crate::db;
use crate::db::users::NewUser;
use crate::error::{AppError, FieldErrors, conflict_on_constraint, invalid_reference};
use crate::models::{Customer, GeneralAdmin, Guest, GuestStatus, Role, User};
use crate::validate;

const DUPLICATE_EMAIL: &str = "A user with this email already exists";

/// Identity fields accepted wherever a user is created.
#[derive(Debug, Default, Deserialize)]
pub struct MemberFields {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Validated [`MemberFields`] with the password already hashed.
#[derive(Debug)]
pub struct Member {
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
}

impl MemberFields {
    /// Record problems into `errors`; returns the normalized email and name when usable.
    pub fn check(&self, errors: &mut FieldErrors) -> Option<(String, String)> {
        let email = self.email.as_deref().map(str::trim).unwrap_or_default();
        if email.is_empty() {
            errors.add("email", "This field is required.");
        } else if !validate::is_valid_email(email) {
            errors.add("email", "Enter a valid email address.");
        }

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.chars().count() > 255 {
            errors.add("name", "Ensure this field has no more than 255 characters.");
        }

        if let Some(pw) = self.password.as_deref() {
            if let Err(msg) = password::check_length(pw) {
                errors.add("password", msg);
            }
        }

        if errors.is_empty() {
            Some((email.to_lowercase(), name.to_string()))
        } else {
            None
        }
    }

    pub fn into_member(self) -> Result<Member, AppError> {
        let mut errors = FieldErrors::new();
        let checked = self.check(&mut errors);
        let Some((email, name)) = checked else {
            return Err(AppError::Validation(errors));
        };
        let password_hash = self
            .password
            .as_deref()
            .map(password::hash)
            .transpose()
            .map_err(AppError::Internal)?;
        Ok(Member {
            email,
            name,
            password_hash,
        })
    }
}

pub async fn insert_user<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    member: &Member,
    role: Role,
) -> Result<User, AppError> {
    db::users::create(
        executor,
        &NewUser {
            email: &member.email,
            name: &member.name,
            role,
            password_hash: member.password_hash.as_deref(),
        },
    )
    .await
    .map_err(|e| conflict_on_constraint(e, DUPLICATE_EMAIL))
}

pub async fn create_admin(pool: &PgPool, member: &Member) -> Result<GeneralAdmin, AppError> {
    let mut tx = pool.begin().await?;
    let user = insert_user(&mut *tx, member, Role::Admin).await?;
    let id = db::general_admins::create(&mut *tx, user.id).await?;
    let admin = fetch(db::general_admins::find_by_id(&mut *tx, id).await?)?;
    tx.commit().await?;
    Ok(admin)
}

pub async fn create_customer(
    pool: &PgPool,
    member: &Member,
    suspended: bool,
) -> Result<Customer, AppError> {
    let mut tx = pool.begin().await?;
    let customer = create_customer_in(&mut tx, member, suspended).await?;
    tx.commit().await?;
    Ok(customer)
}

pub async fn create_customer_in(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    member: &Member,
    suspended: bool,
) -> Result<Customer, AppError> {
    let user = insert_user(&mut **tx, member, Role::Customer).await?;
    let id = db::customers::create(&mut **tx, user.id, suspended).await?;
    fetch(db::customers::find_by_id(&mut **tx, id).await?)
}

pub async fn create_guest(
    pool: &PgPool,
    member: &Member,
    customer_id: Uuid,
    status: GuestStatus,
) -> Result<Guest, AppError> {
    let mut tx = pool.begin().await?;
    let user = insert_user(&mut *tx, member, Role::Guest).await?;
    let id = db::guests::create(&mut *tx, user.id, customer_id, status)
        .await
        .map_err(|e| invalid_reference(e, "Customer does not exist"))?;
    let guest = fetch(db::guests::find_by_id(&mut *tx, id, None).await?)?;
    tx.commit().await?;
    Ok(guest)
}

/// Partial profile update; absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

impl ProfileChanges {
    fn validate(&self) -> Result<(Option<String>, Option<&str>), AppError> {
        let mut errors = FieldErrors::new();

        let email = self.email.as_deref().map(|e| e.trim().to_lowercase());
        if email.as_deref().is_some_and(|e| !validate::is_valid_email(e)) {
            errors.add("email", "Enter a valid email address.");
        }
        let name = self.name.as_deref().map(str::trim);
        if name.is_some_and(|n| n.chars().count() > 255) {
            errors.add("name", "Ensure this field has no more than 255 characters.");
        }
        if let Some(Err(msg)) = self.password.as_deref().map(password::check_length) {
            errors.add("password", msg);
        }

        errors.check()?;
        Ok((email, name))
    }
}

/// Apply `changes` to a user. A new password revokes the user's refresh tokens.
pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    changes: &ProfileChanges,
) -> Result<User, AppError> {
    let mut tx = pool.begin().await?;
    let user = update_profile_in(&mut tx, user_id, changes).await?;
    tx.commit().await?;
    Ok(user)
}

/// `update_profile` inside a caller-owned transaction, so role-specific writes can join it.
pub async fn update_profile_in(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    user_id: Uuid,
    changes: &ProfileChanges,
) -> Result<User, AppError> {
    let (email, name) = changes.validate()?;
    let password_hash = changes
        .password
        .as_deref()
        .map(password::hash)
        .transpose()
        .map_err(AppError::Internal)?;

    let user = db::users::update_profile(
        &mut **tx,
        user_id,
        email.as_deref(),
        name,
        changes.is_active,
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::NotFound("User not found".to_string()),
        _ => conflict_on_constraint(e, DUPLICATE_EMAIL),
    })?;

    if let Some(hash) = password_hash.as_deref() {
        db::users::update_password(&mut **tx, user_id, hash).await?;
        db::refresh_tokens::delete_all_for_user(&mut **tx, user_id).await?;
    }
    Ok(user)
}

/// Remove a user together with its role record.
pub async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    let deleted = db::users::delete(pool, user_id)
        .await
        .map_err(|e| conflict_on_constraint(e, "User still has a billing account"))?;
    if deleted == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}

fn fetch<T>(row: Option<T>) -> Result<T, AppError> {
    row.ok_or_else(|| AppError::Internal("Row missing right after insert".to_string()))
}
