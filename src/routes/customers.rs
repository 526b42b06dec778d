use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::customers::{CustomerFilter, CustomerStatistics};
use crate::db::query::{Page, Paginated};
use crate::error::{AppError, FieldErrors};
use crate::extract::{Params, Payload};
use crate::middleware::audit;
use crate::models::Customer;
use crate::services::directory::{self, MemberFields, ProfileChanges};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub suspended: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateCustomer {
    #[serde(flatten)]
    pub member: MemberFields,
    #[serde(default)]
    pub suspended: bool,
}

#[derive(Deserialize)]
pub struct UpdateCustomer {
    #[serde(flatten)]
    pub profile: ProfileChanges,
    pub suspended: Option<bool>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Params(params): Params<ListParams>,
) -> Result<Json<Paginated<Customer>>, AppError> {
    auth.require_admin()?;
    let page = Page::new(params.page, params.per_page);
    let filter = CustomerFilter {
        suspended: params.suspended,
        search: params.search,
    };
    let (customers, total) = db::customers::list(&state.pool, &filter, page).await?;
    Ok(Json(Paginated::new(customers, total, page)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>, AppError> {
    auth.require_admin()?;
    Ok(Json(find(&state, id).await?))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Payload(req): Payload<CreateCustomer>,
) -> Result<Json<Customer>, AppError> {
    auth.require_admin()?;
    let member = req.member.into_member()?;

    let customer = directory::create_customer(&state.pool, &member, req.suspended).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "customer.created",
        "customer",
        Some(customer.id),
        Some(json!({ "email": customer.email })),
    )
    .await;

    Ok(Json(customer))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Payload(req): Payload<UpdateCustomer>,
) -> Result<Json<Customer>, AppError> {
    auth.require_admin()?;
    let customer = find(&state, id).await?;

    let mut tx = state.pool.begin().await?;
    directory::update_profile_in(&mut tx, customer.user_id, &req.profile).await?;
    if let Some(suspended) = req.suspended {
        db::customers::set_suspended(&mut *tx, id, suspended).await?;
    }
    tx.commit().await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "customer.updated",
        "customer",
        Some(id),
        None,
    )
    .await;

    Ok(Json(find(&state, id).await?))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_admin()?;
    let customer = find(&state, id).await?;

    directory::delete_user(&state.pool, customer.user_id).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "customer.deleted",
        "customer",
        Some(id),
        Some(json!({ "email": customer.email })),
    )
    .await;

    Ok(Json(json!({ "message": "Deleted" })))
}

pub async fn statistics(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<CustomerStatistics>, AppError> {
    auth.require_admin()?;
    Ok(Json(db::customers::statistics(&state.pool).await?))
}

/// Set or clear the suspension flag. Unknown customers are reported before a bad body,
/// and repeating the current value still succeeds.
pub async fn suspend(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Payload(req): Payload<Value>,
) -> Result<Json<Value>, AppError> {
    auth.require_admin()?;
    find(&state, id).await?;

    let suspend = match req.get("suspend") {
        Some(Value::Bool(flag)) => *flag,
        other => {
            let mut errors = FieldErrors::new();
            let message = if other.is_none_or(Value::is_null) {
                "This field is required."
            } else {
                "Must be a valid boolean."
            };
            errors.add("suspend", message);
            return Err(AppError::Validation(errors));
        }
    };

    if db::customers::set_suspended(&state.pool, id, suspend).await? == 0 {
        return Err(AppError::NotFound("Customer not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        if suspend {
            "customer.suspended"
        } else {
            "customer.unsuspended"
        },
        "customer",
        Some(id),
        None,
    )
    .await;

    Ok(Json(json!({ "success": "Customer account suspended successfully" })))
}

async fn find(state: &SharedState, id: Uuid) -> Result<Customer, AppError> {
    db::customers::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))
}
