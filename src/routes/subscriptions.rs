use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::query::{Page, Paginated};
use crate::db::subscriptions::SubscriptionFilter;
use crate::error::{AppError, invalid_reference};
use crate::extract::{Params, Payload};
use crate::middleware::audit;
use crate::models::{Subscription, SubscriptionStatus};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub plan: Option<Uuid>,
    pub account: Option<Uuid>,
    pub account_user_id: Option<Uuid>,
    pub status: Option<SubscriptionStatus>,
}

#[derive(Deserialize)]
pub struct CreateSubscription {
    pub account_id: Uuid,
    pub plan_id: Uuid,
    pub status: Option<SubscriptionStatus>,
}

#[derive(Deserialize)]
pub struct UpdateSubscription {
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
}

const MISSING_REFERENCE: &str = "Billing account or rate plan does not exist";

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Params(params): Params<ListParams>,
) -> Result<Json<Paginated<Subscription>>, AppError> {
    let page = Page::new(params.page, params.per_page);
    let filter = SubscriptionFilter {
        plan: params.plan,
        account: params.account,
        account_user_id: params.account_user_id,
        status: params.status,
        search: params.search,
    };
    let (subscriptions, total) =
        db::subscriptions::list(&state.pool, auth.visibility().owner(), &filter, page).await?;
    Ok(Json(Paginated::new(subscriptions, total, page)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Subscription>, AppError> {
    let subscription = db::subscriptions::find_by_id(&state.pool, id, auth.visibility().owner())
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;
    Ok(Json(subscription))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Payload(req): Payload<CreateSubscription>,
) -> Result<Json<Subscription>, AppError> {
    auth.require_admin()?;

    let subscription = db::subscriptions::create(
        &state.pool,
        req.account_id,
        req.plan_id,
        req.status.unwrap_or_default(),
    )
    .await
    .map_err(|e| invalid_reference(e, MISSING_REFERENCE))?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "subscription.created",
        "subscription",
        Some(subscription.id),
        None,
    )
    .await;

    Ok(Json(subscription))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Payload(req): Payload<UpdateSubscription>,
) -> Result<Json<Subscription>, AppError> {
    auth.require_admin()?;

    let subscription = db::subscriptions::update(&state.pool, id, req.plan_id, req.status)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Subscription not found".to_string()),
            _ => invalid_reference(e, MISSING_REFERENCE),
        })?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "subscription.updated",
        "subscription",
        Some(subscription.id),
        None,
    )
    .await;

    Ok(Json(subscription))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    if db::subscriptions::delete(&state.pool, id).await? == 0 {
        return Err(AppError::NotFound("Subscription not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "subscription.deleted",
        "subscription",
        Some(id),
        None,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
