use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::query::{Page, Paginated};
use crate::db::rate_plans::{PlanFields, RatePlanFilter};
use crate::error::{AppError, FieldErrors, conflict_on_constraint};
use crate::extract::{Params, Payload};
use crate::middleware::audit;
use crate::models::RatePlan;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub plan: Option<String>,
    pub price: Option<Decimal>,
    pub vm_limit: Option<i32>,
    pub backup_limit: Option<i32>,
}

#[derive(Deserialize)]
pub struct RatePlanRequest {
    pub plan: String,
    pub price: Decimal,
    #[serde(default)]
    pub vm_limit: i32,
    #[serde(default)]
    pub backup_limit: i32,
}

impl RatePlanRequest {
    fn validate(&self) -> Result<PlanFields<'_>, AppError> {
        let mut errors = FieldErrors::new();
        let plan = self.plan.trim();
        if plan.is_empty() {
            errors.add("plan", "This field may not be blank.");
        }
        if self.price.is_sign_negative() {
            errors.add("price", "Ensure this value is greater than or equal to 0.");
        }
        if self.price.normalize().scale() > 2 {
            errors.add("price", "Ensure that there are no more than 2 decimal places.");
        }
        if self.vm_limit < 0 {
            errors.add("vm_limit", "Ensure this value is greater than or equal to 0.");
        }
        if self.backup_limit < 0 {
            errors.add("backup_limit", "Ensure this value is greater than or equal to 0.");
        }
        errors.check()?;

        Ok(PlanFields {
            plan,
            price: self.price,
            vm_limit: self.vm_limit,
            backup_limit: self.backup_limit,
        })
    }
}

pub async fn list(
    _auth: AuthUser,
    State(state): State<SharedState>,
    Params(params): Params<ListParams>,
) -> Result<Json<Paginated<RatePlan>>, AppError> {
    let page = Page::new(params.page, params.per_page);
    let filter = RatePlanFilter {
        plan: params.plan,
        price: params.price,
        vm_limit: params.vm_limit,
        backup_limit: params.backup_limit,
        search: params.search,
    };
    let (plans, total) = db::rate_plans::list(&state.pool, &filter, page).await?;
    Ok(Json(Paginated::new(plans, total, page)))
}

pub async fn get(
    _auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RatePlan>, AppError> {
    let plan = db::rate_plans::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Rate plan not found".to_string()))?;
    Ok(Json(plan))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Payload(req): Payload<RatePlanRequest>,
) -> Result<Json<RatePlan>, AppError> {
    auth.require_admin()?;
    let fields = req.validate()?;

    let plan = db::rate_plans::create(&state.pool, &fields).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "rate_plan.created",
        "rate_plan",
        Some(plan.id),
        None,
    )
    .await;

    Ok(Json(plan))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Payload(req): Payload<RatePlanRequest>,
) -> Result<Json<RatePlan>, AppError> {
    auth.require_admin()?;
    let fields = req.validate()?;

    let plan = db::rate_plans::update(&state.pool, id, &fields)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Rate plan not found".to_string()),
            _ => AppError::Database(e),
        })?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "rate_plan.updated",
        "rate_plan",
        Some(plan.id),
        None,
    )
    .await;

    Ok(Json(plan))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let deleted = db::rate_plans::delete(&state.pool, id)
        .await
        .map_err(|e| conflict_on_constraint(e, "Rate plan has subscriptions"))?;
    if deleted == 0 {
        return Err(AppError::NotFound("Rate plan not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "rate_plan.deleted",
        "rate_plan",
        Some(id),
        None,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
