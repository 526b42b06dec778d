use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::billing_accounts::AccountFilter;
use crate::db::query::{Page, Paginated};
use crate::error::{AppError, FieldErrors, conflict_on_constraint};
use crate::extract::{Params, Payload};
use crate::middleware::audit;
use crate::models::BillingAccount;
use crate::services::accounts;
use crate::state::SharedState;
use crate::validate;

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub user: Option<Uuid>,
    pub amount: Option<Decimal>,
    pub user_email: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateAccount {
    pub user_id: Uuid,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Params(params): Params<ListParams>,
) -> Result<Json<Paginated<BillingAccount>>, AppError> {
    let page = Page::new(params.page, params.per_page);
    let filter = AccountFilter {
        user: params.user,
        amount: params.amount,
        user_email: params.user_email,
        search: params.search,
    };
    let (accounts, total) =
        db::billing_accounts::list(&state.pool, auth.visibility().owner(), &filter, page).await?;
    Ok(Json(Paginated::new(accounts, total, page)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BillingAccount>, AppError> {
    let account = db::billing_accounts::find_by_id(&state.pool, id, auth.visibility().owner())
        .await?
        .ok_or_else(|| AppError::NotFound("Billing account not found".to_string()))?;
    Ok(Json(account))
}

/// Open an empty account for a user. Balances only move through deposits and ledger entries.
pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Payload(req): Payload<CreateAccount>,
) -> Result<Json<BillingAccount>, AppError> {
    auth.require_admin()?;

    db::users::find_by_id(&state.pool, req.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let account = db::billing_accounts::create(&state.pool, req.user_id)
        .await
        .map_err(|e| conflict_on_constraint(e, "This user already has a billing account"))?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "billing_account.created",
        "billing_account",
        Some(account.id),
        None,
    )
    .await;

    Ok(Json(account))
}

pub async fn deposit(
    auth: AuthUser,
    State(state): State<SharedState>,
    Payload(req): Payload<Value>,
) -> Result<Json<Value>, AppError> {
    let amount = validate::parse_positive_amount(req.get("amount")).map_err(|msg| {
        let mut errors = FieldErrors::new();
        errors.add("amount", msg);
        AppError::Validation(errors)
    })?;

    let (account, entry) = accounts::deposit(&state.pool, auth.user_id, amount).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "billing_account.deposit",
        "billing_account",
        Some(account.id),
        Some(json!({ "transaction_id": entry.id, "amount": amount })),
    )
    .await;

    Ok(Json(json!({
        "message": format!("Successfully deposited {amount} into your account"),
        "balance": account.amount,
    })))
}

pub async fn balance(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    let balance = accounts::balance(&state.pool, auth.user_id).await?;
    Ok(Json(json!({ "balance": balance })))
}
