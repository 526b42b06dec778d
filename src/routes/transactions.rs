use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::query::{Page, Paginated};
use crate::db::transactions::TransactionFilter;
use crate::error::{AppError, FieldErrors};
use crate::extract::{Params, Payload};
use crate::middleware::audit;
use crate::models::{Transaction, TransactionStatus};
use crate::services::accounts;
use crate::state::SharedState;
use crate::validate;

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub amount: Option<Decimal>,
    pub account: Option<Uuid>,
    pub account_user_id: Option<Uuid>,
    pub account_user_email: Option<String>,
    pub status: Option<TransactionStatus>,
}

#[derive(Deserialize)]
pub struct CreateTransaction {
    pub account_id: Uuid,
    pub amount: Value,
    pub status: Option<TransactionStatus>,
}

#[derive(Deserialize)]
pub struct UpdateTransaction {
    pub status: TransactionStatus,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Params(params): Params<ListParams>,
) -> Result<Json<Paginated<Transaction>>, AppError> {
    let page = Page::new(params.page, params.per_page);
    let filter = TransactionFilter {
        amount: params.amount,
        account: params.account,
        account_user_id: params.account_user_id,
        account_user_email: params.account_user_email,
        status: params.status,
        search: params.search,
    };
    let (transactions, total) =
        accounts::list_transactions(&state.pool, &auth, &filter, page).await?;
    Ok(Json(Paginated::new(transactions, total, page)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = db::transactions::find_by_id(&state.pool, id, auth.visibility().owner())
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;
    Ok(Json(transaction))
}

/// Admin ledger adjustment: moves the balance and appends the entry atomically.
pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Payload(req): Payload<CreateTransaction>,
) -> Result<Json<Value>, AppError> {
    auth.require_admin()?;

    let amount = validate::parse_amount(&req.amount).map_err(|msg| {
        let mut errors = FieldErrors::new();
        errors.add("amount", msg);
        AppError::Validation(errors)
    })?;

    let (account, entry) = accounts::adjust(
        &state.pool,
        req.account_id,
        amount,
        req.status.unwrap_or_default(),
    )
    .await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "transaction.created",
        "transaction",
        Some(entry.id),
        Some(json!({ "account_id": account.id, "amount": amount })),
    )
    .await;

    Ok(Json(json!({
        "transaction": entry,
        "balance": account.amount,
    })))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Payload(req): Payload<UpdateTransaction>,
) -> Result<Json<Transaction>, AppError> {
    auth.require_admin()?;

    let transaction = db::transactions::update_status(&state.pool, id, req.status)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "transaction.updated",
        "transaction",
        Some(id),
        Some(json!({ "status": req.status })),
    )
    .await;

    Ok(Json(transaction))
}
