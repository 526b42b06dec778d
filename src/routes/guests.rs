use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::scope::guest_visibility;
use crate::db;
use crate::db::guests::{GuestFilter, GuestStatistics};
use crate::db::query::{Page, Paginated};
use crate::error::AppError;
use crate::extract::{Params, Payload};
use crate::middleware::audit;
use crate::models::{Guest, GuestStatus};
use crate::services::directory::{self, MemberFields, ProfileChanges};
use crate::services::guests::{self, GuestRegistration};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub status: Option<GuestStatus>,
    pub customer_email: Option<String>,
    pub customer_user_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct CreateGuest {
    #[serde(flatten)]
    pub member: MemberFields,
    pub customer_id: Uuid,
    pub status: Option<GuestStatus>,
}

#[derive(Deserialize)]
pub struct UpdateGuest {
    #[serde(flatten)]
    pub profile: ProfileChanges,
    pub status: Option<GuestStatus>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Params(params): Params<ListParams>,
) -> Result<Json<Paginated<Guest>>, AppError> {
    let page = Page::new(params.page, params.per_page);
    let filter = GuestFilter {
        status: params.status,
        customer_email: params.customer_email.map(|e| e.trim().to_lowercase()),
        customer_user_id: params.customer_user_id,
        search: params.search,
    };
    let (results, total) = guests::list(&state.pool, &auth, &filter, page).await?;
    Ok(Json(Paginated::new(results, total, page)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Guest>, AppError> {
    Ok(Json(find_visible(&state, &auth, id).await?))
}

/// Admin-only: place a guest under an explicitly named customer.
pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Payload(req): Payload<CreateGuest>,
) -> Result<Json<Guest>, AppError> {
    auth.require_admin()?;
    let member = req.member.into_member()?;

    let guest = directory::create_guest(
        &state.pool,
        &member,
        req.customer_id,
        req.status.unwrap_or_default(),
    )
    .await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "guest.created",
        "guest",
        Some(guest.id),
        Some(json!({ "customer_id": guest.customer_id })),
    )
    .await;

    Ok(Json(guest))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Payload(req): Payload<UpdateGuest>,
) -> Result<Json<Guest>, AppError> {
    let guest = find_visible(&state, &auth, id).await?;

    let mut tx = state.pool.begin().await?;
    directory::update_profile_in(&mut tx, guest.user_id, &req.profile).await?;
    if let Some(status) = req.status {
        db::guests::update_status(&mut *tx, id, status).await?;
    }
    tx.commit().await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "guest.updated",
        "guest",
        Some(id),
        None,
    )
    .await;

    Ok(Json(find_visible(&state, &auth, id).await?))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let guest = find_visible(&state, &auth, id).await?;

    directory::delete_user(&state.pool, guest.user_id).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "guest.deleted",
        "guest",
        Some(id),
        Some(json!({ "email": guest.email })),
    )
    .await;

    Ok(Json(json!({ "message": "Deleted" })))
}

pub async fn statistics(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<GuestStatistics>, AppError> {
    Ok(Json(guests::statistics(&state.pool, &auth).await?))
}

/// A customer registers a guest under their own account.
pub async fn register(
    auth: AuthUser,
    State(state): State<SharedState>,
    Payload(req): Payload<GuestRegistration>,
) -> Result<Json<Value>, AppError> {
    let guest = guests::register(&state.pool, &auth, req).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "guest.registered",
        "guest",
        Some(guest.id),
        Some(json!({ "customer_id": guest.customer_id })),
    )
    .await;

    Ok(Json(json!({
        "success": "Guest created successfully",
        "guest": guest,
    })))
}

async fn find_visible(state: &SharedState, auth: &AuthUser, id: Uuid) -> Result<Guest, AppError> {
    let owner = guest_visibility(&state.pool, auth).await?.owner();
    db::guests::find_by_id(&state.pool, id, owner)
        .await?
        .ok_or_else(|| AppError::NotFound("Guest not found".to_string()))
}
