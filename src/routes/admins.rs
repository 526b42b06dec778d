use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::query::{Page, Paginated};
use crate::error::AppError;
use crate::extract::{Params, Payload};
use crate::middleware::audit;
use crate::models::GeneralAdmin;
use crate::services::directory::{self, MemberFields, ProfileChanges};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Params(params): Params<ListParams>,
) -> Result<Json<Paginated<GeneralAdmin>>, AppError> {
    auth.require_admin()?;
    let page = Page::new(params.page, params.per_page);
    let (admins, total) =
        db::general_admins::list(&state.pool, params.search.as_deref(), page).await?;
    Ok(Json(Paginated::new(admins, total, page)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GeneralAdmin>, AppError> {
    auth.require_admin()?;
    Ok(Json(find(&state, id).await?))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Payload(req): Payload<MemberFields>,
) -> Result<Json<GeneralAdmin>, AppError> {
    auth.require_admin()?;
    let member = req.into_member()?;

    let admin = directory::create_admin(&state.pool, &member).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "admin.created",
        "general_admin",
        Some(admin.id),
        Some(serde_json::json!({ "email": admin.email })),
    )
    .await;

    Ok(Json(admin))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Payload(req): Payload<ProfileChanges>,
) -> Result<Json<GeneralAdmin>, AppError> {
    auth.require_admin()?;
    let admin = find(&state, id).await?;

    directory::update_profile(&state.pool, admin.user_id, &req).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "admin.updated",
        "general_admin",
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
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;
    let admin = find(&state, id).await?;

    if admin.user_id == auth.user_id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    directory::delete_user(&state.pool, admin.user_id).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "admin.deleted",
        "general_admin",
        Some(id),
        Some(serde_json::json!({ "email": admin.email })),
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}

async fn find(state: &SharedState, id: Uuid) -> Result<GeneralAdmin, AppError> {
    db::general_admins::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))
}
