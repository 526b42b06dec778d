use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::query::{Page, Paginated};
use crate::db::users::UserFilter;
use crate::error::AppError;
use crate::extract::{Params, Payload};
use crate::middleware::audit;
use crate::models::User;
use crate::services::directory::{self, ProfileChanges};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateProfile {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Every caller, admins included, only ever sees their own user row here.
pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Params(params): Params<ListParams>,
) -> Result<Json<Paginated<User>>, AppError> {
    let page = Page::new(params.page, params.per_page);
    let filter = UserFilter {
        id: Some(auth.user_id),
        search: params.search,
        ..Default::default()
    };
    let (users, total) = db::users::list(&state.pool, &filter, page).await?;
    Ok(Json(Paginated::new(users, total, page)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    if id != auth.user_id {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    me(auth, State(state)).await
}

pub async fn me(auth: AuthUser, State(state): State<SharedState>) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Payload(req): Payload<UpdateProfile>,
) -> Result<Json<User>, AppError> {
    if id != auth.user_id {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    // Users cannot deactivate themselves here
    let changes = ProfileChanges {
        email: req.email,
        name: req.name,
        password: req.password,
        is_active: None,
    };
    let user = directory::update_profile(&state.pool, id, &changes).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "user.updated",
        "user",
        Some(id),
        None,
    )
    .await;

    Ok(Json(user))
}
