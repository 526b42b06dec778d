use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::query::{Page, Paginated};
use crate::error::AppError;
use crate::extract::Params;
use crate::models::AuditEvent;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub resource_type: Option<String>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Params(params): Params<ListParams>,
) -> Result<Json<Paginated<AuditEvent>>, AppError> {
    auth.require_admin()?;
    let page = Page::new(params.page, params.per_page);
    let (events, total) =
        db::audit::list(&state.pool, params.resource_type.as_deref(), page).await?;
    Ok(Json(Paginated::new(events, total, page)))
}
