use axum::extract::State;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::session::{self, AuthResponse};
use crate::error::AppError;
use crate::extract::Payload;
use crate::middleware::audit;
use crate::services::federation;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct SocialLoginRequest {
    pub token: Option<String>,
}

pub async fn google(
    State(state): State<SharedState>,
    Payload(req): Payload<SocialLoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let user =
        federation::sign_in(&state.pool, state.identity.as_ref(), req.token.as_deref()).await?;

    audit::log_event(
        &state.pool,
        Some(user.id),
        "user.social_login",
        "user",
        Some(user.id),
        Some(serde_json::json!({ "provider": "google" })),
    )
    .await;

    let (jar, body) = session::issue(&state, user).await?;
    Ok((jar, Json(body)))
}
