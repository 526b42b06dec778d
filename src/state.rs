use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::identity::IdentityProvider;
use crate::rate_limit::LoginRateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub identity: Arc<dyn IdentityProvider>,
    pub login_limiter: LoginRateLimiter,
}
