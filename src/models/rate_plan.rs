use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct RatePlan {
    pub id: Uuid,
    pub plan: String,
    pub price: Decimal,
    pub vm_limit: i32,
    pub backup_limit: i32,
    pub created_at: DateTime<Utc>,
}
