use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "guest_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GuestStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Guest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_id: Uuid,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub status: GuestStatus,
    pub created_at: DateTime<Utc>,
}
