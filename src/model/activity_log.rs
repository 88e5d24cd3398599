use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

pub const TABLE_NAME: &str = "public.activity_logs";

#[derive(Clone, Debug, Deserialize, FromRow)]
pub struct ActivityLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub module: String,
    pub description: String,
    pub ip_address: Option<String>,
    pub created_date: DateTime<FixedOffset>,
}
