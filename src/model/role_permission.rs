use serde::Deserialize;
use sqlx::prelude::FromRow;

use super::role::Role;

pub const TABLE_NAME: &str = "public.role_permissions";

#[derive(Clone, Debug, Deserialize, FromRow)]
pub struct RolePermission {
    pub role: Role,
    pub permission_id: i64,
}

/// Grants aggregated per role, with the number of active users holding it.
#[derive(Clone, Debug, FromRow)]
pub struct RoleSummary {
    pub role: Role,
    pub total_permissions: i64,
    pub modules: Vec<String>,
    pub user_count: i64,
}
