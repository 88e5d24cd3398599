use serde::Deserialize;
use sqlx::prelude::FromRow;

use super::role::Role;

pub const TABLE_NAME: &str = "public.menu_permissions";

#[derive(Clone, Debug, Deserialize, FromRow)]
pub struct MenuPermission {
    pub menu_id: i64,
    pub role: Role,
}
