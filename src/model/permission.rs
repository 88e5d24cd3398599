use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use sqlx::prelude::FromRow;

pub const TABLE_NAME: &str = "public.permissions";

#[derive(Clone, Debug, Deserialize, FromRow)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub module: String,
    pub created_date: Option<DateTime<FixedOffset>>,
    pub updated_date: Option<DateTime<FixedOffset>>,
}

pub const EMPLOYEES_VIEW: &str = "employees.view";
pub const EMPLOYEES_CREATE: &str = "employees.create";
pub const EMPLOYEES_EDIT: &str = "employees.edit";
pub const EMPLOYEES_DELETE: &str = "employees.delete";
pub const USERS_VIEW: &str = "users.view";
pub const USERS_CREATE: &str = "users.create";
pub const USERS_EDIT: &str = "users.edit";
pub const USERS_DELETE: &str = "users.delete";
pub const PERMISSIONS_VIEW: &str = "permissions.view";
pub const PERMISSIONS_MANAGE: &str = "permissions.manage";
pub const MENUS_MANAGE: &str = "menus.manage";
