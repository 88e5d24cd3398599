use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use sqlx::prelude::FromRow;

pub const TABLE_NAME: &str = "public.menus";

#[derive(Clone, Debug, PartialEq, Deserialize, FromRow)]
pub struct Menu {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub display_name: String,
    pub icon: Option<String>,
    pub url: Option<String>,
    pub order_no: i32,
    pub is_active: bool,
    pub created_date: Option<DateTime<FixedOffset>>,
    pub updated_date: Option<DateTime<FixedOffset>>,
}

/// Row of the admin listing: the menu plus its parent's display name and
/// the number of direct children.
#[derive(Clone, Debug, FromRow)]
pub struct MenuWithRelations {
    #[sqlx(flatten)]
    pub menu: Menu,
    pub parent_name: Option<String>,
    pub children_count: i64,
}
