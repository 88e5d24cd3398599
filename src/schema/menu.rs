use poem_openapi::{payload::Json, types::MaybeUndefined, Object};
use serde::Deserialize;
use validator::Validate;

use crate::{
    core::{menu_tree::MenuNode, utils::datetime_to_string_opt},
    model::menu::{Menu, MenuWithRelations},
    schema::common::{api_responses, DataResponse, MessageResponse},
};

#[derive(Object, Deserialize)]
pub struct MenuDetail {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub display_name: String,
    pub icon: Option<String>,
    pub url: Option<String>,
    pub order_no: i32,
    pub is_active: bool,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
}

impl From<Menu> for MenuDetail {
    fn from(menu: Menu) -> Self {
        Self {
            id: menu.id,
            parent_id: menu.parent_id,
            name: menu.name,
            display_name: menu.display_name,
            icon: menu.icon,
            url: menu.url,
            order_no: menu.order_no,
            is_active: menu.is_active,
            created_date: datetime_to_string_opt(menu.created_date),
            updated_date: datetime_to_string_opt(menu.updated_date),
        }
    }
}

#[derive(Object, Deserialize)]
pub struct MenuTreeItem {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub display_name: String,
    pub icon: Option<String>,
    pub url: Option<String>,
    pub order_no: i32,
    pub children: Vec<MenuTreeItem>,
}

impl From<MenuNode> for MenuTreeItem {
    fn from(node: MenuNode) -> Self {
        Self {
            id: node.menu.id,
            parent_id: node.menu.parent_id,
            name: node.menu.name,
            display_name: node.menu.display_name,
            icon: node.menu.icon,
            url: node.menu.url,
            order_no: node.menu.order_no,
            children: node.children.into_iter().map(MenuTreeItem::from).collect(),
        }
    }
}

#[derive(Object, Deserialize)]
pub struct UserMenus {
    pub menus: Vec<MenuTreeItem>,
    pub flat: Vec<MenuDetail>,
}

api_responses! {
    pub enum UserMenuResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<UserMenus>>),
    }
}

#[derive(Object)]
pub struct MenuAdminDetail {
    #[oai(flatten)]
    pub menu: MenuDetail,
    pub parent_name: Option<String>,
    pub children_count: i64,
}

impl From<MenuWithRelations> for MenuAdminDetail {
    fn from(row: MenuWithRelations) -> Self {
        Self {
            menu: row.menu.into(),
            parent_name: row.parent_name,
            children_count: row.children_count,
        }
    }
}

api_responses! {
    pub enum GetAllMenuResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<Vec<MenuAdminDetail>>>),
    }
}

#[derive(Object)]
pub struct MenuWithRoles {
    #[oai(flatten)]
    pub menu: MenuDetail,
    pub roles: Vec<String>,
}

api_responses! {
    pub enum MenuDetailResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<MenuWithRoles>>),
    }
}

#[derive(Object, Validate)]
pub struct MenuCreateRequest {
    pub parent_id: Option<i64>,
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Display name must be between 1 and 100 characters"))]
    pub display_name: String,
    pub icon: Option<String>,
    pub url: Option<String>,
    pub order_no: Option<i32>,
    pub is_active: Option<bool>,
    /// Roles the menu is shown to.
    pub roles: Option<Vec<String>>,
}

/// Absent fields are left untouched. `parent_id`, `icon` and `url` may be
/// sent as null to clear them. `roles`, when present, replaces the current
/// set.
#[derive(Object, Validate)]
pub struct MenuUpdateRequest {
    pub parent_id: MaybeUndefined<i64>,
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Display name must be between 1 and 100 characters"))]
    pub display_name: Option<String>,
    pub icon: MaybeUndefined<String>,
    pub url: MaybeUndefined<String>,
    pub order_no: Option<i32>,
    pub is_active: Option<bool>,
    pub roles: Option<Vec<String>>,
}

api_responses! {
    pub enum MenuCreateResponses {
        #[oai(status = 201)]
        Created(Json<DataResponse<MenuDetail>>),
    }
}

api_responses! {
    pub enum MenuUpdateResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<MenuDetail>>),
    }
}

api_responses! {
    pub enum MenuDeleteResponses {
        #[oai(status = 200)]
        Ok(Json<MessageResponse>),
    }
}

#[derive(Object, Deserialize)]
pub struct MenuOrder {
    pub id: i64,
    pub order_no: i32,
}

#[derive(Object, Deserialize)]
pub struct MenuReorderRequest {
    pub menus: Vec<MenuOrder>,
}

api_responses! {
    pub enum MenuReorderResponses {
        #[oai(status = 200)]
        Ok(Json<MessageResponse>),
    }
}
