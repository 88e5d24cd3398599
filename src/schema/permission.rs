use once_cell::sync::Lazy;
use poem_openapi::{payload::Json, Object};
use regex::Regex;
use serde::Deserialize;
use validator::Validate;

use crate::{
    core::utils::datetime_to_string_opt,
    model::{permission::Permission, role_permission::RoleSummary},
    schema::common::{api_responses, DataResponse, MessageResponse},
};

static PERMISSION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_]+\.[a-z_]+$").expect("valid permission name pattern"));

#[derive(Object, Deserialize)]
pub struct PermissionDetail {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub module: String,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
}

impl From<Permission> for PermissionDetail {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
            display_name: permission.display_name,
            description: permission.description,
            module: permission.module,
            created_date: datetime_to_string_opt(permission.created_date),
            updated_date: datetime_to_string_opt(permission.updated_date),
        }
    }
}

#[derive(Object, Deserialize)]
pub struct PermissionModuleGroup {
    pub module: String,
    pub permissions: Vec<PermissionDetail>,
}

#[derive(Object, Deserialize)]
pub struct PermissionCatalogue {
    pub all: Vec<PermissionDetail>,
    pub grouped: Vec<PermissionModuleGroup>,
}

impl PermissionCatalogue {
    /// `permissions` must already be ordered by module.
    pub fn new(permissions: Vec<Permission>) -> Self {
        let mut grouped: Vec<PermissionModuleGroup> = vec![];
        for permission in permissions.iter().cloned() {
            match grouped.last_mut() {
                Some(group) if group.module == permission.module => {
                    group.permissions.push(permission.into())
                }
                _ => grouped.push(PermissionModuleGroup {
                    module: permission.module.clone(),
                    permissions: vec![permission.into()],
                }),
            }
        }
        Self {
            all: permissions.into_iter().map(PermissionDetail::from).collect(),
            grouped,
        }
    }
}

api_responses! {
    pub enum GetAllPermissionResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<PermissionCatalogue>>),
    }
}

#[derive(Object, Deserialize, Validate)]
pub struct PermissionCreateRequest {
    #[validate(
        length(min = 3, max = 100, message = "Name must be between 3 and 100 characters"),
        regex(
            path = *PERMISSION_NAME_RE,
            message = "Name must look like module.action"
        )
    )]
    pub name: String,
    #[validate(length(min = 3, max = 100, message = "Display name must be between 3 and 100 characters"))]
    pub display_name: String,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Module must be between 2 and 50 characters"))]
    pub module: String,
}

#[derive(Object, Deserialize, Validate)]
pub struct PermissionUpdateRequest {
    #[validate(
        length(min = 3, max = 100, message = "Name must be between 3 and 100 characters"),
        regex(
            path = *PERMISSION_NAME_RE,
            message = "Name must look like module.action"
        )
    )]
    pub name: Option<String>,
    #[validate(length(min = 3, max = 100, message = "Display name must be between 3 and 100 characters"))]
    pub display_name: Option<String>,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Module must be between 2 and 50 characters"))]
    pub module: Option<String>,
}

api_responses! {
    pub enum PermissionCreateResponses {
        #[oai(status = 201)]
        Created(Json<DataResponse<PermissionDetail>>),
    }
}

api_responses! {
    pub enum PermissionUpdateResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<PermissionDetail>>),
    }
}

api_responses! {
    pub enum PermissionDeleteResponses {
        #[oai(status = 200)]
        Ok(Json<MessageResponse>),
    }
}

#[derive(Object, Deserialize)]
pub struct RolePermissions {
    pub role: String,
    pub permissions: Vec<PermissionDetail>,
}

api_responses! {
    pub enum RolePermissionResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<RolePermissions>>),
    }
}

#[derive(Object, Deserialize)]
pub struct UpdateRolePermissionRequest {
    pub permission_ids: Vec<i64>,
}

#[derive(Object, Deserialize)]
pub struct CheckPermissionRequest {
    pub permission_name: String,
}

#[derive(Object, Deserialize)]
pub struct CheckPermissionResult {
    pub permission: String,
    pub has_permission: bool,
}

api_responses! {
    pub enum CheckPermissionResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<CheckPermissionResult>>),
    }
}

#[derive(Object, Deserialize)]
pub struct RoleSummaryDetail {
    pub role: String,
    pub total_permissions: i64,
    pub modules: Vec<String>,
    pub user_count: i64,
}

impl From<RoleSummary> for RoleSummaryDetail {
    fn from(summary: RoleSummary) -> Self {
        Self {
            role: summary.role.to_string(),
            total_permissions: summary.total_permissions,
            modules: summary.modules,
            user_count: summary.user_count,
        }
    }
}

api_responses! {
    pub enum RolesSummaryResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<Vec<RoleSummaryDetail>>>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(id: i64, name: &str, module: &str) -> Permission {
        Permission {
            id,
            name: name.to_string(),
            display_name: name.to_string(),
            description: None,
            module: module.to_string(),
            created_date: None,
            updated_date: None,
        }
    }

    #[test]
    fn test_catalogue_groups_by_module() {
        let catalogue = PermissionCatalogue::new(vec![
            permission(1, "employees.create", "employees"),
            permission(2, "employees.view", "employees"),
            permission(3, "menus.manage", "menus"),
        ]);
        assert_eq!(catalogue.all.len(), 3);
        assert_eq!(catalogue.grouped.len(), 2);
        assert_eq!(catalogue.grouped[0].module, "employees");
        assert_eq!(catalogue.grouped[0].permissions.len(), 2);
        assert_eq!(catalogue.grouped[1].permissions[0].name, "menus.manage");
    }

    #[test]
    fn test_permission_name_pattern() {
        let req = PermissionCreateRequest {
            name: "reports.export".to_string(),
            display_name: "Export Reports".to_string(),
            description: None,
            module: "reports".to_string(),
        };
        assert!(req.validate().is_ok());
        let req = PermissionCreateRequest {
            name: "Reports Export".to_string(),
            ..req
        };
        assert!(req.validate().is_err());
    }
}
