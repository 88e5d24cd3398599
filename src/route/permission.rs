use std::{collections::BTreeSet, sync::Arc};

use anyhow::Context;
use chrono::Local;
use poem::{web::Data, Request};
use poem_openapi::{param::Path, payload::Json, OpenApi, Tags};
use validator::Validate;

use crate::{
    core::{
        activity_log::{record, ActivityEntry},
        error::{conflict_or_unexpected, AppError},
        security::{authenticate, authorize, BearerAuthorization},
        utils::non_empty,
    },
    model::{
        permission::{Permission, PERMISSIONS_MANAGE, PERMISSIONS_VIEW},
        role::Role,
    },
    repository::{
        permission::{
            create_permission, delete_permission, get_all_permissions,
            get_existing_permission_ids, get_permission_by_id, update_permission,
        },
        role_permission::{get_permissions_by_role, get_roles_summary, replace_role_permissions},
    },
    schema::{
        common::{DataResponse, MessageResponse},
        permission::{
            CheckPermissionRequest, CheckPermissionResponses, CheckPermissionResult,
            GetAllPermissionResponses, PermissionCatalogue, PermissionCreateRequest,
            PermissionCreateResponses, PermissionDeleteResponses, PermissionDetail,
            PermissionUpdateRequest, PermissionUpdateResponses, RolePermissionResponses,
            RolePermissions, RoleSummaryDetail, RolesSummaryResponses,
            UpdateRolePermissionRequest,
        },
    },
    AppState,
};

const MODULE: &str = "permissions";

#[derive(Tags)]
enum ApiPermissionTags {
    Permission,
}

pub struct ApiPermission;

#[OpenApi]
impl ApiPermission {
    #[oai(
        path = "/permissions",
        method = "get",
        tag = "ApiPermissionTags::Permission"
    )]
    async fn get_all_permission_api(
        &self,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> GetAllPermissionResponses {
        match get_catalogue(&state, &auth).await {
            Ok(data) => GetAllPermissionResponses::Ok(Json(DataResponse::new(
                "Permissions retrieved successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(
        path = "/permissions",
        method = "post",
        tag = "ApiPermissionTags::Permission"
    )]
    async fn create_permission_api(
        &self,
        req: &Request,
        json: Json<PermissionCreateRequest>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> PermissionCreateResponses {
        match create(&state, &auth, req, json.0).await {
            Ok(data) => PermissionCreateResponses::Created(Json(DataResponse::new(
                "Permission created successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(
        path = "/permissions/:id",
        method = "put",
        tag = "ApiPermissionTags::Permission"
    )]
    async fn update_permission_api(
        &self,
        req: &Request,
        Path(id): Path<i64>,
        json: Json<PermissionUpdateRequest>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> PermissionUpdateResponses {
        match update(&state, &auth, req, id, json.0).await {
            Ok(data) => PermissionUpdateResponses::Ok(Json(DataResponse::new(
                "Permission updated successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(
        path = "/permissions/:id",
        method = "delete",
        tag = "ApiPermissionTags::Permission"
    )]
    async fn delete_permission_api(
        &self,
        req: &Request,
        Path(id): Path<i64>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> PermissionDeleteResponses {
        match delete(&state, &auth, req, id).await {
            Ok(()) => PermissionDeleteResponses::Ok(Json(MessageResponse::ok(
                "Permission deleted successfully",
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(
        path = "/permissions/role/:role",
        method = "get",
        tag = "ApiPermissionTags::Permission"
    )]
    async fn get_role_permission_api(
        &self,
        Path(role): Path<String>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> RolePermissionResponses {
        match get_role_permissions(&state, &auth, &role).await {
            Ok(data) => RolePermissionResponses::Ok(Json(DataResponse::new(
                "Role permissions retrieved successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(
        path = "/permissions/role/:role",
        method = "put",
        tag = "ApiPermissionTags::Permission"
    )]
    async fn update_role_permission_api(
        &self,
        req: &Request,
        Path(role): Path<String>,
        json: Json<UpdateRolePermissionRequest>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> RolePermissionResponses {
        match update_role_permissions(&state, &auth, req, &role, &json.permission_ids).await {
            Ok(data) => RolePermissionResponses::Ok(Json(DataResponse::new(
                "Role permissions updated successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(
        path = "/permissions/check",
        method = "post",
        tag = "ApiPermissionTags::Permission"
    )]
    async fn check_permission_api(
        &self,
        json: Json<CheckPermissionRequest>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> CheckPermissionResponses {
        match check(&state, &auth, &json.permission_name).await {
            Ok(data) => CheckPermissionResponses::Ok(Json(DataResponse::new(
                "Permission checked successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(
        path = "/permissions/roles/summary",
        method = "get",
        tag = "ApiPermissionTags::Permission"
    )]
    async fn get_roles_summary_api(
        &self,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> RolesSummaryResponses {
        match roles_summary(&state, &auth).await {
            Ok(data) => RolesSummaryResponses::Ok(Json(DataResponse::new(
                "Roles summary retrieved successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }
}

fn parse_role(role: &str) -> Result<Role, AppError> {
    role.parse::<Role>()
        .map_err(|err| AppError::validation("role", &err.to_string()))
}

async fn get_catalogue(
    state: &AppState,
    auth: &BearerAuthorization,
) -> Result<PermissionCatalogue, AppError> {
    authorize(state, auth, PERMISSIONS_VIEW).await?;
    let permissions = get_all_permissions(&state.db).await?;
    Ok(PermissionCatalogue::new(permissions))
}

async fn create(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    payload: PermissionCreateRequest,
) -> Result<PermissionDetail, AppError> {
    let user = authorize(state, auth, PERMISSIONS_MANAGE).await?;
    payload.validate()?;
    let now = Local::now().fixed_offset();
    let permission = Permission {
        id: 0,
        name: payload.name.trim().to_string(),
        display_name: payload.display_name.trim().to_string(),
        description: non_empty(payload.description),
        module: payload.module.trim().to_string(),
        created_date: Some(now),
        updated_date: Some(now),
    };
    let permission = create_permission(&state.db, &permission)
        .await
        .map_err(|err| conflict_or_unexpected(err, "Permission name already exists"))?;
    state.gate.invalidate();
    record(
        &state.db,
        ActivityEntry::new(
            &user,
            req,
            "CREATE",
            MODULE,
            format!("Created permission: {}", permission.name),
        ),
    )
    .await;
    Ok(permission.into())
}

async fn update(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    id: i64,
    payload: PermissionUpdateRequest,
) -> Result<PermissionDetail, AppError> {
    let user = authorize(state, auth, PERMISSIONS_MANAGE).await?;
    payload.validate()?;
    let existing = get_permission_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Permission not found".to_string()))?;
    let permission = Permission {
        name: payload
            .name
            .map(|val| val.trim().to_string())
            .unwrap_or(existing.name),
        display_name: payload
            .display_name
            .map(|val| val.trim().to_string())
            .unwrap_or(existing.display_name),
        description: match payload.description {
            Some(val) => non_empty(Some(val)),
            None => existing.description,
        },
        module: payload
            .module
            .map(|val| val.trim().to_string())
            .unwrap_or(existing.module),
        updated_date: Some(Local::now().fixed_offset()),
        ..existing
    };
    update_permission(&state.db, &permission)
        .await
        .map_err(|err| conflict_or_unexpected(err, "Permission name already exists"))?;
    state.gate.invalidate();
    record(
        &state.db,
        ActivityEntry::new(
            &user,
            req,
            "UPDATE",
            MODULE,
            format!("Updated permission: {}", permission.name),
        ),
    )
    .await;
    Ok(permission.into())
}

async fn delete(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    id: i64,
) -> Result<(), AppError> {
    let user = authorize(state, auth, PERMISSIONS_MANAGE).await?;
    let existing = get_permission_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Permission not found".to_string()))?;
    delete_permission(&state.db, id).await?;
    state.gate.invalidate();
    record(
        &state.db,
        ActivityEntry::new(
            &user,
            req,
            "DELETE",
            MODULE,
            format!("Deleted permission: {}", existing.name),
        ),
    )
    .await;
    Ok(())
}

async fn role_permissions(state: &AppState, role: Role) -> anyhow::Result<RolePermissions> {
    // super_admin holds every permission without explicit grants
    let permissions = if role.is_super_admin() {
        get_all_permissions(&state.db).await?
    } else {
        get_permissions_by_role(&state.db, role).await?
    };
    Ok(RolePermissions {
        role: role.to_string(),
        permissions: permissions.into_iter().map(PermissionDetail::from).collect(),
    })
}

async fn get_role_permissions(
    state: &AppState,
    auth: &BearerAuthorization,
    role: &str,
) -> Result<RolePermissions, AppError> {
    authorize(state, auth, PERMISSIONS_VIEW).await?;
    let role = parse_role(role)?;
    Ok(role_permissions(state, role).await?)
}

/// Replace every grant of `role` with `permission_ids` in one transaction,
/// then drop all cached decisions.
async fn update_role_permissions(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    role: &str,
    permission_ids: &[i64],
) -> Result<RolePermissions, AppError> {
    let user = authorize(state, auth, PERMISSIONS_MANAGE).await?;
    let role = parse_role(role)?;
    if role.is_super_admin() {
        return Err(AppError::validation(
            "role",
            "Cannot modify super admin permissions",
        ));
    }
    let requested: Vec<i64> = permission_ids
        .iter()
        .copied()
        .collect::<BTreeSet<i64>>()
        .into_iter()
        .collect();
    let existing: BTreeSet<i64> = get_existing_permission_ids(&state.db, &requested)
        .await?
        .into_iter()
        .collect();
    let unknown: Vec<String> = requested
        .iter()
        .filter(|id| !existing.contains(id))
        .map(|id| id.to_string())
        .collect();
    if !unknown.is_empty() {
        return Err(AppError::validation(
            "permission_ids",
            &format!("Unknown permission ids: {}", unknown.join(", ")),
        ));
    }

    let mut tx = state.db.begin().await.context("begin transaction")?;
    replace_role_permissions(&mut tx, role, &requested).await?;
    tx.commit().await.context("commit role permissions")?;
    state.gate.invalidate();

    record(
        &state.db,
        ActivityEntry::new(
            &user,
            req,
            "UPDATE",
            MODULE,
            format!("Updated permissions for role: {}", role),
        ),
    )
    .await;
    Ok(role_permissions(state, role).await?)
}

async fn check(
    state: &AppState,
    auth: &BearerAuthorization,
    permission_name: &str,
) -> Result<CheckPermissionResult, AppError> {
    let user = authenticate(state, auth).await?;
    let permission_name = permission_name.trim();
    if permission_name.is_empty() {
        return Err(AppError::validation(
            "permission_name",
            "permission_name is required",
        ));
    }
    let has_permission = state.gate.check(user.role, permission_name).await?;
    Ok(CheckPermissionResult {
        permission: permission_name.to_string(),
        has_permission,
    })
}

async fn roles_summary(
    state: &AppState,
    auth: &BearerAuthorization,
) -> Result<Vec<RoleSummaryDetail>, AppError> {
    authorize(state, auth, PERMISSIONS_VIEW).await?;
    let summary = get_roles_summary(&state.db).await?;
    Ok(summary.into_iter().map(RoleSummaryDetail::from).collect())
}
