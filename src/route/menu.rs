use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use poem::{web::Data, Request};
use poem_openapi::{param::Path, payload::Json, types::MaybeUndefined, OpenApi, Tags};
use validator::Validate;

use crate::{
    core::{
        activity_log::{record, ActivityEntry},
        error::{conflict_or_unexpected, AppError},
        menu_tree::build_tree,
        security::{authenticate, authorize, BearerAuthorization},
        utils::non_empty,
    },
    model::{menu::Menu, permission::MENUS_MANAGE, role::Role},
    repository::{
        menu::{
            count_children, create_menu, delete_menu, get_all_menus_with_relations,
            get_menu_by_id, get_menus_for_role, is_descendant_or_self, lock_menu_by_id,
            name_taken, reorder_menus, update_menu,
        },
        menu_permission::{get_roles_by_menu, replace_menu_roles},
    },
    schema::{
        common::{DataResponse, MessageResponse},
        menu::{
            GetAllMenuResponses, MenuAdminDetail, MenuCreateRequest, MenuCreateResponses,
            MenuDeleteResponses, MenuDetail, MenuDetailResponses, MenuReorderRequest,
            MenuReorderResponses, MenuTreeItem, MenuUpdateRequest, MenuUpdateResponses,
            MenuWithRoles, UserMenuResponses, UserMenus,
        },
    },
    AppState,
};

const MODULE: &str = "menus";

#[derive(Tags)]
enum ApiMenuTags {
    Menu,
}

pub struct ApiMenu;

#[OpenApi]
impl ApiMenu {
    #[oai(path = "/menus", method = "get", tag = "ApiMenuTags::Menu")]
    async fn get_user_menu_api(
        &self,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> UserMenuResponses {
        match user_menus(&state, &auth).await {
            Ok(data) => UserMenuResponses::Ok(Json(DataResponse::new(
                "Menus retrieved successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/menus/all", method = "get", tag = "ApiMenuTags::Menu")]
    async fn get_all_menu_api(
        &self,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> GetAllMenuResponses {
        match all_menus(&state, &auth).await {
            Ok(data) => GetAllMenuResponses::Ok(Json(DataResponse::new(
                "Menus retrieved successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/menus/:id", method = "get", tag = "ApiMenuTags::Menu")]
    async fn get_detail_menu_api(
        &self,
        Path(id): Path<i64>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> MenuDetailResponses {
        match menu_detail(&state, &auth, id).await {
            Ok(data) => MenuDetailResponses::Ok(Json(DataResponse::new(
                "Menu retrieved successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/menus", method = "post", tag = "ApiMenuTags::Menu")]
    async fn create_menu_api(
        &self,
        req: &Request,
        json: Json<MenuCreateRequest>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> MenuCreateResponses {
        match create(&state, &auth, req, json.0).await {
            Ok(data) => MenuCreateResponses::Created(Json(DataResponse::new(
                "Menu created successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/menus/reorder", method = "put", tag = "ApiMenuTags::Menu")]
    async fn reorder_menu_api(
        &self,
        req: &Request,
        json: Json<MenuReorderRequest>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> MenuReorderResponses {
        match reorder(&state, &auth, req, &json).await {
            Ok(()) => MenuReorderResponses::Ok(Json(MessageResponse::ok(
                "Menus reordered successfully",
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/menus/:id", method = "put", tag = "ApiMenuTags::Menu")]
    async fn update_menu_api(
        &self,
        req: &Request,
        Path(id): Path<i64>,
        json: Json<MenuUpdateRequest>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> MenuUpdateResponses {
        match update(&state, &auth, req, id, json.0).await {
            Ok(data) => MenuUpdateResponses::Ok(Json(DataResponse::new(
                "Menu updated successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/menus/:id", method = "delete", tag = "ApiMenuTags::Menu")]
    async fn delete_menu_api(
        &self,
        req: &Request,
        Path(id): Path<i64>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> MenuDeleteResponses {
        match delete(&state, &auth, req, id).await {
            Ok(()) => MenuDeleteResponses::Ok(Json(MessageResponse::ok(
                "Menu deleted successfully",
            ))),
            Err(err) => err.into(),
        }
    }
}

/// Parse and deduplicate role names, keeping the first occurrence.
fn parse_roles(roles: &[String]) -> Result<Vec<Role>, AppError> {
    let mut parsed: Vec<Role> = vec![];
    for role in roles {
        let role = role
            .trim()
            .parse::<Role>()
            .map_err(|err| AppError::validation("roles", &err.to_string()))?;
        if !parsed.contains(&role) {
            parsed.push(role);
        }
    }
    Ok(parsed)
}

async fn ensure_parent_exists(state: &AppState, parent_id: i64) -> Result<(), AppError> {
    if get_menu_by_id(&state.db, parent_id).await?.is_none() {
        return Err(AppError::validation("parent_id", "Parent menu not found"));
    }
    Ok(())
}

async fn user_menus(state: &AppState, auth: &BearerAuthorization) -> Result<UserMenus, AppError> {
    let user = authenticate(state, auth).await?;
    let menus = get_menus_for_role(&state.db, user.role).await?;
    let tree = build_tree(&menus);
    Ok(UserMenus {
        menus: tree.into_iter().map(MenuTreeItem::from).collect(),
        flat: menus.into_iter().map(MenuDetail::from).collect(),
    })
}

async fn all_menus(
    state: &AppState,
    auth: &BearerAuthorization,
) -> Result<Vec<MenuAdminDetail>, AppError> {
    authorize(state, auth, MENUS_MANAGE).await?;
    let menus = get_all_menus_with_relations(&state.db).await?;
    Ok(menus.into_iter().map(MenuAdminDetail::from).collect())
}

async fn menu_detail(
    state: &AppState,
    auth: &BearerAuthorization,
    id: i64,
) -> Result<MenuWithRoles, AppError> {
    authorize(state, auth, MENUS_MANAGE).await?;
    let menu = get_menu_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Menu not found".to_string()))?;
    let roles = get_roles_by_menu(&state.db, id).await?;
    Ok(MenuWithRoles {
        menu: menu.into(),
        roles: roles.iter().map(|role| role.to_string()).collect(),
    })
}

async fn create(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    payload: MenuCreateRequest,
) -> Result<MenuDetail, AppError> {
    let user = authorize(state, auth, MENUS_MANAGE).await?;
    payload.validate()?;
    let roles = parse_roles(payload.roles.as_deref().unwrap_or_default())?;
    let name = payload.name.trim().to_string();
    if name_taken(&state.db, &name, None).await? {
        return Err(AppError::Conflict("Menu name already exists".to_string()));
    }
    if let Some(parent_id) = payload.parent_id {
        ensure_parent_exists(state, parent_id).await?;
    }

    let now = Local::now().fixed_offset();
    let menu = Menu {
        id: 0,
        parent_id: payload.parent_id,
        name,
        display_name: payload.display_name.trim().to_string(),
        icon: non_empty(payload.icon),
        url: non_empty(payload.url),
        order_no: payload.order_no.unwrap_or(0),
        is_active: payload.is_active.unwrap_or(true),
        created_date: Some(now),
        updated_date: Some(now),
    };
    let mut tx = state.db.begin().await.context("begin transaction")?;
    let menu = create_menu(&mut tx, &menu)
        .await
        .map_err(|err| conflict_or_unexpected(err, "Menu name already exists"))?;
    replace_menu_roles(&mut tx, menu.id, &roles).await?;
    tx.commit().await.context("commit menu")?;

    record(
        &state.db,
        ActivityEntry::new(
            &user,
            req,
            "CREATE",
            MODULE,
            format!("Created menu: {}", menu.display_name),
        ),
    )
    .await;
    Ok(menu.into())
}

async fn update(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    id: i64,
    payload: MenuUpdateRequest,
) -> Result<MenuDetail, AppError> {
    let user = authorize(state, auth, MENUS_MANAGE).await?;
    payload.validate()?;
    let existing = get_menu_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Menu not found".to_string()))?;
    let roles = match &payload.roles {
        Some(roles) => Some(parse_roles(roles)?),
        None => None,
    };

    let parent_id = match payload.parent_id {
        MaybeUndefined::Undefined => existing.parent_id,
        MaybeUndefined::Null => None,
        MaybeUndefined::Value(parent_id) => {
            if parent_id == id {
                return Err(AppError::validation(
                    "parent_id",
                    "Menu cannot be its own parent",
                ));
            }
            ensure_parent_exists(state, parent_id).await?;
            if is_descendant_or_self(&state.db, id, parent_id).await? {
                return Err(AppError::validation(
                    "parent_id",
                    "Menu cannot be moved under one of its own submenus",
                ));
            }
            Some(parent_id)
        }
    };
    let name = match payload.name {
        Some(name) => {
            let name = name.trim().to_string();
            if name_taken(&state.db, &name, Some(id)).await? {
                return Err(AppError::Conflict("Menu name already exists".to_string()));
            }
            name
        }
        None => existing.name.clone(),
    };
    let optional = |value: MaybeUndefined<String>, current: Option<String>| match value {
        MaybeUndefined::Undefined => current,
        MaybeUndefined::Null => None,
        MaybeUndefined::Value(val) => non_empty(Some(val)),
    };

    let menu = Menu {
        parent_id,
        name,
        display_name: payload
            .display_name
            .map(|val| val.trim().to_string())
            .unwrap_or(existing.display_name.clone()),
        icon: optional(payload.icon, existing.icon.clone()),
        url: optional(payload.url, existing.url.clone()),
        order_no: payload.order_no.unwrap_or(existing.order_no),
        is_active: payload.is_active.unwrap_or(existing.is_active),
        updated_date: Some(Local::now().fixed_offset()),
        ..existing
    };
    let mut tx = state.db.begin().await.context("begin transaction")?;
    let menu = update_menu(&mut tx, &menu)
        .await
        .map_err(|err| conflict_or_unexpected(err, "Menu name already exists"))?;
    if let Some(roles) = roles {
        replace_menu_roles(&mut tx, id, &roles).await?;
    }
    tx.commit().await.context("commit menu")?;

    record(
        &state.db,
        ActivityEntry::new(
            &user,
            req,
            "UPDATE",
            MODULE,
            format!("Updated menu: {}", menu.display_name),
        ),
    )
    .await;
    Ok(menu.into())
}

async fn delete(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    id: i64,
) -> Result<(), AppError> {
    let user = authorize(state, auth, MENUS_MANAGE).await?;
    let mut tx = state.db.begin().await.context("begin transaction")?;
    let existing = lock_menu_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Menu not found".to_string()))?;
    if count_children(&mut *tx, id).await? > 0 {
        return Err(AppError::InvalidRelationship(
            "Cannot delete menu with submenus. Delete submenus first.".to_string(),
        ));
    }
    delete_menu(&mut *tx, id).await?;
    tx.commit().await.context("commit menu delete")?;

    record(
        &state.db,
        ActivityEntry::new(
            &user,
            req,
            "DELETE",
            MODULE,
            format!("Deleted menu: {}", existing.display_name),
        ),
    )
    .await;
    Ok(())
}

async fn reorder(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    payload: &MenuReorderRequest,
) -> Result<(), AppError> {
    let user = authorize(state, auth, MENUS_MANAGE).await?;
    if payload.menus.is_empty() {
        return Err(AppError::validation("menus", "Invalid menus data"));
    }
    let orders: Vec<(i64, i32)> = payload
        .menus
        .iter()
        .map(|item| (item.id, item.order_no))
        .collect();
    let mut tx = state.db.begin().await.context("begin transaction")?;
    reorder_menus(&mut tx, &orders).await?;
    tx.commit().await.context("commit menu order")?;

    record(
        &state.db,
        ActivityEntry::new(&user, req, "UPDATE", MODULE, "Reordered menus".to_string()),
    )
    .await;
    Ok(())
}
