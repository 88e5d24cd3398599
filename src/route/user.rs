use std::sync::Arc;

use chrono::Local;
use poem::{web::Data, Request};
use poem_openapi::{
    param::{Path, Query},
    payload::Json,
    OpenApi, Tags,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::{
        activity_log::{record, ActivityEntry},
        error::{conflict_or_unexpected, AppError},
        security::{authorize, hash_password, BearerAuthorization},
        sqlx_utils::{PageRequest, SortField, SortOrder},
        utils::{non_empty, parse_uuid},
    },
    model::{
        permission::{USERS_CREATE, USERS_DELETE, USERS_EDIT, USERS_VIEW},
        role::Role,
        user::User,
    },
    repository::user::{
        create_user, delete_user, find_taken_identity, get_all_users, get_user_by_id,
        update_user, UserFilter, UserSortField,
    },
    schema::{
        common::{DataResponse, MessageResponse, PaginateResponse, Pagination},
        user::{
            GetPaginateUserResponses, UserCreateRequest, UserCreateResponses,
            UserDeleteResponses, UserDetail, UserDetailResponses, UserUpdateRequest,
            UserUpdateResponses,
        },
    },
    AppState,
};

const MODULE: &str = "users";

#[derive(Tags)]
enum ApiUserTags {
    User,
}

pub struct ApiUser;

#[OpenApi]
impl ApiUser {
    #[allow(clippy::too_many_arguments)]
    #[oai(path = "/users", method = "get", tag = "ApiUserTags::User")]
    async fn get_paginate_user_api(
        &self,
        Query(page): Query<Option<u32>>,
        Query(limit): Query<Option<u32>>,
        Query(search): Query<Option<String>>,
        Query(role): Query<Option<String>>,
        Query(is_active): Query<Option<bool>>,
        Query(sort_by): Query<Option<String>>,
        Query(sort_order): Query<Option<String>>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> GetPaginateUserResponses {
        let query = UserListQuery {
            page: PageRequest::new(page, limit),
            search,
            role,
            is_active,
            sort: UserSortField::from_param(sort_by.as_deref()),
            order: SortOrder::from_param(sort_order.as_deref()),
        };
        match list(&state, &auth, query).await {
            Ok((data, pagination)) => GetPaginateUserResponses::Ok(Json(PaginateResponse::new(
                "Users retrieved successfully",
                data,
                pagination,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/users/:id", method = "get", tag = "ApiUserTags::User")]
    async fn get_detail_user_api(
        &self,
        Path(id): Path<String>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> UserDetailResponses {
        match detail(&state, &auth, &id).await {
            Ok(data) => UserDetailResponses::Ok(Json(DataResponse::new(
                "User retrieved successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/users", method = "post", tag = "ApiUserTags::User")]
    async fn create_user_api(
        &self,
        req: &Request,
        json: Json<UserCreateRequest>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> UserCreateResponses {
        match create(&state, &auth, req, json.0).await {
            Ok(data) => UserCreateResponses::Created(Json(DataResponse::new(
                "User created successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/users/:id", method = "put", tag = "ApiUserTags::User")]
    async fn update_user_api(
        &self,
        req: &Request,
        Path(id): Path<String>,
        json: Json<UserUpdateRequest>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> UserUpdateResponses {
        match update(&state, &auth, req, &id, json.0).await {
            Ok(data) => UserUpdateResponses::Ok(Json(DataResponse::new(
                "User updated successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/users/:id", method = "delete", tag = "ApiUserTags::User")]
    async fn delete_user_api(
        &self,
        req: &Request,
        Path(id): Path<String>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> UserDeleteResponses {
        match delete(&state, &auth, req, &id).await {
            Ok(()) => UserDeleteResponses::Ok(Json(MessageResponse::ok(
                "User deleted successfully",
            ))),
            Err(err) => err.into(),
        }
    }
}

struct UserListQuery {
    page: PageRequest,
    search: Option<String>,
    role: Option<String>,
    is_active: Option<bool>,
    sort: UserSortField,
    order: SortOrder,
}

fn parse_role(role: &str) -> Result<Role, AppError> {
    role.trim()
        .parse::<Role>()
        .map_err(|err| AppError::validation("role", &err.to_string()))
}

/// Only a super admin may create, change or remove super admin accounts.
fn guard_super_admin(caller: &User, roles: &[Role]) -> Result<(), AppError> {
    if !caller.role.is_super_admin() && roles.iter().any(Role::is_super_admin) {
        return Err(AppError::Forbidden {
            required_permissions: vec![Role::SuperAdmin.to_string()],
        });
    }
    Ok(())
}

async fn ensure_identity_free(
    state: &AppState,
    username: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<Uuid>,
) -> Result<(), AppError> {
    let (username_taken, email_taken) =
        find_taken_identity(&state.db, username, email, exclude_id).await?;
    if username_taken {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }
    if email_taken {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }
    Ok(())
}

fn hash(password: &str) -> Result<String, AppError> {
    Ok(hash_password(password).map_err(|err| anyhow::anyhow!("hash password: {}", err))?)
}

async fn find_user(state: &AppState, id: &str) -> Result<User, AppError> {
    let id = parse_uuid(id, "Invalid user ID")?;
    get_user_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

async fn list(
    state: &AppState,
    auth: &BearerAuthorization,
    query: UserListQuery,
) -> Result<(Vec<UserDetail>, Pagination), AppError> {
    authorize(state, auth, USERS_VIEW).await?;
    let role = match non_empty(query.role) {
        Some(role) => Some(parse_role(&role)?),
        None => None,
    };
    let filter = UserFilter {
        search: non_empty(query.search),
        role,
        is_active: query.is_active,
    };
    let (users, total) =
        get_all_users(&state.db, &filter, query.sort, query.order, query.page).await?;
    Ok((
        users.into_iter().map(UserDetail::from).collect(),
        Pagination::new(query.page, total),
    ))
}

async fn detail(
    state: &AppState,
    auth: &BearerAuthorization,
    id: &str,
) -> Result<UserDetail, AppError> {
    authorize(state, auth, USERS_VIEW).await?;
    Ok(find_user(state, id).await?.into())
}

async fn create(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    payload: UserCreateRequest,
) -> Result<UserDetail, AppError> {
    let caller = authorize(state, auth, USERS_CREATE).await?;
    payload.validate()?;
    let role = match non_empty(payload.role) {
        Some(role) => parse_role(&role)?,
        None => Role::User,
    };
    guard_super_admin(&caller, &[role])?;
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_string();
    ensure_identity_free(state, Some(&username), Some(&email), None).await?;

    let now = Local::now().fixed_offset();
    let user = User {
        id: Uuid::now_v7(),
        username,
        email,
        password: hash(&payload.password)?,
        full_name: payload.full_name.trim().to_string(),
        role,
        is_active: payload.is_active.unwrap_or(true),
        created_date: Some(now),
        updated_date: Some(now),
    };
    create_user(&state.db, &user)
        .await
        .map_err(|err| conflict_or_unexpected(err, "Username or email already exists"))?;

    record(
        &state.db,
        ActivityEntry::new(
            &caller,
            req,
            "CREATE",
            MODULE,
            format!("Created user: {}", user.username),
        ),
    )
    .await;
    Ok(user.into())
}

async fn update(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    id: &str,
    payload: UserUpdateRequest,
) -> Result<UserDetail, AppError> {
    let caller = authorize(state, auth, USERS_EDIT).await?;
    let existing = find_user(state, id).await?;
    payload.validate()?;
    if existing.id == caller.id && payload.is_active == Some(false) {
        return Err(AppError::validation(
            "is_active",
            "You cannot deactivate your own account",
        ));
    }
    let role = match non_empty(payload.role) {
        Some(role) => parse_role(&role)?,
        None => existing.role,
    };
    guard_super_admin(&caller, &[existing.role, role])?;

    let username = payload.username.map(|val| val.trim().to_string());
    let email = payload.email.map(|val| val.trim().to_string());
    ensure_identity_free(
        state,
        username.as_deref(),
        email.as_deref(),
        Some(existing.id),
    )
    .await?;
    let password = match &payload.password {
        Some(password) => hash(password)?,
        None => existing.password.clone(),
    };

    let user = User {
        username: username.unwrap_or(existing.username.clone()),
        email: email.unwrap_or(existing.email.clone()),
        password,
        full_name: payload
            .full_name
            .map(|val| val.trim().to_string())
            .unwrap_or(existing.full_name.clone()),
        role,
        is_active: payload.is_active.unwrap_or(existing.is_active),
        updated_date: Some(Local::now().fixed_offset()),
        ..existing
    };
    update_user(&state.db, &user)
        .await
        .map_err(|err| conflict_or_unexpected(err, "Username or email already exists"))?;

    record(
        &state.db,
        ActivityEntry::new(
            &caller,
            req,
            "UPDATE",
            MODULE,
            format!("Updated user: {}", user.username),
        ),
    )
    .await;
    Ok(user.into())
}

async fn delete(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    id: &str,
) -> Result<(), AppError> {
    let caller = authorize(state, auth, USERS_DELETE).await?;
    let existing = find_user(state, id).await?;
    if existing.id == caller.id {
        return Err(AppError::validation(
            "id",
            "You cannot delete your own account",
        ));
    }
    guard_super_admin(&caller, &[existing.role])?;
    delete_user(&state.db, &existing.id).await?;

    record(
        &state.db,
        ActivityEntry::new(
            &caller,
            req,
            "DELETE",
            MODULE,
            format!("Deleted user: {}", existing.username),
        ),
    )
    .await;
    Ok(())
}
