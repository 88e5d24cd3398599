use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use poem::{web::Data, Request};
use poem_openapi::{
    param::{Path, Query},
    payload::Json,
    OpenApi, Tags,
};
use tracing::info;

use crate::{
    core::{
        activity_log::{record, ActivityEntry},
        error::{conflict_or_unexpected, AppError},
        security::{authenticate, authorize, BearerAuthorization},
        sqlx_utils::{PageRequest, SortField, SortOrder},
        utils::{non_empty, parse_uuid},
    },
    model::{
        employee::{Employee, STATUSES},
        permission::{EMPLOYEES_CREATE, EMPLOYEES_DELETE, EMPLOYEES_EDIT, EMPLOYEES_VIEW},
    },
    repository::employee::{
        create_employee, delete_employee, get_all_employees, get_employee_by_id,
        get_employee_stats, update_employee, EmployeeFilter, EmployeeSortField,
    },
    schema::{
        common::{DataResponse, MessageResponse, PaginateResponse, Pagination},
        employee::{
            EmployeeCreateResponses, EmployeeDeleteResponses, EmployeeDetail,
            EmployeeDetailResponses, EmployeeForm, EmployeePayload, EmployeeStatsDetail,
            EmployeeStatsResponses, EmployeeUpdateResponses, GetPaginateEmployeeResponses,
        },
    },
    AppState,
};

const MODULE: &str = "employees";
const DUPLICATE_MESSAGE: &str = "Employee code or email already exists";

#[derive(Tags)]
enum ApiEmployeeTags {
    Employee,
}

pub struct ApiEmployee;

#[OpenApi]
impl ApiEmployee {
    #[oai(
        path = "/employees/stats",
        method = "get",
        tag = "ApiEmployeeTags::Employee"
    )]
    async fn get_employee_stats_api(
        &self,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> EmployeeStatsResponses {
        match stats(&state, &auth).await {
            Ok(data) => EmployeeStatsResponses::Ok(Json(DataResponse::new(
                "Employee statistics retrieved successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    #[oai(path = "/employees", method = "get", tag = "ApiEmployeeTags::Employee")]
    async fn get_paginate_employee_api(
        &self,
        Query(page): Query<Option<u32>>,
        Query(limit): Query<Option<u32>>,
        Query(search): Query<Option<String>>,
        Query(department): Query<Option<String>>,
        Query(status): Query<Option<String>>,
        Query(position): Query<Option<String>>,
        Query(sort_by): Query<Option<String>>,
        Query(sort_order): Query<Option<String>>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> GetPaginateEmployeeResponses {
        let query = EmployeeListQuery {
            page: PageRequest::new(page, limit),
            filter: EmployeeFilter {
                search: non_empty(search),
                department: non_empty(department),
                status: non_empty(status),
                position: non_empty(position),
            },
            sort: EmployeeSortField::from_param(sort_by.as_deref()),
            order: SortOrder::from_param(sort_order.as_deref()),
        };
        match list(&state, &auth, query).await {
            Ok((data, pagination)) => GetPaginateEmployeeResponses::Ok(Json(
                PaginateResponse::new("Employees retrieved successfully", data, pagination),
            )),
            Err(err) => err.into(),
        }
    }

    #[oai(
        path = "/employees/:id",
        method = "get",
        tag = "ApiEmployeeTags::Employee"
    )]
    async fn get_detail_employee_api(
        &self,
        Path(id): Path<String>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> EmployeeDetailResponses {
        match detail(&state, &auth, &id).await {
            Ok(data) => EmployeeDetailResponses::Ok(Json(DataResponse::new(
                "Employee retrieved successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/employees", method = "post", tag = "ApiEmployeeTags::Employee")]
    async fn create_employee_api(
        &self,
        req: &Request,
        form: EmployeeForm,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> EmployeeCreateResponses {
        match create(&state, &auth, req, form).await {
            Ok(data) => EmployeeCreateResponses::Created(Json(DataResponse::new(
                "Employee created successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(
        path = "/employees/:id",
        method = "post",
        tag = "ApiEmployeeTags::Employee"
    )]
    async fn update_employee_api(
        &self,
        req: &Request,
        Path(id): Path<String>,
        form: EmployeeForm,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> EmployeeUpdateResponses {
        match update(&state, &auth, req, &id, form).await {
            Ok(data) => EmployeeUpdateResponses::Ok(Json(DataResponse::new(
                "Employee updated successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(
        path = "/employees/:id",
        method = "delete",
        tag = "ApiEmployeeTags::Employee"
    )]
    async fn delete_employee_api(
        &self,
        req: &Request,
        Path(id): Path<String>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> EmployeeDeleteResponses {
        match delete(&state, &auth, req, &id).await {
            Ok(()) => EmployeeDeleteResponses::Ok(Json(MessageResponse::ok(
                "Employee deleted successfully",
            ))),
            Err(err) => err.into(),
        }
    }
}

struct EmployeeListQuery {
    page: PageRequest,
    filter: EmployeeFilter,
    sort: EmployeeSortField,
    order: SortOrder,
}

async fn find_employee(state: &AppState, id: &str) -> Result<Employee, AppError> {
    let id = parse_uuid(id, "Invalid employee ID")?;
    get_employee_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))
}

/// Store the uploaded photo, if any, and return its file name.
async fn store_photo(
    state: &AppState,
    form: &mut EmployeeForm,
) -> Result<Option<String>, AppError> {
    let Some(upload) = form.photo.take() else {
        return Ok(None);
    };
    let content_type = upload.content_type().map(str::to_string);
    state.photos.validate(content_type.as_deref(), upload.size())?;
    let data = upload.into_vec().await.context("read uploaded photo")?;
    let file_name = state.photos.save(content_type.as_deref(), &data).await?;
    Ok(Some(file_name))
}

async fn stats(
    state: &AppState,
    auth: &BearerAuthorization,
) -> Result<EmployeeStatsDetail, AppError> {
    authenticate(state, auth).await?;
    Ok(get_employee_stats(&state.db).await?.into())
}

async fn list(
    state: &AppState,
    auth: &BearerAuthorization,
    query: EmployeeListQuery,
) -> Result<(Vec<EmployeeDetail>, Pagination), AppError> {
    authorize(state, auth, EMPLOYEES_VIEW).await?;
    if let Some(status) = &query.filter.status {
        if !STATUSES.contains(&status.as_str()) {
            return Err(AppError::validation(
                "status",
                "Invalid status. Must be Active, Inactive, or Resigned",
            ));
        }
    }
    let (employees, total) = get_all_employees(
        &state.db,
        &query.filter,
        query.sort,
        query.order,
        query.page,
    )
    .await?;
    Ok((
        employees.into_iter().map(EmployeeDetail::from).collect(),
        Pagination::new(query.page, total),
    ))
}

async fn detail(
    state: &AppState,
    auth: &BearerAuthorization,
    id: &str,
) -> Result<EmployeeDetail, AppError> {
    authorize(state, auth, EMPLOYEES_VIEW).await?;
    Ok(find_employee(state, id).await?.into())
}

async fn create(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    mut form: EmployeeForm,
) -> Result<EmployeeDetail, AppError> {
    let user = authorize(state, auth, EMPLOYEES_CREATE).await?;
    let mut employee = EmployeePayload::from_form(&form).into_new_employee(Some(user.id))?;
    employee.photo = store_photo(state, &mut form).await?;

    if let Err(err) = create_employee(&state.db, &employee).await {
        if let Some(photo) = &employee.photo {
            state.photos.remove(photo).await;
        }
        return Err(conflict_or_unexpected(err, DUPLICATE_MESSAGE));
    }
    info!("employee {} created by {}", employee.employee_code, user.username);

    record(
        &state.db,
        ActivityEntry::new(
            &user,
            req,
            "CREATE",
            MODULE,
            format!("Created employee: {}", employee.full_name),
        ),
    )
    .await;
    Ok(employee.into())
}

async fn update(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    id: &str,
    mut form: EmployeeForm,
) -> Result<EmployeeDetail, AppError> {
    let user = authorize(state, auth, EMPLOYEES_EDIT).await?;
    let existing = find_employee(state, id).await?;

    let mut payload = EmployeePayload::from_employee(&existing);
    payload.merge(&form);
    let mut employee = existing.clone();
    payload.apply_to(&mut employee)?;
    employee.updated_date = Some(Local::now().fixed_offset());

    let new_photo = store_photo(state, &mut form).await?;
    if new_photo.is_some() {
        employee.photo = new_photo.clone();
    }

    if let Err(err) = update_employee(&state.db, &employee).await {
        if let Some(photo) = &new_photo {
            state.photos.remove(photo).await;
        }
        return Err(conflict_or_unexpected(err, DUPLICATE_MESSAGE));
    }
    // the replaced file goes only once the row points at the new one
    if let (Some(_), Some(old_photo)) = (&new_photo, &existing.photo) {
        state.photos.remove(old_photo).await;
    }

    record(
        &state.db,
        ActivityEntry::new(
            &user,
            req,
            "UPDATE",
            MODULE,
            format!("Updated employee: {}", employee.full_name),
        ),
    )
    .await;
    Ok(employee.into())
}

async fn delete(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &Request,
    id: &str,
) -> Result<(), AppError> {
    let user = authorize(state, auth, EMPLOYEES_DELETE).await?;
    let existing = find_employee(state, id).await?;
    delete_employee(&state.db, &existing.id).await?;
    if let Some(photo) = &existing.photo {
        state.photos.remove(photo).await;
    }

    record(
        &state.db,
        ActivityEntry::new(
            &user,
            req,
            "DELETE",
            MODULE,
            format!("Deleted employee: {}", existing.full_name),
        ),
    )
    .await;
    Ok(())
}
