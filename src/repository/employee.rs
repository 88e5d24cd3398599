use anyhow::Context;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::{
    core::sqlx_utils::{
        binds_query_as, order_by, query_builder, PageRequest, QueryFilter, SortField, SortOrder,
        SqlxBinds,
    },
    model::employee::{Employee, TABLE_NAME},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmployeeSortField {
    FullName,
    EmployeeCode,
    HireDate,
    Salary,
    CreatedDate,
}

impl SortField for EmployeeSortField {
    const ALLOWED: &'static [Self] = &[
        EmployeeSortField::FullName,
        EmployeeSortField::EmployeeCode,
        EmployeeSortField::HireDate,
        EmployeeSortField::Salary,
        EmployeeSortField::CreatedDate,
    ];

    fn column(&self) -> &'static str {
        match self {
            EmployeeSortField::FullName => "full_name",
            EmployeeSortField::EmployeeCode => "employee_code",
            EmployeeSortField::HireDate => "hire_date",
            EmployeeSortField::Salary => "salary",
            EmployeeSortField::CreatedDate => "created_date",
        }
    }

    fn default_field() -> Self {
        EmployeeSortField::CreatedDate
    }
}

#[derive(Clone, Debug, Default)]
pub struct EmployeeFilter {
    pub search: Option<String>,
    pub department: Option<String>,
    pub status: Option<String>,
    pub position: Option<String>,
}

impl EmployeeFilter {
    fn to_query_filter(&self) -> QueryFilter {
        let mut filter = QueryFilter::new();
        if let Some(search) = &self.search {
            let pattern = format!("%{}%", search);
            filter.push(
                "(full_name ILIKE {} OR employee_code ILIKE {} OR email ILIKE {} OR phone ILIKE {})",
                vec![SqlxBinds::String(pattern); 4],
            );
        }
        if let Some(department) = &self.department {
            filter.push(
                "department = {}",
                vec![SqlxBinds::String(department.clone())],
            );
        }
        if let Some(status) = &self.status {
            filter.push("status = {}", vec![SqlxBinds::String(status.clone())]);
        }
        if let Some(position) = &self.position {
            filter.push("position = {}", vec![SqlxBinds::String(position.clone())]);
        }
        filter
    }
}

/// One page of employees plus the total number of matches.
pub async fn get_all_employees(
    db: &PgPool,
    filter: &EmployeeFilter,
    sort: EmployeeSortField,
    order: SortOrder,
    page: PageRequest,
) -> anyhow::Result<(Vec<Employee>, u32)> {
    let filter = filter.to_query_filter();
    let stmt = query_builder(
        None,
        TABLE_NAME,
        filter.predicates(),
        vec![order_by(sort, order), "id".to_string()],
        Some(page.limit),
        Some(page.offset()),
    );
    let stmt_count = query_builder(
        Some("COUNT(*)".to_string()),
        TABLE_NAME,
        filter.predicates(),
        vec![],
        None,
        None,
    );

    let q = binds_query_as::<Employee>(&stmt, filter.binds());
    let q_count = binds_query_as::<(i64,)>(&stmt_count, filter.binds());
    let data = q.fetch_all(db).await.context("list employees")?;
    let count = q_count.fetch_one(db).await.context("count employees")?;
    Ok((data, count.0 as u32))
}

pub async fn get_employee_by_id<'e, E: PgExecutor<'e>>(
    db: E,
    id: &Uuid,
) -> anyhow::Result<Option<Employee>> {
    Ok(
        sqlx::query_as(format!("SELECT * FROM {} WHERE id = $1", TABLE_NAME).as_str())
            .bind(id)
            .fetch_optional(db)
            .await?,
    )
}

pub async fn create_employee<'e, E: PgExecutor<'e>>(
    db: E,
    employee: &Employee,
) -> anyhow::Result<()> {
    sqlx::query(
        format!(
            r#"INSERT INTO {} (id, employee_code, full_name, email, phone, address, position,
            department, salary, hire_date, birth_date, gender, photo, status, created_by,
            created_date, updated_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(employee.id)
    .bind(&employee.employee_code)
    .bind(&employee.full_name)
    .bind(&employee.email)
    .bind(&employee.phone)
    .bind(&employee.address)
    .bind(&employee.position)
    .bind(&employee.department)
    .bind(employee.salary)
    .bind(employee.hire_date)
    .bind(employee.birth_date)
    .bind(&employee.gender)
    .bind(&employee.photo)
    .bind(&employee.status)
    .bind(employee.created_by)
    .bind(employee.created_date)
    .bind(employee.updated_date)
    .execute(db)
    .await
    .context("insert employee")?;
    Ok(())
}

pub async fn update_employee<'e, E: PgExecutor<'e>>(
    db: E,
    employee: &Employee,
) -> anyhow::Result<()> {
    sqlx::query(
        format!(
            r#"UPDATE {}
            SET employee_code = $1, full_name = $2, email = $3, phone = $4, address = $5,
            position = $6, department = $7, salary = $8, hire_date = $9, birth_date = $10,
            gender = $11, photo = $12, status = $13, updated_date = $14
            WHERE id = $15"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(&employee.employee_code)
    .bind(&employee.full_name)
    .bind(&employee.email)
    .bind(&employee.phone)
    .bind(&employee.address)
    .bind(&employee.position)
    .bind(&employee.department)
    .bind(employee.salary)
    .bind(employee.hire_date)
    .bind(employee.birth_date)
    .bind(&employee.gender)
    .bind(&employee.photo)
    .bind(&employee.status)
    .bind(employee.updated_date)
    .bind(employee.id)
    .execute(db)
    .await
    .context("update employee")?;
    Ok(())
}

pub async fn delete_employee<'e, E: PgExecutor<'e>>(db: E, id: &Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query(format!("DELETE FROM {} WHERE id = $1", TABLE_NAME).as_str())
        .bind(id)
        .execute(db)
        .await
        .context("delete employee")?;
    Ok(res.rows_affected())
}

#[derive(Clone, Debug, FromRow)]
pub struct GroupCount {
    pub label: String,
    pub count: i64,
}

#[derive(Clone, Debug)]
pub struct EmployeeStats {
    pub total: i64,
    pub by_status: Vec<GroupCount>,
    pub by_department: Vec<GroupCount>,
    pub by_gender: Vec<GroupCount>,
    pub recent: Vec<Employee>,
}

async fn group_counts(db: &PgPool, column: &str) -> anyhow::Result<Vec<GroupCount>> {
    Ok(sqlx::query_as(
        format!(
            "SELECT {col} AS label, COUNT(*) AS count FROM {} GROUP BY {col} ORDER BY count DESC, label",
            TABLE_NAME,
            col = column
        )
        .as_str(),
    )
    .fetch_all(db)
    .await
    .with_context(|| format!("count employees by {}", column))?)
}

pub async fn get_employee_stats(db: &PgPool) -> anyhow::Result<EmployeeStats> {
    let total: (i64,) = sqlx::query_as(format!("SELECT COUNT(*) FROM {}", TABLE_NAME).as_str())
        .fetch_one(db)
        .await?;
    let recent: Vec<Employee> = sqlx::query_as(
        format!(
            "SELECT * FROM {} ORDER BY created_date DESC, id DESC LIMIT 5",
            TABLE_NAME
        )
        .as_str(),
    )
    .fetch_all(db)
    .await?;
    Ok(EmployeeStats {
        total: total.0,
        by_status: group_counts(db, "status").await?,
        by_department: group_counts(db, "department").await?,
        by_gender: group_counts(db, "gender").await?,
        recent,
    })
}
