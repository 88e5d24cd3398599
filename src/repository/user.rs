use anyhow::Context;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::{
    core::sqlx_utils::{
        binds_query_as, order_by, query_builder, PageRequest, QueryFilter, SortField, SortOrder,
        SqlxBinds,
    },
    model::{
        role::Role,
        user::{User, TABLE_NAME},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserSortField {
    Username,
    Email,
    FullName,
    Role,
    CreatedDate,
}

impl SortField for UserSortField {
    const ALLOWED: &'static [Self] = &[
        UserSortField::Username,
        UserSortField::Email,
        UserSortField::FullName,
        UserSortField::Role,
        UserSortField::CreatedDate,
    ];

    fn column(&self) -> &'static str {
        match self {
            UserSortField::Username => "username",
            UserSortField::Email => "email",
            UserSortField::FullName => "full_name",
            UserSortField::Role => "role",
            UserSortField::CreatedDate => "created_date",
        }
    }

    fn default_field() -> Self {
        UserSortField::CreatedDate
    }
}

#[derive(Clone, Debug, Default)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserFilter {
    fn to_query_filter(&self) -> QueryFilter {
        let mut filter = QueryFilter::new();
        if let Some(search) = &self.search {
            let pattern = format!("%{}%", search);
            filter.push(
                "(username ILIKE {} OR email ILIKE {} OR full_name ILIKE {})",
                vec![
                    SqlxBinds::String(pattern.clone()),
                    SqlxBinds::String(pattern.clone()),
                    SqlxBinds::String(pattern),
                ],
            );
        }
        if let Some(role) = self.role {
            filter.push("role = {}", vec![SqlxBinds::String(role.to_string())]);
        }
        if let Some(is_active) = self.is_active {
            filter.push("is_active = {}", vec![SqlxBinds::Bool(is_active)]);
        }
        filter
    }
}

/// One page of users plus the total number of matches.
pub async fn get_all_users(
    db: &PgPool,
    filter: &UserFilter,
    sort: UserSortField,
    order: SortOrder,
    page: PageRequest,
) -> anyhow::Result<(Vec<User>, u32)> {
    let filter = filter.to_query_filter();
    let stmt = query_builder(
        None,
        TABLE_NAME,
        filter.predicates(),
        // id keeps pages stable when the sort column has ties
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

    let q = binds_query_as::<User>(&stmt, filter.binds());
    let q_count = binds_query_as::<(i64,)>(&stmt_count, filter.binds());
    let data = q.fetch_all(db).await.context("list users")?;
    let count = q_count.fetch_one(db).await.context("count users")?;
    Ok((data, count.0 as u32))
}

pub async fn get_user_by_id<'e, E: PgExecutor<'e>>(
    db: E,
    id: &Uuid,
) -> anyhow::Result<Option<User>> {
    Ok(
        sqlx::query_as(format!("SELECT * FROM {} WHERE id = $1", TABLE_NAME).as_str())
            .bind(id)
            .fetch_optional(db)
            .await?,
    )
}

pub async fn get_user_by_username<'e, E: PgExecutor<'e>>(
    db: E,
    username: &str,
) -> anyhow::Result<Option<User>> {
    Ok(
        sqlx::query_as(format!("SELECT * FROM {} WHERE username = $1", TABLE_NAME).as_str())
            .bind(username)
            .fetch_optional(db)
            .await?,
    )
}

/// Which of `username` / `email` already belong to a user other than
/// `exclude_id`.
pub async fn find_taken_identity<'e, E: PgExecutor<'e>>(
    db: E,
    username: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<Uuid>,
) -> anyhow::Result<(bool, bool)> {
    let res: (bool, bool) = sqlx::query_as(
        format!(
            r#"SELECT
                COALESCE(BOOL_OR(username = $1), FALSE),
                COALESCE(BOOL_OR(email = $2), FALSE)
            FROM {}
            WHERE (username = $1 OR email = $2) AND ($3::UUID IS NULL OR id <> $3)"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(username)
    .bind(email)
    .bind(exclude_id)
    .fetch_one(db)
    .await?;
    Ok(res)
}

pub async fn create_user<'e, E: PgExecutor<'e>>(db: E, user: &User) -> anyhow::Result<()> {
    sqlx::query(
        format!(
            r#"INSERT INTO {} (id, username, email, password, full_name, role, is_active, created_date, updated_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password)
    .bind(&user.full_name)
    .bind(user.role)
    .bind(user.is_active)
    .bind(user.created_date)
    .bind(user.updated_date)
    .execute(db)
    .await
    .context("insert user")?;
    Ok(())
}

pub async fn update_user<'e, E: PgExecutor<'e>>(db: E, user: &User) -> anyhow::Result<()> {
    sqlx::query(
        format!(
            r#"UPDATE {}
            SET username = $1, email = $2, password = $3, full_name = $4, role = $5,
            is_active = $6, updated_date = $7
            WHERE id = $8"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password)
    .bind(&user.full_name)
    .bind(user.role)
    .bind(user.is_active)
    .bind(user.updated_date)
    .bind(user.id)
    .execute(db)
    .await
    .context("update user")?;
    Ok(())
}

pub async fn delete_user<'e, E: PgExecutor<'e>>(db: E, id: &Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query(format!("DELETE FROM {} WHERE id = $1", TABLE_NAME).as_str())
        .bind(id)
        .execute(db)
        .await
        .context("delete user")?;
    Ok(res.rows_affected())
}
