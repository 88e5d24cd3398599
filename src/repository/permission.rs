use anyhow::Context;
use sqlx::PgExecutor;

use crate::model::permission::{Permission, TABLE_NAME};

/// Whole catalogue, ordered by module then name.
pub async fn get_all_permissions<'e, E: PgExecutor<'e>>(db: E) -> anyhow::Result<Vec<Permission>> {
    Ok(sqlx::query_as(
        format!("SELECT * FROM {} ORDER BY module, name", TABLE_NAME).as_str(),
    )
    .fetch_all(db)
    .await?)
}

pub async fn get_permission_by_id<'e, E: PgExecutor<'e>>(
    db: E,
    id: i64,
) -> anyhow::Result<Option<Permission>> {
    Ok(
        sqlx::query_as(format!("SELECT * FROM {} WHERE id = $1", TABLE_NAME).as_str())
            .bind(id)
            .fetch_optional(db)
            .await?,
    )
}

/// Ids from `ids` that exist in the catalogue.
pub async fn get_existing_permission_ids<'e, E: PgExecutor<'e>>(
    db: E,
    ids: &[i64],
) -> anyhow::Result<Vec<i64>> {
    let rows: Vec<(i64,)> =
        sqlx::query_as(format!("SELECT id FROM {} WHERE id = ANY($1)", TABLE_NAME).as_str())
            .bind(ids)
            .fetch_all(db)
            .await?;
    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn create_permission<'e, E: PgExecutor<'e>>(
    db: E,
    permission: &Permission,
) -> anyhow::Result<Permission> {
    Ok(sqlx::query_as(
        format!(
            r#"INSERT INTO {} (name, display_name, description, module, created_date, updated_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(&permission.name)
    .bind(&permission.display_name)
    .bind(&permission.description)
    .bind(&permission.module)
    .bind(permission.created_date)
    .bind(permission.updated_date)
    .fetch_one(db)
    .await
    .context("insert permission")?)
}

pub async fn update_permission<'e, E: PgExecutor<'e>>(
    db: E,
    permission: &Permission,
) -> anyhow::Result<()> {
    sqlx::query(
        format!(
            r#"UPDATE {}
            SET name = $1, display_name = $2, description = $3, module = $4, updated_date = $5
            WHERE id = $6"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(&permission.name)
    .bind(&permission.display_name)
    .bind(&permission.description)
    .bind(&permission.module)
    .bind(permission.updated_date)
    .bind(permission.id)
    .execute(db)
    .await
    .context("update permission")?;
    Ok(())
}

/// Grants referencing the permission go with it (ON DELETE CASCADE).
pub async fn delete_permission<'e, E: PgExecutor<'e>>(db: E, id: i64) -> anyhow::Result<u64> {
    let res = sqlx::query(format!("DELETE FROM {} WHERE id = $1", TABLE_NAME).as_str())
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
