use anyhow::Context;
use sqlx::{PgExecutor, Postgres, Transaction};

use crate::model::{menu_permission::TABLE_NAME, role::Role};

pub async fn get_roles_by_menu<'e, E: PgExecutor<'e>>(
    db: E,
    menu_id: i64,
) -> anyhow::Result<Vec<Role>> {
    let rows: Vec<(Role,)> = sqlx::query_as(
        format!(
            "SELECT role FROM {} WHERE menu_id = $1 ORDER BY role",
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(menu_id)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn replace_menu_roles(
    tx: &mut Transaction<'_, Postgres>,
    menu_id: i64,
    roles: &[Role],
) -> anyhow::Result<()> {
    sqlx::query(format!("DELETE FROM {} WHERE menu_id = $1", TABLE_NAME).as_str())
        .bind(menu_id)
        .execute(&mut **tx)
        .await
        .context("delete menu roles")?;
    for role in roles {
        sqlx::query(
            format!(
                "INSERT INTO {} (menu_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                TABLE_NAME
            )
            .as_str(),
        )
        .bind(menu_id)
        .bind(role)
        .execute(&mut **tx)
        .await
        .context("insert menu role")?;
    }
    Ok(())
}
