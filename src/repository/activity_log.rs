use anyhow::Context;
use sqlx::PgExecutor;

use crate::model::activity_log::{ActivityLog, TABLE_NAME};

pub async fn create_activity_log<'e, E: PgExecutor<'e>>(
    db: E,
    log: &ActivityLog,
) -> anyhow::Result<()> {
    sqlx::query(
        format!(
            r#"INSERT INTO {} (id, user_id, action, module, description, ip_address, created_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(log.id)
    .bind(log.user_id)
    .bind(&log.action)
    .bind(&log.module)
    .bind(&log.description)
    .bind(&log.ip_address)
    .bind(log.created_date)
    .execute(db)
    .await
    .context("insert activity log")?;
    Ok(())
}

pub async fn get_activity_logs_by_module<'e, E: PgExecutor<'e>>(
    db: E,
    module: &str,
) -> anyhow::Result<Vec<ActivityLog>> {
    Ok(sqlx::query_as(
        format!(
            "SELECT * FROM {} WHERE module = $1 ORDER BY created_date DESC",
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(module)
    .fetch_all(db)
    .await?)
}
