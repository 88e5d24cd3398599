use chrono::Local;
use poem::Request;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::{
    core::utils::client_ip,
    model::{activity_log::ActivityLog, user::User},
    repository::activity_log::create_activity_log,
};

pub struct ActivityEntry<'a> {
    pub user_id: Option<Uuid>,
    pub action: &'a str,
    pub module: &'a str,
    pub description: String,
    pub ip_address: Option<String>,
}

impl<'a> ActivityEntry<'a> {
    /// Entry for an action `user` performed through `req`.
    pub fn new(
        user: &User,
        req: &Request,
        action: &'a str,
        module: &'a str,
        description: String,
    ) -> Self {
        Self {
            user_id: Some(user.id),
            action,
            module,
            description,
            ip_address: client_ip(req),
        }
    }
}

/// Append an audit line. The caller's operation has already succeeded, so a
/// failed write is only reported.
pub async fn record(db: &PgPool, entry: ActivityEntry<'_>) {
    let log = ActivityLog {
        id: Uuid::now_v7(),
        user_id: entry.user_id,
        action: entry.action.to_string(),
        module: entry.module.to_string(),
        description: entry.description,
        ip_address: entry.ip_address,
        created_date: Local::now().fixed_offset(),
    };
    if let Err(err) = create_activity_log(db, &log).await {
        warn!(
            "failed to write activity log {} {}: {:#}",
            log.module, log.action, err
        );
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;
    use crate::repository::activity_log::get_activity_logs_by_module;

    #[sqlx::test]
    async fn test_record_writes_a_line(pool: PgPool) -> anyhow::Result<()> {
        // When
        record(
            &pool,
            ActivityEntry {
                user_id: None,
                action: "UPDATE",
                module: "permissions",
                description: "Updated permissions for role: manager".to_string(),
                ip_address: Some("127.0.0.1".to_string()),
            },
        )
        .await;

        // Expect
        let logs = get_activity_logs_by_module(&pool, "permissions").await?;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "UPDATE");
        assert_eq!(logs[0].description, "Updated permissions for role: manager");
        Ok(())
    }

    #[sqlx::test]
    async fn test_record_swallows_store_failure(pool: PgPool) -> anyhow::Result<()> {
        // Given
        sqlx::query("DROP TABLE public.activity_logs")
            .execute(&pool)
            .await?;

        // When / Expect: returns without panicking
        record(
            &pool,
            ActivityEntry {
                user_id: None,
                action: "DELETE",
                module: "menus",
                description: "Deleted menu: reports".to_string(),
                ip_address: None,
            },
        )
        .await;
        Ok(())
    }
}
