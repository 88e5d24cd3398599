use anyhow::Context;
use sqlx::{PgExecutor, Postgres, Transaction};

use crate::model::{
    permission::{Permission, TABLE_NAME as PERMISSION_TABLE_NAME},
    role::Role,
    role_permission::{RoleSummary, TABLE_NAME},
    user::TABLE_NAME as USER_TABLE_NAME,
};

pub async fn role_has_permission<'e, E: PgExecutor<'e>>(
    db: E,
    role: Role,
    permission_name: &str,
) -> anyhow::Result<bool> {
    let res: (bool,) = sqlx::query_as(
        format!(
            r#"SELECT EXISTS(
                SELECT 1 FROM {} rp
                INNER JOIN {} p ON rp.permission_id = p.id
                WHERE rp.role = $1 AND p.name = $2
            )"#,
            TABLE_NAME, PERMISSION_TABLE_NAME
        )
        .as_str(),
    )
    .bind(role)
    .bind(permission_name)
    .fetch_one(db)
    .await
    .context("check role permission")?;
    Ok(res.0)
}

pub async fn role_has_any_permission<'e, E: PgExecutor<'e>>(
    db: E,
    role: Role,
    permission_names: &[String],
) -> anyhow::Result<bool> {
    let res: (bool,) = sqlx::query_as(
        format!(
            r#"SELECT EXISTS(
                SELECT 1 FROM {} rp
                INNER JOIN {} p ON rp.permission_id = p.id
                WHERE rp.role = $1 AND p.name = ANY($2)
            )"#,
            TABLE_NAME, PERMISSION_TABLE_NAME
        )
        .as_str(),
    )
    .bind(role)
    .bind(permission_names)
    .fetch_one(db)
    .await
    .context("check any role permission")?;
    Ok(res.0)
}

pub async fn count_granted_permissions<'e, E: PgExecutor<'e>>(
    db: E,
    role: Role,
    permission_names: &[String],
) -> anyhow::Result<i64> {
    let res: (i64,) = sqlx::query_as(
        format!(
            r#"SELECT COUNT(DISTINCT p.name) FROM {} rp
            INNER JOIN {} p ON rp.permission_id = p.id
            WHERE rp.role = $1 AND p.name = ANY($2)"#,
            TABLE_NAME, PERMISSION_TABLE_NAME
        )
        .as_str(),
    )
    .bind(role)
    .bind(permission_names)
    .fetch_one(db)
    .await
    .context("count role permissions")?;
    Ok(res.0)
}

/// Permissions granted to `role`, ordered by module then name.
pub async fn get_permissions_by_role<'e, E: PgExecutor<'e>>(
    db: E,
    role: Role,
) -> anyhow::Result<Vec<Permission>> {
    Ok(sqlx::query_as(
        format!(
            r#"SELECT p.* FROM {} p
            INNER JOIN {} rp ON p.id = rp.permission_id
            WHERE rp.role = $1
            ORDER BY p.module, p.name"#,
            PERMISSION_TABLE_NAME, TABLE_NAME
        )
        .as_str(),
    )
    .bind(role)
    .fetch_all(db)
    .await?)
}

/// Swap the grant set of `role` for `permission_ids`. Runs on the caller's
/// transaction; nothing is visible until it commits.
pub async fn replace_role_permissions(
    tx: &mut Transaction<'_, Postgres>,
    role: Role,
    permission_ids: &[i64],
) -> anyhow::Result<()> {
    // delete existing grants for role
    sqlx::query(format!("DELETE FROM {} WHERE role = $1", TABLE_NAME).as_str())
        .bind(role)
        .execute(&mut **tx)
        .await
        .context("delete role permissions")?;

    // reinsert grants
    if !permission_ids.is_empty() {
        sqlx::query(
            format!(
                "INSERT INTO {} (role, permission_id) SELECT $1, UNNEST($2::BIGINT[])",
                TABLE_NAME
            )
            .as_str(),
        )
        .bind(role)
        .bind(permission_ids)
        .execute(&mut **tx)
        .await
        .context("insert role permissions")?;
    }
    Ok(())
}

/// One row per role that holds at least one grant, largest grant set first.
pub async fn get_roles_summary<'e, E: PgExecutor<'e>>(db: E) -> anyhow::Result<Vec<RoleSummary>> {
    Ok(sqlx::query_as(
        format!(
            r#"SELECT
                rp.role,
                COUNT(DISTINCT rp.permission_id) AS total_permissions,
                ARRAY_AGG(DISTINCT p.module ORDER BY p.module) AS modules,
                COUNT(DISTINCT u.id) AS user_count
            FROM {} rp
            INNER JOIN {} p ON rp.permission_id = p.id
            LEFT JOIN {} u ON u.role = rp.role AND u.is_active = TRUE
            GROUP BY rp.role
            ORDER BY total_permissions DESC, rp.role"#,
            TABLE_NAME, PERMISSION_TABLE_NAME, USER_TABLE_NAME
        )
        .as_str(),
    )
    .fetch_all(db)
    .await?)
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;

    #[sqlx::test]
    async fn test_seeded_grants(pool: PgPool) -> anyhow::Result<()> {
        assert!(role_has_permission(&pool, Role::Admin, "employees.delete").await?);
        assert!(!role_has_permission(&pool, Role::Admin, "permissions.manage").await?);
        assert!(role_has_permission(&pool, Role::User, "employees.view").await?);
        assert!(!role_has_permission(&pool, Role::User, "employees.view.extra").await?);
        // super_admin has no rows, the bypass lives in the gate
        assert!(!role_has_permission(&pool, Role::SuperAdmin, "employees.view").await?);
        Ok(())
    }

    #[sqlx::test]
    async fn test_any_and_count(pool: PgPool) -> anyhow::Result<()> {
        let names = vec!["users.view".to_string(), "users.delete".to_string()];
        assert!(role_has_any_permission(&pool, Role::Manager, &names).await?);
        assert!(!role_has_any_permission(&pool, Role::User, &names).await?);
        assert_eq!(count_granted_permissions(&pool, Role::Manager, &names).await?, 1);
        assert_eq!(count_granted_permissions(&pool, Role::Admin, &names).await?, 2);
        Ok(())
    }

    #[sqlx::test]
    async fn test_replace_role_permissions(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let all = get_permissions_by_role(&pool, Role::Admin).await?;
        let ids: Vec<i64> = all.iter().take(2).map(|p| p.id).collect();

        // When
        let mut tx = pool.begin().await?;
        replace_role_permissions(&mut tx, Role::User, &ids).await?;
        tx.commit().await?;

        // Expect
        let granted = get_permissions_by_role(&pool, Role::User).await?;
        let mut granted_ids: Vec<i64> = granted.iter().map(|p| p.id).collect();
        granted_ids.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(granted_ids, expected);
        Ok(())
    }

    #[sqlx::test]
    async fn test_replace_rolls_back_on_drop(pool: PgPool) -> anyhow::Result<()> {
        // When
        {
            let mut tx = pool.begin().await?;
            replace_role_permissions(&mut tx, Role::Manager, &[]).await?;
            // dropped without commit
        }

        // Expect
        assert_eq!(get_permissions_by_role(&pool, Role::Manager).await?.len(), 4);
        Ok(())
    }

    #[sqlx::test]
    async fn test_roles_summary(pool: PgPool) -> anyhow::Result<()> {
        let summary = get_roles_summary(&pool).await?;
        let roles: Vec<Role> = summary.iter().map(|s| s.role).collect();
        assert_eq!(roles, vec![Role::Admin, Role::Manager, Role::User]);
        assert_eq!(summary[0].total_permissions, 10);
        assert_eq!(
            summary[1].modules,
            vec!["employees".to_string(), "users".to_string()]
        );
        assert_eq!(summary[2].user_count, 0);
        Ok(())
    }
}
