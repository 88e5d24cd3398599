use anyhow::Context;
use sqlx::{PgExecutor, Postgres, Transaction};

use crate::model::{
    menu::{Menu, MenuWithRelations, TABLE_NAME},
    menu_permission::TABLE_NAME as MENU_PERMISSION_TABLE_NAME,
    role::Role,
};

/// Roots first, then siblings by `order_no`.
const MENU_ORDER: &str = "m.parent_id NULLS FIRST, m.order_no, m.id";

/// Active menus visible to `role`, ordered for tree building.
pub async fn get_menus_for_role<'e, E: PgExecutor<'e>>(
    db: E,
    role: Role,
) -> anyhow::Result<Vec<Menu>> {
    Ok(sqlx::query_as(
        format!(
            r#"SELECT m.* FROM {} m
            INNER JOIN {} mp ON m.id = mp.menu_id
            WHERE mp.role = $1 AND m.is_active = TRUE
            ORDER BY {}"#,
            TABLE_NAME, MENU_PERMISSION_TABLE_NAME, MENU_ORDER
        )
        .as_str(),
    )
    .bind(role)
    .fetch_all(db)
    .await?)
}

pub async fn get_all_menus_with_relations<'e, E: PgExecutor<'e>>(
    db: E,
) -> anyhow::Result<Vec<MenuWithRelations>> {
    Ok(sqlx::query_as(
        format!(
            r#"SELECT m.*,
                pm.display_name AS parent_name,
                (SELECT COUNT(*) FROM {table} c WHERE c.parent_id = m.id) AS children_count
            FROM {table} m
            LEFT JOIN {table} pm ON m.parent_id = pm.id
            ORDER BY {order}"#,
            table = TABLE_NAME,
            order = MENU_ORDER
        )
        .as_str(),
    )
    .fetch_all(db)
    .await?)
}

pub async fn get_menu_by_id<'e, E: PgExecutor<'e>>(
    db: E,
    id: i64,
) -> anyhow::Result<Option<Menu>> {
    Ok(
        sqlx::query_as(format!("SELECT * FROM {} WHERE id = $1", TABLE_NAME).as_str())
            .bind(id)
            .fetch_optional(db)
            .await?,
    )
}

/// Like `get_menu_by_id` but holds a row lock until the transaction ends,
/// so no child can be attached to the menu meanwhile.
pub async fn lock_menu_by_id(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> anyhow::Result<Option<Menu>> {
    Ok(sqlx::query_as(
        format!("SELECT * FROM {} WHERE id = $1 FOR UPDATE", TABLE_NAME).as_str(),
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .context("lock menu")?)
}

/// Another menu already using `name`.
pub async fn name_taken<'e, E: PgExecutor<'e>>(
    db: E,
    name: &str,
    exclude_id: Option<i64>,
) -> anyhow::Result<bool> {
    let res: (bool,) = sqlx::query_as(
        format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(name)
    .bind(exclude_id)
    .fetch_one(db)
    .await?;
    Ok(res.0)
}

pub async fn create_menu(
    tx: &mut Transaction<'_, Postgres>,
    menu: &Menu,
) -> anyhow::Result<Menu> {
    Ok(sqlx::query_as(
        format!(
            r#"INSERT INTO {} (parent_id, name, display_name, icon, url, order_no, is_active, created_date, updated_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(menu.parent_id)
    .bind(&menu.name)
    .bind(&menu.display_name)
    .bind(&menu.icon)
    .bind(&menu.url)
    .bind(menu.order_no)
    .bind(menu.is_active)
    .bind(menu.created_date)
    .bind(menu.updated_date)
    .fetch_one(&mut **tx)
    .await
    .context("insert menu")?)
}

pub async fn update_menu(
    tx: &mut Transaction<'_, Postgres>,
    menu: &Menu,
) -> anyhow::Result<Menu> {
    Ok(sqlx::query_as(
        format!(
            r#"UPDATE {}
            SET parent_id = $1, name = $2, display_name = $3, icon = $4, url = $5,
            order_no = $6, is_active = $7, updated_date = $8
            WHERE id = $9
            RETURNING *"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(menu.parent_id)
    .bind(&menu.name)
    .bind(&menu.display_name)
    .bind(&menu.icon)
    .bind(&menu.url)
    .bind(menu.order_no)
    .bind(menu.is_active)
    .bind(menu.updated_date)
    .bind(menu.id)
    .fetch_one(&mut **tx)
    .await
    .context("update menu")?)
}

pub async fn count_children<'e, E: PgExecutor<'e>>(db: E, id: i64) -> anyhow::Result<i64> {
    let res: (i64,) =
        sqlx::query_as(format!("SELECT COUNT(*) FROM {} WHERE parent_id = $1", TABLE_NAME).as_str())
            .bind(id)
            .fetch_one(db)
            .await?;
    Ok(res.0)
}

/// True when `candidate` is `id` itself or sits somewhere below it.
pub async fn is_descendant_or_self<'e, E: PgExecutor<'e>>(
    db: E,
    id: i64,
    candidate: i64,
) -> anyhow::Result<bool> {
    let res: (bool,) = sqlx::query_as(
        format!(
            r#"WITH RECURSIVE subtree AS (
                SELECT id FROM {table} WHERE id = $1
                UNION
                SELECT c.id FROM {table} c INNER JOIN subtree s ON c.parent_id = s.id
            )
            SELECT EXISTS(SELECT 1 FROM subtree WHERE id = $2)"#,
            table = TABLE_NAME
        )
        .as_str(),
    )
    .bind(id)
    .bind(candidate)
    .fetch_one(db)
    .await?;
    Ok(res.0)
}

/// Menu permissions go with the menu (ON DELETE CASCADE).
pub async fn delete_menu<'e, E: PgExecutor<'e>>(db: E, id: i64) -> anyhow::Result<u64> {
    let res = sqlx::query(format!("DELETE FROM {} WHERE id = $1", TABLE_NAME).as_str())
        .bind(id)
        .execute(db)
        .await
        .context("delete menu")?;
    Ok(res.rows_affected())
}

/// Apply `(id, order_no)` pairs. Returns how many menus were updated.
pub async fn reorder_menus(
    tx: &mut Transaction<'_, Postgres>,
    orders: &[(i64, i32)],
) -> anyhow::Result<u64> {
    let mut updated = 0;
    for (id, order_no) in orders {
        let res = sqlx::query(
            format!(
                "UPDATE {} SET order_no = $1, updated_date = NOW() WHERE id = $2",
                TABLE_NAME
            )
            .as_str(),
        )
        .bind(order_no)
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("reorder menu")?;
        updated += res.rows_affected();
    }
    Ok(updated)
}
