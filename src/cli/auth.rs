use anyhow::Context;
use chrono::Local;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::security::hash_password,
    model::{role::Role, user::User},
    repository::user::{create_user as insert_user, find_taken_identity},
    schema::user::UserCreateRequest,
};

/// Create an active account straight in the database. Used to bootstrap the
/// first super admin, so it goes through the same validation as the API.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    password: &str,
    email: &str,
    role: &str,
) -> anyhow::Result<User> {
    let req = UserCreateRequest {
        username: username.trim().to_string(),
        email: email.trim().to_string(),
        password: password.to_string(),
        full_name: username.trim().to_string(),
        role: Some(role.to_string()),
        is_active: Some(true),
    };
    req.validate()?;
    let role: Role = role.parse()?;

    let (username_taken, email_taken) =
        find_taken_identity(pool, Some(&req.username), Some(&req.email), None).await?;
    if username_taken {
        anyhow::bail!("username {} already exists", req.username);
    }
    if email_taken {
        anyhow::bail!("email {} already exists", req.email);
    }

    let now = Local::now().fixed_offset();
    let user = User {
        id: Uuid::now_v7(),
        username: req.username,
        email: req.email,
        password: hash_password(&req.password)
            .map_err(|err| anyhow::anyhow!("hash password: {}", err))?,
        full_name: req.full_name,
        role,
        is_active: true,
        created_date: Some(now),
        updated_date: Some(now),
    };
    insert_user(pool, &user).await.context("insert user")?;
    Ok(user)
}
