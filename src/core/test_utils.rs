use std::sync::Arc;

use chrono::Local;
use fake::{Fake, Faker};
use redis::ConnectionLike;
use sqlx::PgPool;
use uuid::Uuid;

use super::security::{generate_refresh_token_from_user, generate_token_from_user};
use crate::{
    core::{security::hash_password, session::add_session},
    model::{role::Role, user::User},
    repository::user::create_user,
    settings::{get_config, Config},
    AppState,
};

pub fn generate_random<T: fake::Dummy<fake::Faker>>() -> T {
    Faker.fake()
}

/// App state over a test pool, with `/api` as prefix and uploads going to a
/// fresh temp directory.
pub fn test_app_state(pool: PgPool) -> anyhow::Result<(Arc<AppState>, Config)> {
    let mut config = get_config();
    config.prefix = Some("/api".to_string());
    config.upload_dir = std::env::temp_dir()
        .join(format!("employee-uploads-{}", Uuid::now_v7()))
        .to_string_lossy()
        .to_string();
    let client = redis::Client::open(config.redis_url.clone())?;
    let redis_pool = r2d2::Pool::builder().build(client)?;
    let app_state = Arc::new(AppState::new(pool, redis_pool, config.clone()));
    Ok((app_state, config))
}

pub struct TestUser {
    pub user: User,
    pub token: String,
    pub refresh_token: String,
}

pub async fn generate_test_user<C: ConnectionLike>(
    db: &PgPool,
    redis_conn: &mut C,
    config: &Config,
    username: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<TestUser> {
    // Prepare user
    let now = Local::now().fixed_offset();
    let user = User {
        id: Uuid::now_v7(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: hash_password(password).map_err(|err| anyhow::anyhow!(err.to_string()))?,
        full_name: format!("Test {}", username),
        role,
        is_active: true,
        created_date: Some(now),
        updated_date: Some(now),
    };
    create_user(db, &user).await?;

    // Generate token
    let token = generate_token_from_user(&user, config)?;
    let refresh_token = generate_refresh_token_from_user(&user, config)?;
    add_session(
        redis_conn,
        &user,
        config,
        token.clone(),
        refresh_token.clone(),
    )?;

    Ok(TestUser {
        user,
        token,
        refresh_token,
    })
}
