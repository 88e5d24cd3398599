use redis::ConnectionLike;
use serde::{Deserialize, Serialize};

use crate::{model::user::User, settings::Config};

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: String,
    pub refresh_token: String,
}

/// Store the session under the access token. It expires together with the
/// token (`jwt_exp` minutes).
pub fn add_session<C: ConnectionLike>(
    redis_conn: &mut C,
    user: &User,
    config: &Config,
    token: String,
    refresh_token: String,
) -> anyhow::Result<()> {
    let session_data = SessionData {
        user_id: user.id.to_string(),
        refresh_token,
    };
    let session_json = serde_json::to_string(&session_data)?;
    redis::Cmd::set_ex(token, session_json, config.jwt_exp as u64 * 60).exec(redis_conn)?;
    Ok(())
}

pub fn get_session<C: ConnectionLike>(
    redis_conn: &mut C,
    token: String,
) -> anyhow::Result<Option<SessionData>> {
    let res: Option<String> = redis::cmd("get").arg(token).query(redis_conn)?;
    match res {
        Some(res) => Ok(Some(serde_json::from_str(res.as_str())?)),
        None => Ok(None),
    }
}

/// Returns false when there was no session for `token`.
pub fn remove_session<C: ConnectionLike>(
    redis_conn: &mut C,
    token: String,
) -> anyhow::Result<bool> {
    let Some(session_data) = get_session(redis_conn, token.clone())? else {
        return Ok(false);
    };
    redis::cmd("del")
        .arg(session_data.refresh_token)
        .exec(redis_conn)?;
    redis::cmd("del").arg(token).exec(redis_conn)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;
    use crate::{core::test_utils::generate_test_user, model::role::Role, settings::get_config};

    #[sqlx::test]
    async fn test_remove_session(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let config = get_config();
        let client = redis::Client::open(config.redis_url.clone()).unwrap();
        let mut redis_conn = client.get_connection().unwrap();
        let test_user = generate_test_user(
            &pool,
            &mut redis_conn,
            &config,
            "session_user",
            "Password1",
            Role::User,
        )
        .await?;

        // When
        let removed = remove_session(&mut redis_conn, test_user.token.clone())?;
        let removed_again = remove_session(&mut redis_conn, test_user.token.clone())?;

        // Expect
        assert!(removed);
        assert!(!removed_again);
        assert!(get_session(&mut redis_conn, test_user.token)?.is_none());
        Ok(())
    }
}
