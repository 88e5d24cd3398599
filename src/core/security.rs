use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{Duration, Local};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use poem::Request;
use poem_openapi::{auth::Bearer, SecurityScheme};
use r2d2::PooledConnection;
use redis::{Client, ConnectionLike};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    core::error::AppError, model::user::User, repository::user::get_user_by_id, settings::Config,
    AppState,
};

use super::session::get_session;

/// password hashing
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);

    // Argon2 with default params (Argon2id v19)
    let argon2 = Argon2::default();

    // Hash password to PHC string ($argon2id$v=19$...)
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    Ok(password_hash)
}

/// password hash verification
pub fn verify_hash_password(
    password: &str,
    password_hash: &str,
) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(password_hash)?;
    let verify = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();
    Ok(verify)
}

#[cfg(test)]
mod test_hash_password {
    use super::*;

    #[test]
    fn test_hashing_password() {
        let password = "Secret123";
        let hash = hash_password(password).unwrap();
        assert!(verify_hash_password(password, &hash).unwrap());
        assert!(!verify_hash_password("wrongpassword", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(verify_hash_password("Secret123", "not-a-phc-string").is_err());
    }
}

pub struct Keys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub id: String,
    pub username: String,
    pub role: String,
    pub exp: i64,
}

impl Claims {
    pub fn new(user: &User, config: &Config) -> Self {
        let exp = (Local::now() + Duration::minutes(config.jwt_exp as i64)).timestamp();
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            role: user.role.to_string(),
            exp,
        }
    }
}

/// Generate token
pub fn encode_token(claims: &Claims, jwt_secret: &str) -> anyhow::Result<String> {
    let keys = Keys::new(jwt_secret.as_bytes());
    let token = encode(&Header::default(), &claims, &keys.encoding)?;
    Ok(token)
}

/// Extract payload and Validate token
pub fn decode_token(token: &str, jwt_secret: &str) -> anyhow::Result<Claims> {
    let keys = Keys::new(jwt_secret.as_bytes());
    let token_data = decode::<Claims>(token, &keys.decoding, &Validation::default())?;
    Ok(token_data.claims)
}

pub fn generate_token_from_user(user: &User, config: &Config) -> anyhow::Result<String> {
    encode_token(&Claims::new(user, config), &config.jwt_secret)
}

/// Resolve the caller from a bearer token. The token must still have a
/// redis session and the account must still be active.
pub async fn get_user_from_token<C: ConnectionLike>(
    db: &PgPool,
    redis_conn: &mut C,
    jwt_token: Option<String>,
) -> anyhow::Result<Option<User>> {
    let Some(jwt_token) = jwt_token else {
        return Ok(None);
    };
    let Some(session) = get_session(redis_conn, jwt_token)? else {
        return Ok(None);
    };
    let user_id = Uuid::parse_str(&session.user_id)?;
    let user = get_user_by_id(db, &user_id).await?;
    Ok(user.filter(|user| user.is_active))
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClaimsRefresh {
    pub id: String,
    pub username: String,
    pub exp: i64,
    pub type_key: String,
}

impl ClaimsRefresh {
    pub fn new(user: &User, config: &Config) -> Self {
        let exp = (Local::now() + Duration::minutes(config.jwt_refresh_exp as i64)).timestamp();
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            exp,
            type_key: "refresh".to_string(),
        }
    }
}

/// Generate refresh token
pub fn encode_refresh_token(claims: &ClaimsRefresh, jwt_secret: &str) -> anyhow::Result<String> {
    let keys = Keys::new(jwt_secret.as_bytes());
    let token = encode(&Header::default(), &claims, &keys.encoding)?;
    Ok(token)
}

/// Extract payload and Validate referesh token
pub fn decode_refresh_token(token: &str, jwt_secret: &str) -> anyhow::Result<ClaimsRefresh> {
    let keys = Keys::new(jwt_secret.as_bytes());
    let token_data = decode::<ClaimsRefresh>(token, &keys.decoding, &Validation::default())?;
    if token_data.claims.type_key != "refresh" {
        anyhow::bail!("not a refresh token");
    }
    Ok(token_data.claims)
}

pub fn generate_refresh_token_from_user(user: &User, config: &Config) -> anyhow::Result<String> {
    encode_refresh_token(&ClaimsRefresh::new(user, config), &config.jwt_secret)
}

/// `None` for an invalid or expired refresh token.
pub async fn get_user_from_refresh_token(
    db: &PgPool,
    refresh_token: &str,
    config: &Config,
) -> anyhow::Result<Option<User>> {
    let claims = match decode_refresh_token(refresh_token, &config.jwt_secret) {
        Ok(val) => val,
        Err(_) => return Ok(None),
    };
    let user_id = Uuid::parse_str(&claims.id)?;
    let user = get_user_by_id(db, &user_id).await?;
    Ok(user.filter(|user| user.is_active))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserApiKey {
    pub token: Option<String>,
}

/// ApiKey authorization
#[derive(SecurityScheme)]
#[oai(ty = "bearer", checker = "bearer_checker")]
pub struct BearerAuthorization(pub UserApiKey);

pub async fn bearer_checker(_req: &Request, api_key: Bearer) -> Option<UserApiKey> {
    Some(UserApiKey {
        token: Some(api_key.token),
    })
}

pub fn redis_connection(state: &AppState) -> anyhow::Result<PooledConnection<Client>> {
    state
        .redis_conn
        .get()
        .map_err(|err| anyhow::anyhow!("get redis pool connection: {}", err))
}

/// The authenticated caller, or `Unauthorized`.
pub async fn authenticate(state: &AppState, auth: &BearerAuthorization) -> Result<User, AppError> {
    let mut redis_conn = redis_connection(state)?;
    let user = get_user_from_token(&state.db, &mut redis_conn, auth.0.token.clone()).await?;
    user.ok_or(AppError::Unauthorized)
}

/// The authenticated caller, provided their role holds `permission_name`.
pub async fn authorize(
    state: &AppState,
    auth: &BearerAuthorization,
    permission_name: &str,
) -> Result<User, AppError> {
    let user = authenticate(state, auth).await?;
    state.gate.authorize(user.role, permission_name).await?;
    Ok(user)
}
