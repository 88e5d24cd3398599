use std::sync::Arc;

use chrono::{Duration, Local};
use poem::web::Data;
use poem_openapi::{payload::Json, OpenApi, Tags};
use redis::ConnectionLike;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    core::{
        error::AppError,
        security::{
            authenticate, generate_refresh_token_from_user, generate_token_from_user,
            get_user_from_refresh_token, hash_password, redis_connection, verify_hash_password,
            BearerAuthorization,
        },
        session::{add_session, remove_session},
        utils::datetime_to_string,
    },
    model::user::User,
    repository::user::{get_user_by_username, update_user},
    schema::{
        auth::{
            ChangePasswordRequest, ChangePasswordResponses, LoginRequest, LoginResponses,
            LogoutResponses, ProfileResponses, RefreshTokenRequest, RefreshTokenResponses,
            TokenResponse,
        },
        common::{DataResponse, MessageResponse},
    },
    settings::Config,
    AppState,
};

#[derive(Tags)]
enum ApiAuthTags {
    Auth,
}

pub struct ApiAuth;

#[OpenApi]
impl ApiAuth {
    #[oai(path = "/auth/login", method = "post", tag = "ApiAuthTags::Auth")]
    async fn auth_login(
        &self,
        json: Json<LoginRequest>,
        state: Data<&Arc<AppState>>,
    ) -> LoginResponses {
        match login(&state, &json).await {
            Ok(data) => LoginResponses::Ok(Json(DataResponse::new("Login successful", data))),
            Err(err) => err.into(),
        }
    }

    #[oai(
        path = "/auth/refresh-token",
        method = "post",
        tag = "ApiAuthTags::Auth"
    )]
    async fn auth_refresh_token(
        &self,
        json: Json<RefreshTokenRequest>,
        state: Data<&Arc<AppState>>,
    ) -> RefreshTokenResponses {
        match refresh_token(&state, &json).await {
            Ok(data) => RefreshTokenResponses::Ok(Json(DataResponse::new(
                "Token refreshed successfully",
                data,
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/auth/logout", method = "post", tag = "ApiAuthTags::Auth")]
    async fn auth_logout(
        &self,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> LogoutResponses {
        match logout(&state, &auth).await {
            Ok(()) => LogoutResponses::Ok(Json(MessageResponse::ok("Logout successful"))),
            Err(err) => err.into(),
        }
    }

    #[oai(path = "/auth/profile", method = "get", tag = "ApiAuthTags::Auth")]
    async fn auth_profile(
        &self,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> ProfileResponses {
        match authenticate(&state, &auth).await {
            Ok(user) => ProfileResponses::Ok(Json(DataResponse::new(
                "Profile retrieved successfully",
                user.into(),
            ))),
            Err(err) => err.into(),
        }
    }

    #[oai(
        path = "/auth/change-password",
        method = "put",
        tag = "ApiAuthTags::Auth"
    )]
    async fn auth_change_password(
        &self,
        json: Json<ChangePasswordRequest>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> ChangePasswordResponses {
        match change_password(&state, &auth, &json).await {
            Ok(()) => ChangePasswordResponses::Ok(Json(MessageResponse::ok(
                "Password changed successfully",
            ))),
            Err(err) => err.into(),
        }
    }
}

/// A malformed stored hash counts as a wrong password.
fn password_matches(user: &User, password: &str) -> bool {
    verify_hash_password(password, &user.password).unwrap_or_else(|err| {
        warn!("unreadable password hash for user {}: {}", user.id, err);
        false
    })
}

/// Issue an access and refresh token pair and open a session for them.
fn issue_tokens<C: ConnectionLike>(
    redis_conn: &mut C,
    user: User,
    config: &Config,
) -> anyhow::Result<TokenResponse> {
    let token = generate_token_from_user(&user, config)?;
    let refresh_token = generate_refresh_token_from_user(&user, config)?;
    add_session(
        redis_conn,
        &user,
        config,
        token.clone(),
        refresh_token.clone(),
    )?;
    let now = Local::now();
    let exp = now + Duration::minutes(config.jwt_exp as i64);
    let exp_refresh_token = now + Duration::minutes(config.jwt_refresh_exp as i64);
    Ok(TokenResponse {
        exp: datetime_to_string(exp.fixed_offset()),
        exp_in: config.jwt_exp as i64 * 60,
        exp_refresh_token: datetime_to_string(exp_refresh_token.fixed_offset()),
        refresh_token,
        token,
        token_type: "Bearer".to_string(),
        user: user.into(),
    })
}

async fn login(state: &AppState, req: &LoginRequest) -> Result<TokenResponse, AppError> {
    let user = get_user_by_username(&state.db, req.username.trim())
        .await?
        .filter(|user| user.is_active)
        .ok_or(AppError::InvalidCredentials)?;
    if !password_matches(&user, &req.password) {
        return Err(AppError::InvalidCredentials);
    }
    let mut redis_conn = redis_connection(state)?;
    info!("user {} logged in", user.username);
    Ok(issue_tokens(&mut redis_conn, user, &state.config)?)
}

async fn refresh_token(
    state: &AppState,
    req: &RefreshTokenRequest,
) -> Result<TokenResponse, AppError> {
    let user = get_user_from_refresh_token(&state.db, &req.refresh_token, &state.config)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let mut redis_conn = redis_connection(state)?;
    Ok(issue_tokens(&mut redis_conn, user, &state.config)?)
}

async fn logout(state: &AppState, auth: &BearerAuthorization) -> Result<(), AppError> {
    authenticate(state, auth).await?;
    let token = auth.0.token.clone().ok_or(AppError::Unauthorized)?;
    let mut redis_conn = redis_connection(state)?;
    if !remove_session(&mut redis_conn, token)? {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

async fn change_password(
    state: &AppState,
    auth: &BearerAuthorization,
    req: &ChangePasswordRequest,
) -> Result<(), AppError> {
    let user = authenticate(state, auth).await?;
    req.validate()?;
    if !password_matches(&user, &req.current_password) {
        return Err(AppError::validation(
            "current_password",
            "Current password is incorrect",
        ));
    }
    let password = hash_password(&req.new_password)
        .map_err(|err| anyhow::anyhow!("hash password: {}", err))?;
    update_user(
        &state.db,
        &User {
            password,
            updated_date: Some(Local::now().fixed_offset()),
            ..user
        },
    )
    .await?;
    Ok(())
}
