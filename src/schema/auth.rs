use poem_openapi::{payload::Json, Object};
use serde::Deserialize;
use validator::Validate;

use crate::schema::{
    common::{api_responses, DataResponse, MessageResponse},
    user::{validate_password, UserDetail},
};

#[derive(Object, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Object, Deserialize)]
pub struct TokenResponse {
    pub exp: String,
    pub exp_in: i64,
    pub exp_refresh_token: String,
    pub refresh_token: String,
    pub token: String,
    pub token_type: String,
    pub user: UserDetail,
}

api_responses! {
    pub enum LoginResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<TokenResponse>>),
    }
}

#[derive(Object, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

api_responses! {
    pub enum RefreshTokenResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<TokenResponse>>),
    }
}

api_responses! {
    pub enum LogoutResponses {
        #[oai(status = 200)]
        Ok(Json<MessageResponse>),
    }
}

api_responses! {
    pub enum ProfileResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<UserDetail>>),
    }
}

#[derive(Object, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    #[validate(custom(function = "validate_password"))]
    pub new_password: String,
}

api_responses! {
    pub enum ChangePasswordResponses {
        #[oai(status = 200)]
        Ok(Json<MessageResponse>),
    }
}
