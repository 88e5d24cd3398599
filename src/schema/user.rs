use once_cell::sync::Lazy;
use poem_openapi::{payload::Json, Object};
use regex::Regex;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::{
    core::utils::datetime_to_string_opt,
    model::user::User,
    schema::common::{api_responses, DataResponse, MessageResponse, PaginateResponse},
};

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("valid username pattern"));

/// At least one lowercase letter, one uppercase letter and one digit.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if has_lower && has_upper && has_digit {
        Ok(())
    } else {
        Err(ValidationError::new("password").with_message(
            "Password must contain at least one lowercase letter, one uppercase letter, and one number"
                .into(),
        ))
    }
}

#[derive(Object, Deserialize)]
pub struct UserDetail {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
}

impl From<User> for UserDetail {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role.to_string(),
            is_active: user.is_active,
            created_date: datetime_to_string_opt(user.created_date),
            updated_date: datetime_to_string_opt(user.updated_date),
        }
    }
}

#[derive(Object, Deserialize, Validate)]
pub struct UserCreateRequest {
    #[validate(
        length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"),
        regex(
            path = *USERNAME_RE,
            message = "Username can only contain letters, numbers, and underscores"
        )
    )]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[validate(length(min = 3, max = 100, message = "Full name must be between 3 and 100 characters"))]
    pub full_name: String,
    /// One of super_admin, admin, manager, user. Defaults to user.
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Object, Deserialize, Validate)]
pub struct UserUpdateRequest {
    #[validate(
        length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"),
        regex(
            path = *USERNAME_RE,
            message = "Username can only contain letters, numbers, and underscores"
        )
    )]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    #[validate(custom(function = "validate_password"))]
    pub password: Option<String>,
    #[validate(length(min = 3, max = 100, message = "Full name must be between 3 and 100 characters"))]
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

api_responses! {
    pub enum GetPaginateUserResponses {
        #[oai(status = 200)]
        Ok(Json<PaginateResponse<UserDetail>>),
    }
}

api_responses! {
    pub enum UserDetailResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<UserDetail>>),
    }
}

api_responses! {
    pub enum UserCreateResponses {
        #[oai(status = 201)]
        Created(Json<DataResponse<UserDetail>>),
    }
}

api_responses! {
    pub enum UserUpdateResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<UserDetail>>),
    }
}

api_responses! {
    pub enum UserDeleteResponses {
        #[oai(status = 200)]
        Ok(Json<MessageResponse>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(username: &str, password: &str) -> UserCreateRequest {
        UserCreateRequest {
            username: username.to_string(),
            email: "jane@example.com".to_string(),
            password: password.to_string(),
            full_name: "Jane Doe".to_string(),
            role: None,
            is_active: None,
        }
    }

    #[test]
    fn test_password_needs_mixed_case_and_digit() {
        assert!(validate_password("Secret123").is_ok());
        assert!(validate_password("secret123").is_err());
        assert!(validate_password("SECRET123").is_err());
        assert!(validate_password("SecretPass").is_err());
    }

    #[test]
    fn test_create_request_rules() {
        assert!(create_request("jane_doe", "Secret123").validate().is_ok());
        assert!(create_request("jane doe", "Secret123").validate().is_err());
        assert!(create_request("jd", "Secret123").validate().is_err());
        assert!(create_request("jane_doe", "Se1").validate().is_err());
    }

    #[test]
    fn test_update_request_skips_absent_fields() {
        let req = UserUpdateRequest {
            username: None,
            email: None,
            password: None,
            full_name: Some("Jane Roe".to_string()),
            role: None,
            is_active: Some(false),
        };
        assert!(req.validate().is_ok());
    }
}
