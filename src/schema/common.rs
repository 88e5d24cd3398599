use poem_openapi::{
    types::{ParseFromJSON, ToJSON},
    Object,
};
use tracing::error;

use crate::core::{
    error::{AppError, FieldError},
    sqlx_utils::PageRequest,
};

#[derive(Object)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }
}

#[derive(Object)]
pub struct DataResponse<T: ParseFromJSON + ToJSON> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: ParseFromJSON + ToJSON> DataResponse<T> {
    pub fn new(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data,
        }
    }
}

#[derive(Object)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(page: PageRequest, total: u32) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total,
            total_pages: page.total_pages(total),
        }
    }
}

#[derive(Object)]
pub struct PaginateResponse<T: ParseFromJSON + ToJSON> {
    pub success: bool,
    pub message: String,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T: ParseFromJSON + ToJSON> PaginateResponse<T> {
    pub fn new(message: &str, data: Vec<T>, pagination: Pagination) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data,
            pagination,
        }
    }
}

#[derive(Object)]
pub struct BadRequestResponse {
    pub success: bool,
    pub message: String,
    pub errors: Vec<FieldError>,
}

#[derive(Object)]
pub struct UnauthorizedResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Object)]
pub struct ForbiddenResponse {
    pub success: bool,
    pub message: String,
    pub required_permissions: Vec<String>,
}

#[derive(Object)]
pub struct NotFoundResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Object)]
pub struct ConflictResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Object)]
pub struct InternalServerErrorResponse {
    pub success: bool,
    pub message: String,
}

impl Default for InternalServerErrorResponse {
    fn default() -> Self {
        Self {
            success: false,
            message: "Internal server error".to_string(),
        }
    }
}

/// Failure bodies, one per HTTP status.
pub enum ErrorBody {
    BadRequest(BadRequestResponse),
    Unauthorized(UnauthorizedResponse),
    Forbidden(ForbiddenResponse),
    NotFound(NotFoundResponse),
    Conflict(ConflictResponse),
    InternalServerError(InternalServerErrorResponse),
}

impl From<AppError> for ErrorBody {
    fn from(err: AppError) -> Self {
        let message = err.to_string();
        match err {
            AppError::ValidationFailed(errors) => ErrorBody::BadRequest(BadRequestResponse {
                success: false,
                message,
                errors,
            }),
            AppError::InvalidRelationship(_) => ErrorBody::BadRequest(BadRequestResponse {
                success: false,
                message,
                errors: vec![],
            }),
            AppError::Unauthorized | AppError::InvalidCredentials => {
                ErrorBody::Unauthorized(UnauthorizedResponse {
                    success: false,
                    message,
                })
            }
            AppError::Forbidden {
                required_permissions,
            } => ErrorBody::Forbidden(ForbiddenResponse {
                success: false,
                message,
                required_permissions,
            }),
            AppError::NotFound(_) => ErrorBody::NotFound(NotFoundResponse {
                success: false,
                message,
            }),
            AppError::Conflict(_) => ErrorBody::Conflict(ConflictResponse {
                success: false,
                message,
            }),
            AppError::Unexpected(err) => {
                error!("unexpected error: {:#}", err);
                ErrorBody::InternalServerError(InternalServerErrorResponse::default())
            }
        }
    }
}

/// Declare an endpoint's `ApiResponse` enum. The listed success variants are
/// kept and every failure status is appended, together with a
/// `From<AppError>` conversion.
macro_rules! api_responses {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( #[oai($($oai:tt)*)] $variant:ident($ty:ty), )+
        }
    ) => {
        $(#[$meta])*
        #[derive(poem_openapi::ApiResponse)]
        $vis enum $name {
            $( #[oai($($oai)*)] $variant($ty), )+

            #[oai(status = 400)]
            BadRequest(poem_openapi::payload::Json<$crate::schema::common::BadRequestResponse>),

            #[oai(status = 401)]
            Unauthorized(poem_openapi::payload::Json<$crate::schema::common::UnauthorizedResponse>),

            #[oai(status = 403)]
            Forbidden(poem_openapi::payload::Json<$crate::schema::common::ForbiddenResponse>),

            #[oai(status = 404)]
            NotFound(poem_openapi::payload::Json<$crate::schema::common::NotFoundResponse>),

            #[oai(status = 409)]
            Conflict(poem_openapi::payload::Json<$crate::schema::common::ConflictResponse>),

            #[oai(status = 500)]
            InternalServerError(
                poem_openapi::payload::Json<$crate::schema::common::InternalServerErrorResponse>,
            ),
        }

        impl From<$crate::core::error::AppError> for $name {
            fn from(err: $crate::core::error::AppError) -> Self {
                use poem_openapi::payload::Json;
                use $crate::schema::common::ErrorBody;
                match ErrorBody::from(err) {
                    ErrorBody::BadRequest(body) => $name::BadRequest(Json(body)),
                    ErrorBody::Unauthorized(body) => $name::Unauthorized(Json(body)),
                    ErrorBody::Forbidden(body) => $name::Forbidden(Json(body)),
                    ErrorBody::NotFound(body) => $name::NotFound(Json(body)),
                    ErrorBody::Conflict(body) => $name::Conflict(Json(body)),
                    ErrorBody::InternalServerError(body) => {
                        $name::InternalServerError(Json(body))
                    }
                }
            }
        }
    };
}

pub(crate) use api_responses;
