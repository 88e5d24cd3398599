use std::sync::Arc;

use anyhow::Context;
use poem::web::Data;
use poem_openapi::{payload::Json, OpenApi, Tags};

use crate::{
    core::error::AppError,
    schema::{common::MessageResponse, health::HealthResponses},
    AppState,
};

#[derive(Tags)]
enum ApiHealthTags {
    Health,
}

pub struct ApiHealth;

#[OpenApi]
impl ApiHealth {
    #[oai(path = "/health", method = "get", tag = "ApiHealthTags::Health")]
    async fn health(&self, state: Data<&Arc<AppState>>) -> HealthResponses {
        match ping(&state).await {
            Ok(()) => HealthResponses::Ok(Json(MessageResponse::ok("Server is running"))),
            Err(err) => err.into(),
        }
    }
}

async fn ping(state: &AppState) -> Result<(), AppError> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .context("ping database")?;
    Ok(())
}
