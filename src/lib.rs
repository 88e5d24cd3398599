use std::{sync::Arc, time::Duration};

use poem::{
    endpoint::StaticFilesEndpoint,
    middleware::{AddData, AddDataEndpoint, Cors, CorsEndpoint},
    EndpointExt, Route,
};
use poem_openapi::OpenApiService;
use r2d2::Pool as r2d2Pool;
use redis::Client;
use route::{
    auth::ApiAuth, employee::ApiEmployee, health::ApiHealth, menu::ApiMenu,
    permission::ApiPermission, user::ApiUser,
};
use settings::Config;
use sqlx::{Pool, Postgres};

use crate::core::{
    permission_cache::PermissionCache,
    permission_gate::{PermissionGate, PgPermissionSource},
    photo_storage::PhotoStorage,
    upload_limit::{UploadLimit, UploadLimitEndpoint},
};

pub mod cli;
pub mod core;
pub mod factory;
pub mod model;
pub mod repository;
pub mod route;
pub mod schema;
pub mod settings;

pub struct AppState {
    pub db: Pool<Postgres>,
    pub redis_conn: r2d2Pool<Client>,
    pub gate: Arc<PermissionGate>,
    pub photos: PhotoStorage,
    pub config: Config,
}

impl AppState {
    pub fn new(db: Pool<Postgres>, redis_conn: r2d2Pool<Client>, config: Config) -> Self {
        // tokio intervals reject a zero period
        let ttl = Duration::from_secs(config.permission_cache_ttl_secs.max(1));
        let cache = Arc::new(PermissionCache::new(ttl));
        let source = Arc::new(PgPermissionSource::new(db.clone()));
        Self {
            gate: Arc::new(PermissionGate::new(source, cache)),
            photos: PhotoStorage::from_config(&config),
            db,
            redis_conn,
            config,
        }
    }
}

pub fn init_openapi_route(
    app_state: Arc<AppState>,
    config: &Config,
) -> CorsEndpoint<AddDataEndpoint<UploadLimitEndpoint<Route>, Arc<AppState>>> {
    let prefix = config.prefix.clone().unwrap_or("/api".to_string());
    let openapi_route = OpenApiService::new(
        (
            ApiHealth,
            ApiAuth,
            ApiPermission,
            ApiMenu,
            ApiUser,
            ApiEmployee,
        ),
        "Employee Management",
        "1.0",
    )
    .server(prefix.clone());
    let openapi_json_endpoint = openapi_route.spec_endpoint();
    let ui = openapi_route.swagger_ui();
    Route::new()
        .nest(prefix, openapi_route)
        .nest("/docs", ui)
        .nest("/uploads", StaticFilesEndpoint::new(&config.upload_dir))
        .at("openapi.json", openapi_json_endpoint)
        .with(UploadLimit::new(config.max_upload_size))
        .with(AddData::new(app_state))
        .with(Cors::new())
}
