use std::sync::Arc;

use anyhow::Context;
use employee_management::{
    core::db::init_pool, init_openapi_route, settings::get_config, AppState,
};
use poem::listener::TcpListener;
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config();
    let log_level = config.log_level.parse::<Level>().unwrap_or(Level::DEBUG);
    // Logging to File
    let file_appender = tracing_appender::rolling::daily("./logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(log_level)
        .init();

    // Logging to Console
    // tracing_subscriber::fmt().with_max_level(log_level).init();

    tracing::info!(
        "run with config: host={} port={} prefix={:?} upload_dir={}",
        config.host,
        config.port,
        config.prefix,
        config.upload_dir
    );

    // Init Database Connection
    tracing::info!("Init Postgres connection");
    let pool = init_pool(&config).await.context("connect to postgres")?;
    // Init Redis Connection
    tracing::info!("Init Redis connection on {}", config.redis_url);
    let client = redis::Client::open(config.redis_url.clone())?;
    let redis_pool = r2d2::Pool::builder().build(client)?;
    // Init App State
    let app_state = Arc::new(AppState::new(pool, redis_pool, config.clone()));
    let sweeper = app_state.gate.cache().spawn_sweeper();

    let app = init_openapi_route(app_state.clone(), &config);
    tracing::info!("run server on {}:{}", config.host, config.port);
    let res = poem::Server::new(TcpListener::bind(format!(
        "{}:{}",
        config.host, config.port
    )))
    .run_with_graceful_shutdown(
        app,
        async {
            let _ = tokio::signal::ctrl_c().await;
        },
        None,
    )
    .await;
    sweeper.abort();
    tracing::info!("server stopped");
    Ok(res?)
}
