use std::process::ExitStatus;

use anyhow::{bail, Context};
use tokio::process::Command;

use crate::settings::Config;

/// Run `sqlx migrate <args>` and fail when the tool exits non-zero.
async fn sqlx_migrate(args: &[&str]) -> anyhow::Result<ExitStatus> {
    let status = Command::new("sqlx")
        .arg("migrate")
        .args(args)
        .status()
        .await
        .context("run sqlx-cli, is it installed?")?;
    if !status.success() {
        bail!("sqlx migrate {} exited with {}", args.join(" "), status);
    }
    Ok(status)
}

pub async fn db_generate(migration_name: &str) -> anyhow::Result<()> {
    sqlx_migrate(&["add", migration_name, "-r"]).await?;
    Ok(())
}

pub async fn db_list(config: &Config) -> anyhow::Result<()> {
    sqlx_migrate(&["info", "-D", &config.database_url]).await?;
    Ok(())
}

pub async fn db_migrate(config: &Config) -> anyhow::Result<()> {
    sqlx_migrate(&["run", "-D", &config.database_url]).await?;
    Ok(())
}

pub async fn db_revert(config: &Config) -> anyhow::Result<()> {
    sqlx_migrate(&["revert", "-D", &config.database_url]).await?;
    Ok(())
}
