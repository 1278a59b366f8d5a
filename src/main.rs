mod adapters;
mod command;
mod config;
mod db;
mod event;
mod log;
mod message;
mod plugins;

use plugins::battlefield::api::ApiClient;
use std::sync::{Arc, RwLock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crate::info!(target: "System", "bftool 启动中...");

    let app_config = config::load_or_create("config.toml").await?;
    plugins::announce(&app_config);

    let bot_config = app_config.bot.clone();
    let timeout_secs = app_config.battlefield.timeout_secs;
    let config = Arc::new(RwLock::new(app_config));

    let database = db::init().await?;
    let api = Arc::new(ApiClient::new(timeout_secs)?);

    if !bot_config.enabled {
        crate::warn!(target: "System", "未启用 Bot 连接，请编辑 config.toml 后重启");
        database.close().await?;
        return Ok(());
    }

    tokio::select! {
        _ = adapters::onebot::run_bot_loop(
            bot_config,
            config.clone(),
            database.clone(),
            api.clone(),
        ) => {}
        _ = tokio::signal::ctrl_c() => {
            crate::info!(target: "System", "收到退出信号，正在关闭...");
        }
    }

    // 共享资源在此统一释放：数据库连接显式关闭，HTTP 客户端随 Arc 析构
    database.close().await?;
    Ok(())
}
