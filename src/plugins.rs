use crate::adapters::onebot::LockedWriter;
use crate::config::AppConfig;
use crate::event::Context;
use crate::info;
use futures_util::future::BoxFuture;
use std::sync::OnceLock;

pub mod battlefield;
pub mod logger;

pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

pub type PluginHandler =
    fn(Context, LockedWriter) -> BoxFuture<'static, Result<Option<Context>, PluginError>>;

pub struct Plugin {
    pub name: &'static str,
    pub handler: PluginHandler,
    pub enabled: fn(&AppConfig) -> bool,
}

static PLUGINS: OnceLock<Vec<Plugin>> = OnceLock::new();

/// 获取全局插件列表
pub fn get_plugins() -> &'static [Plugin] {
    PLUGINS.get_or_init(|| {
        vec![
            Plugin {
                name: "logger",
                handler: logger::handle,
                enabled: |cfg| cfg.logger.enabled,
            },
            Plugin {
                name: "battlefield",
                handler: battlefield::handle,
                enabled: |cfg| cfg.battlefield.enabled,
            },
        ]
    })
}

/// 启动时输出插件启用状态
pub fn announce(config: &AppConfig) {
    let plugins = get_plugins();
    let enabled_count = plugins.iter().filter(|p| (p.enabled)(config)).count();

    info!(
        target: "System",
        "正在加载插件系统 (已启用 {}/{})",
        enabled_count,
        plugins.len()
    );

    for plugin in plugins {
        if (plugin.enabled)(config) {
            info!(target: "Plugin", "✅ [{}] 就绪", plugin.name);
        }
    }
}

/// 运行插件流水线：返回 None 的插件消费事件并终止流水线
pub async fn run(mut ctx: Context, writer: LockedWriter) -> Result<(), PluginError> {
    for plugin in get_plugins() {
        let enabled = {
            let guard = ctx.config.read().unwrap();
            (plugin.enabled)(&guard)
        };
        if !enabled {
            continue;
        }

        match (plugin.handler)(ctx, writer.clone()).await? {
            Some(next_ctx) => ctx = next_ctx,
            None => return Ok(()),
        }
    }

    Ok(())
}
