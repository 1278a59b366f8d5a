use crate::adapters::onebot::{LockedWriter, send_msg};
use crate::command::match_command;
use crate::config::BattlefieldConfig;
use crate::event::Context;
use crate::message::Message;
use crate::plugins::PluginError;
use crate::{error, info};
use chrono::Local;
use futures_util::future::BoxFuture;
use sea_orm::{DatabaseConnection, DbErr};
use serde_json::{Map, Value};
use thiserror::Error;

pub mod api;
pub mod parser;
pub mod render;
pub mod service;

use parser::ParsedQuery;

pub const LANG_CN: &str = "zh-cn";
pub const LANG_TW: &str = "zh-tw";

const STAT_TRIGGERS: &[&str] = &["stat"];
const WEAPONS_TRIGGERS: &[&str] = &["weapons", "武器"];
const VEHICLES_TRIGGERS: &[&str] = &["vehicles", "载具"];
const SERVERS_TRIGGERS: &[&str] = &["servers", "服务器"];
const BIND_TRIGGERS: &[&str] = &["bind", "绑定"];
const INIT_TRIGGERS: &[&str] = &["bf_init"];
const HELP_TRIGGERS: &[&str] = &["bf_help"];

const HELP_TEXT: &str = r#"战地风云插件使用帮助：
1. 账号绑定
命令: /bind [ea_name] 或 /绑定 [ea_name]
参数: ea_name - 您的EA账号名
示例: /bind ExamplePlayer

2. 默认查询设置
命令: /bf_init [游戏代号]
参数: 游戏代号(bf4/bf1/bfv等)
注意: 私聊都能使用，群聊中仅管理员可用

3. 战绩查询
命令: /stat [ea_name],game=[游戏代号]
参数:
  ea_name - EA账号名(可选，已绑定则可不填)
  game - 游戏代号(可选)
示例: /stat ExamplePlayer,game=bf1

4. 武器统计
命令: /weapons [ea_name],game=[游戏代号] 或 /武器 [ea_name],game=[游戏代号]
参数同上

5. 载具统计
命令: /vehicles [ea_name],game=[游戏代号] 或 /载具 [ea_name],game=[游戏代号]
参数同上

6. 服务器查询
命令: /servers [server_name],game=[游戏代号] 或 /服务器 [server_name],game=[游戏代号]
参数:
  server_name - 服务器名称(必填)
  game - 游戏代号(可选)

注: 实际使用时不需要输入[]。/为唤醒词，以实际情况为准"#;

// ================= 错误分类 =================

/// 用户可见的参数错误，Display 即回复文案
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("格式错误，正确格式：[用户名][,game=游戏名]")]
    Format,
    #[error("请先使用bind [ea_name]绑定")]
    Unbound,
}

/// 参数解析失败：要么回复用户，要么作为存储故障上抛
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("数据库操作失败: {0}")]
    Db(#[from] DbErr),
}

// ================= 参数解析 =================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub name: String,
    pub game: String,
    pub lang: &'static str,
}

/// 游戏代号的回落链：显式指定 > 渠道绑定 > 全局默认
async fn resolve_game(
    db: &DatabaseConnection,
    cfg: &BattlefieldConfig,
    explicit: Option<String>,
    channel_id: &str,
) -> Result<String, DbErr> {
    if let Some(game) = explicit {
        return Ok(game);
    }
    Ok(match service::query_channel_setting(db, channel_id).await? {
        Some(setting) => setting.default_game_tag,
        None => cfg.default_game.clone(),
    })
}

/// 解析指令文本并补全缺省参数。
/// 名字缺省时回落到已绑定数据；战地1强制使用繁中。
pub async fn resolve(
    db: &DatabaseConnection,
    cfg: &BattlefieldConfig,
    triggers: &[&str],
    text: &str,
    qq_id: &str,
    channel_id: &str,
) -> Result<ResolvedQuery, ResolveError> {
    let parsed = parser::parse(triggers, text)?;
    resolve_parsed(db, cfg, parsed, qq_id, channel_id).await
}

async fn resolve_parsed(
    db: &DatabaseConnection,
    cfg: &BattlefieldConfig,
    parsed: ParsedQuery,
    qq_id: &str,
    channel_id: &str,
) -> Result<ResolvedQuery, ResolveError> {
    let game = resolve_game(db, cfg, parsed.game, channel_id).await?;

    let name = match parsed.name {
        Some(name) => name,
        None => match service::query_user_binding(db, qq_id).await? {
            Some(binding) => binding.ea_name,
            None => return Err(QueryError::Unbound.into()),
        },
    };

    // 战地1使用繁中
    let lang = if game == "bf1" { LANG_TW } else { LANG_CN };

    Ok(ResolvedQuery { name, game, lang })
}

// ================= 回复工具 =================

struct Reply {
    writer: LockedWriter,
    group_id: Option<i64>,
    user_id: i64,
    message_id: i64,
}

impl Reply {
    async fn text(&self, s: impl Into<String>) -> Result<(), PluginError> {
        let msg = Message::new().reply(self.message_id).text(s);
        send_msg(self.writer.clone(), self.group_id, Some(self.user_id), msg).await
    }

    async fn image(&self, base64_img: &str) -> Result<(), PluginError> {
        let msg = Message::new()
            .reply(self.message_id)
            .image(format!("base64://{}", base64_img));
        send_msg(self.writer.clone(), self.group_id, Some(self.user_id), msg).await
    }
}

fn match_any(prefixes: &[String], text: &str, triggers: &[&str]) -> Option<String> {
    for alias in triggers {
        if let Some(rest) = match_command(prefixes, text, alias) {
            return Some(rest.to_string());
        }
    }
    None
}

// ================= 主入口 =================

pub fn handle(
    ctx: Context,
    writer: LockedWriter,
) -> BoxFuture<'static, Result<Option<Context>, PluginError>> {
    Box::pin(async move {
        let (prefixes, cfg) = {
            let guard = ctx.config.read().unwrap();
            (guard.command_prefix.clone(), guard.battlefield.clone())
        };

        let (text, qq_id, channel_id, group_id, user_id, message_id, is_group, is_admin) = {
            let msg = match ctx.as_message() {
                Some(m) => m,
                None => return Ok(Some(ctx)),
            };
            (
                msg.text().to_string(),
                msg.user_id().to_string(),
                msg.channel_id(),
                msg.group_id(),
                msg.user_id(),
                msg.message_id(),
                msg.is_group(),
                matches!(msg.sender_role(), Some("owner") | Some("admin")),
            )
        };

        let reply = Reply {
            writer,
            group_id,
            user_id,
            message_id,
        };

        if let Some(rest) = match_any(&prefixes, &text, STAT_TRIGGERS) {
            cmd_player_query(&ctx, &reply, &cfg, QueryKind::Stat, &rest, &qq_id, &channel_id)
                .await?;
            return Ok(None);
        }
        if let Some(rest) = match_any(&prefixes, &text, WEAPONS_TRIGGERS) {
            cmd_player_query(&ctx, &reply, &cfg, QueryKind::Weapons, &rest, &qq_id, &channel_id)
                .await?;
            return Ok(None);
        }
        if let Some(rest) = match_any(&prefixes, &text, VEHICLES_TRIGGERS) {
            cmd_player_query(&ctx, &reply, &cfg, QueryKind::Vehicles, &rest, &qq_id, &channel_id)
                .await?;
            return Ok(None);
        }
        if let Some(rest) = match_any(&prefixes, &text, SERVERS_TRIGGERS) {
            cmd_servers(&ctx, &reply, &cfg, &rest, &channel_id).await?;
            return Ok(None);
        }
        if let Some(rest) = match_any(&prefixes, &text, BIND_TRIGGERS) {
            cmd_bind(&ctx, &reply, &cfg, &rest, &qq_id, &channel_id).await?;
            return Ok(None);
        }
        if let Some(rest) = match_any(&prefixes, &text, INIT_TRIGGERS) {
            cmd_bf_init(&ctx, &reply, &rest, &channel_id, is_group, is_admin).await?;
            return Ok(None);
        }
        if match_any(&prefixes, &text, HELP_TRIGGERS).is_some() {
            reply.text(HELP_TEXT).await?;
            return Ok(None);
        }

        Ok(Some(ctx))
    })
}

// ================= 指令实现 =================

#[derive(Debug, Clone, Copy)]
enum QueryKind {
    Stat,
    Weapons,
    Vehicles,
}

impl QueryKind {
    fn triggers(&self) -> &'static [&'static str] {
        match self {
            QueryKind::Stat => STAT_TRIGGERS,
            QueryKind::Weapons => WEAPONS_TRIGGERS,
            QueryKind::Vehicles => VEHICLES_TRIGGERS,
        }
    }

    fn prop(&self) -> &'static str {
        match self {
            QueryKind::Stat => "all",
            QueryKind::Weapons => "weapons",
            QueryKind::Vehicles => "vehicles",
        }
    }

    fn build_html(&self, d: &Map<String, Value>, game: &str, update_time: &str) -> String {
        match self {
            QueryKind::Stat => render::main_html(d, game, update_time),
            QueryKind::Weapons => render::weapons_html(d, game, update_time),
            QueryKind::Vehicles => render::vehicles_html(d, game, update_time),
        }
    }
}

/// stat / weapons / vehicles 的公共流程：解析参数 → 请求 → 渲染成图回复
async fn cmd_player_query(
    ctx: &Context,
    reply: &Reply,
    cfg: &BattlefieldConfig,
    kind: QueryKind,
    rest: &str,
    qq_id: &str,
    channel_id: &str,
) -> Result<(), PluginError> {
    let query = match resolve(&ctx.db, cfg, kind.triggers(), rest, qq_id, channel_id).await {
        Ok(q) => q,
        Err(ResolveError::Query(e)) => {
            reply.text(e.to_string()).await?;
            return Ok(());
        }
        Err(ResolveError::Db(e)) => return Err(Box::new(e)),
    };

    info!(target: "Battlefield", "玩家id:{}，所查询游戏:{}", query.name, query.game);

    let data = match ctx
        .api
        .get(
            &query.game,
            kind.prop(),
            &[
                ("name", query.name.as_str()),
                ("lang", query.lang),
                ("platform", "pc"),
            ],
        )
        .await
    {
        Ok(d) => d,
        Err(e) => {
            reply.text(e.to_string()).await?;
            return Ok(());
        }
    };

    if !data.is_ok() {
        reply.text(data.first_error()).await?;
        return Ok(());
    }

    let update_time = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let html = kind.build_html(&data.fields, &query.game, &update_time);
    let base64_img = render::capture(&html, cfg.img_quality, None).await?;
    reply.image(&base64_img).await
}

/// 服务器查询：名称必填，按服务器数量决定截图高度
async fn cmd_servers(
    ctx: &Context,
    reply: &Reply,
    cfg: &BattlefieldConfig,
    rest: &str,
    channel_id: &str,
) -> Result<(), PluginError> {
    let parsed = match parser::parse(SERVERS_TRIGGERS, rest) {
        Ok(p) => p,
        Err(e) => {
            reply.text(e.to_string()).await?;
            return Ok(());
        }
    };

    let Some(server_name) = parsed.name else {
        reply.text("不能查所有哦~").await?;
        return Ok(());
    };

    let game = resolve_game(&ctx.db, cfg, parsed.game, channel_id)
        .await
        .map_err(Box::new)?;
    let lang = if game == "bf1" { LANG_TW } else { LANG_CN };

    info!(target: "Battlefield", "查询服务器:{}，所查询游戏:{}", server_name, game);

    let data = match ctx
        .api
        .get(
            &game,
            "servers",
            &[
                ("name", server_name.as_str()),
                ("lang", lang),
                ("platform", "pc"),
                ("region", "all"),
                ("limit", "30"),
            ],
        )
        .await
    {
        Ok(d) => d,
        Err(e) => {
            reply.text(e.to_string()).await?;
            return Ok(());
        }
    };

    if !data.is_ok() {
        reply.text(data.first_error()).await?;
        return Ok(());
    }

    let server_count = data
        .fields
        .get("servers")
        .and_then(Value::as_array)
        .map(|a| a.len())
        .unwrap_or(0);
    if server_count == 0 {
        reply.text("暂无数据").await?;
        return Ok(());
    }

    // 数据量较少时用固定高度，避免整页留白
    let height_hint = match server_count {
        1 => Some(450),
        2 => Some(620),
        _ => None,
    };

    let update_time = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let html = render::servers_html(&data.fields, &game, &update_time);
    let base64_img = render::capture(&html, cfg.img_quality, height_hint).await?;
    reply.image(&base64_img).await
}

/// 绑定：先到默认游戏的 stats 接口校验账号存在，再持久化
async fn cmd_bind(
    ctx: &Context,
    reply: &Reply,
    cfg: &BattlefieldConfig,
    rest: &str,
    qq_id: &str,
    channel_id: &str,
) -> Result<(), PluginError> {
    let query = match resolve(&ctx.db, cfg, BIND_TRIGGERS, rest, qq_id, channel_id).await {
        Ok(q) => q,
        Err(ResolveError::Query(e)) => {
            reply.text(e.to_string()).await?;
            return Ok(());
        }
        Err(ResolveError::Db(e)) => return Err(Box::new(e)),
    };

    let data = match ctx
        .api
        .get(
            &cfg.default_game,
            "stats",
            &[
                ("name", query.name.as_str()),
                ("lang", LANG_CN),
                ("platform", "pc"),
            ],
        )
        .await
    {
        Ok(d) => d,
        Err(e) => {
            reply.text(e.to_string()).await?;
            return Ok(());
        }
    };

    if !data.is_ok() {
        reply.text(data.first_error()).await?;
        return Ok(());
    }

    let ea_id = match data.fields.get("userId") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => {
            error!(target: "Battlefield", "stats 接口未返回 userId: {}", query.name);
            reply.text("绑定失败：接口未返回用户ID").await?;
            return Ok(());
        }
    };
    info!(target: "Battlefield", "已查询到{}的ea_id：{}", query.name, ea_id);

    let msg = service::upsert_user_binding(&ctx.db, qq_id, &query.name, &ea_id)
        .await
        .map_err(Box::new)?;
    reply.text(msg).await
}

/// 渠道默认游戏设置：群聊仅管理员可用
async fn cmd_bf_init(
    ctx: &Context,
    reply: &Reply,
    rest: &str,
    channel_id: &str,
    is_group: bool,
    is_admin: bool,
) -> Result<(), PluginError> {
    if is_group && !is_admin {
        reply
            .text("没有权限哦，群聊只能机器人管理员使用[bf_init]命令呢")
            .await?;
        return Ok(());
    }

    let parsed = match parser::parse(INIT_TRIGGERS, rest) {
        Ok(p) => p,
        Err(e) => {
            reply.text(e.to_string()).await?;
            return Ok(());
        }
    };

    let Some(game_tag) = parsed.name else {
        reply.text("不能设置空哦~").await?;
        return Ok(());
    };

    let msg = service::upsert_channel_setting(&ctx.db, channel_id, &game_tag)
        .await
        .map_err(Box::new)?;
    reply.text(msg).await
}
