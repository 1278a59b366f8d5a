use anyhow::{Result, anyhow};
use cdp_html_shot::{Browser, CaptureOptions, ImageFormat, Viewport};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::time;

// 各代的 banner / logo / 默认头像，均为固定图床资源
const BF3_BANNER: &str = "https://s21.ax1x.com/2025/07/16/pV1jG5t.jpg";
const BF4_BANNER: &str = "https://s21.ax1x.com/2025/07/16/pV1XV1S.jpg";
const BF1_BANNER: &str = "https://s1.ax1x.com/2022/12/15/zoMaxe.jpg";
const BFV_BANNER: &str = "https://s1.ax1x.com/2022/12/14/z54oIs.jpg";

const BF3_LOGO: &str = "https://s21.ax1x.com/2025/07/19/pV3I9ET.png";
const BF4_LOGO: &str = "https://s21.ax1x.com/2025/07/19/pV3IRaT.png";
const BF1_LOGO: &str = "https://s21.ax1x.com/2025/07/19/pV35O3j.png";
const BFV_LOGO: &str = "https://s21.ax1x.com/2025/07/19/pV35LCQ.png";

pub const DEFAULT_AVATAR: &str = "https://s21.ax1x.com/2025/07/16/pV1Ox6e.jpg";

// 渲染宽度与原模板一致
pub const RENDER_WIDTH: u32 = 700;
const MAX_RENDER_HEIGHT: u32 = 10000;

fn banner(game: &str) -> &'static str {
    match game {
        "bf3" => BF3_BANNER,
        "bf4" => BF4_BANNER,
        "bf1" => BF1_BANNER,
        _ => BFV_BANNER,
    }
}

fn logo(game: &str) -> &'static str {
    match game {
        "bf3" => BF3_LOGO,
        "bf4" => BF4_LOGO,
        "bf1" => BF1_LOGO,
        _ => BFV_LOGO,
    }
}

// ================= 数据整理 =================

fn num(d: &Map<String, Value>, key: &str) -> f64 {
    d.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn display(d: &Map<String, Value>, key: &str) -> String {
    match d.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "-".to_string(),
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn object_list(d: &Map<String, Value>, key: &str) -> Vec<Map<String, Value>> {
    d.get(key)
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_object).cloned().collect())
        .unwrap_or_default()
}

fn prepare_usage_list(
    mut list: Vec<Map<String, Value>>,
    limit: usize,
    time_key: &str,
    hours_key: &str,
) -> Vec<Map<String, Value>> {
    list.sort_by(|a, b| {
        num(b, "kills")
            .partial_cmp(&num(a, "kills"))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    // 与原实现一致：先截断再过滤
    list.truncate(limit);
    list.retain(|e| num(e, time_key) > 0.0 && num(e, "kills") > 0.0);
    for e in &mut list {
        let hours = round2(num(e, time_key) / 3600.0);
        e.insert(hours_key.to_string(), Value::from(hours));
    }
    list
}

/// 提取武器数据：按击杀降序、截断、剔除零使用，附加使用小时数
pub fn prepare_weapons(d: &Map<String, Value>, limit: usize) -> Vec<Map<String, Value>> {
    prepare_usage_list(object_list(d, "weapons"), limit, "timeEquipped", "__timeEquippedHours")
}

/// 提取载具数据，同武器
pub fn prepare_vehicles(d: &Map<String, Value>, limit: usize) -> Vec<Map<String, Value>> {
    prepare_usage_list(object_list(d, "vehicles"), limit, "timeIn", "__timeInHour")
}

// ================= HTML 构建 =================

const CSS: &str = r#"
 *{box-sizing:border-box;margin:0;padding:0}
 body{font-family:-apple-system,BlinkMacSystemFont,"Segoe UI","PingFang SC","Hiragino Sans GB","Microsoft YaHei",Helvetica,Arial,sans-serif;background:#14171c;color:#e8e8e8;width:700px}
 .bf-card{width:700px;background:#14171c}
 .banner{position:relative;height:220px;background-size:cover;background-position:center;display:flex;align-items:flex-end;padding:16px}
 .banner::after{content:"";position:absolute;inset:0;background:linear-gradient(transparent 30%,rgba(20,23,28,.95))}
 .banner>*{position:relative;z-index:1}
 .avatar{width:72px;height:72px;border-radius:8px;border:2px solid rgba(255,255,255,.6);margin-right:14px}
 .game-logo{position:absolute;top:14px;right:16px;height:48px;z-index:1}
 .player .name{font-size:26px;font-weight:700;text-shadow:0 1px 4px rgba(0,0,0,.8)}
 .player .sub{font-size:12px;color:#b8bcc4;margin-top:4px}
 .grid{display:grid;grid-template-columns:repeat(5,1fr);gap:1px;background:#20242b;margin:0}
 .cell{background:#181c22;padding:14px 8px;text-align:center}
 .cell .v{font-size:18px;font-weight:600}
 .cell .k{font-size:11px;color:#8a8f98;margin-top:4px}
 .section{padding:14px 16px 6px;font-size:14px;font-weight:600;color:#c9ced6;border-left:3px solid #5a8dd6;margin:10px 0 4px 16px;padding:2px 8px}
 .item{display:flex;align-items:center;background:#181c22;margin:6px 16px;border-radius:6px;padding:8px 12px}
 .item-img{height:40px;max-width:120px;object-fit:contain;margin-right:12px}
 .item-body{flex:1;min-width:0}
 .item-name{font-size:14px;font-weight:600;white-space:nowrap;overflow:hidden;text-overflow:ellipsis}
 .item-stats{font-size:12px;color:#8a8f98;margin-top:4px}
 .server{background:#181c22;margin:6px 16px;border-radius:6px;padding:10px 12px}
 .server-name{font-size:14px;font-weight:600}
 .server-meta{font-size:12px;color:#8a8f98;margin-top:4px}
 .server-players{font-size:13px;color:#9fd66a;margin-top:4px}
 .footer{padding:12px 16px;font-size:11px;color:#6b7079;text-align:right}
 .empty{margin:6px 16px 12px;padding:10px;font-size:12px;color:#8a8f98}
"#;

fn page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><meta charset="utf-8"><style>{}</style></head><body><div class="bf-card">{}</div></body></html>"#,
        CSS, body
    )
}

fn header(d: &Map<String, Value>, game: &str, update_time: &str) -> String {
    let avatar = d
        .get("avatar")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_AVATAR);
    format!(
        r#"<div class="banner" style="background-image:url('{}')"><img class="avatar" src="{}"/><div class="player"><div class="name">{}</div><div class="sub">{} · 更新于 {}</div></div></div>"#,
        banner(game),
        avatar,
        display(d, "userName"),
        game,
        update_time
    )
}

fn cell(label: &str, value: &str) -> String {
    format!(
        r#"<div class="cell"><div class="v">{}</div><div class="k">{}</div></div>"#,
        value, label
    )
}

fn weapon_cards(list: &[Map<String, Value>]) -> String {
    let mut out = String::new();
    for w in list {
        out.push_str(&format!(
            r#"<div class="item"><img class="item-img" src="{}"/><div class="item-body"><div class="item-name">{}</div><div class="item-stats">击杀 {} · KPM {} · 命中率 {} · 爆头率 {} · {}h</div></div></div>"#,
            display(w, "image"),
            display(w, "weaponName"),
            display(w, "kills"),
            display(w, "killsPerMinute"),
            display(w, "accuracy"),
            display(w, "headshots"),
            display(w, "__timeEquippedHours"),
        ));
    }
    out
}

fn vehicle_cards(list: &[Map<String, Value>]) -> String {
    let mut out = String::new();
    for v in list {
        out.push_str(&format!(
            r#"<div class="item"><img class="item-img" src="{}"/><div class="item-body"><div class="item-name">{}</div><div class="item-stats">击杀 {} · KPM {} · 摧毁 {} · {}h</div></div></div>"#,
            display(v, "image"),
            display(v, "vehicleName"),
            display(v, "kills"),
            display(v, "killsPerMinute"),
            display(v, "destroyed"),
            display(v, "__timeInHour"),
        ));
    }
    out
}

/// 战绩总览
pub fn main_html(d: &Map<String, Value>, game: &str, update_time: &str) -> String {
    let hours_played = round2(num(d, "secondsPlayed") / 3600.0);

    let mut grid = String::new();
    grid.push_str(&cell("等级", &display(d, "rank")));
    grid.push_str(&cell("击杀", &display(d, "kills")));
    grid.push_str(&cell("死亡", &display(d, "deaths")));
    grid.push_str(&cell("K/D", &display(d, "killDeath")));
    grid.push_str(&cell("胜率", &display(d, "winPercent")));
    grid.push_str(&cell("KPM", &display(d, "killsPerMinute")));
    grid.push_str(&cell("SPM", &display(d, "scorePerMinute")));
    grid.push_str(&cell("命中率", &display(d, "accuracy")));
    grid.push_str(&cell("爆头数", &display(d, "headshots")));
    grid.push_str(&cell("时长", &format!("{}h", hours_played)));

    let weapon_data = prepare_weapons(d, 5);
    let vehicle_data = prepare_vehicles(d, 5);

    let mut body = header(d, game, update_time);
    body.push_str(&format!(r#"<div class="grid">{}</div>"#, grid));
    if !weapon_data.is_empty() {
        body.push_str(r#"<div class="section">常用武器</div>"#);
        body.push_str(&weapon_cards(&weapon_data));
    }
    if !vehicle_data.is_empty() {
        body.push_str(r#"<div class="section">常用载具</div>"#);
        body.push_str(&vehicle_cards(&vehicle_data));
    }
    body.push_str(&format!(r#"<div class="footer">数据来源 gametools.network · {}</div>"#, update_time));
    page(&body)
}

/// 武器统计
pub fn weapons_html(d: &Map<String, Value>, game: &str, update_time: &str) -> String {
    let weapon_data = prepare_weapons(d, 50);

    let mut body = header(d, game, update_time);
    body.push_str(r#"<div class="section">武器统计</div>"#);
    if weapon_data.is_empty() {
        body.push_str(r#"<div class="empty">暂无武器数据</div>"#);
    } else {
        body.push_str(&weapon_cards(&weapon_data));
    }
    body.push_str(&format!(r#"<div class="footer">数据来源 gametools.network · {}</div>"#, update_time));
    page(&body)
}

/// 载具统计
pub fn vehicles_html(d: &Map<String, Value>, game: &str, update_time: &str) -> String {
    let vehicle_data = prepare_vehicles(d, 50);

    let mut body = header(d, game, update_time);
    body.push_str(r#"<div class="section">载具统计</div>"#);
    if vehicle_data.is_empty() {
        body.push_str(r#"<div class="empty">暂无载具数据</div>"#);
    } else {
        body.push_str(&vehicle_cards(&vehicle_data));
    }
    body.push_str(&format!(r#"<div class="footer">数据来源 gametools.network · {}</div>"#, update_time));
    page(&body)
}

/// 服务器列表
pub fn servers_html(d: &Map<String, Value>, game: &str, update_time: &str) -> String {
    let servers = object_list(d, "servers");

    let mut cards = String::new();
    for s in &servers {
        cards.push_str(&format!(
            r#"<div class="server"><div class="server-name">{}</div><div class="server-meta">{} · {} · {}</div><div class="server-players">{}/{}（排队 {}）</div></div>"#,
            display(s, "prefix"),
            display(s, "currentMap"),
            display(s, "mode"),
            display(s, "region"),
            display(s, "playerAmount"),
            display(s, "maxPlayers"),
            display(s, "inQue"),
        ));
    }

    let body = format!(
        r#"<div class="banner" style="background-image:url('{}')"><img class="game-logo" src="{}"/><div class="player"><div class="name">服务器查询</div><div class="sub">{} · 更新于 {}</div></div></div>{}<div class="footer">数据来源 gametools.network · {}</div>"#,
        banner(game),
        logo(game),
        game,
        update_time,
        cards,
        update_time
    );
    page(&body)
}

// ================= 图片捕获 =================

/// 将 HTML 文档交给无头浏览器栅格化，返回 Base64 图片数据。
/// `height_hint` 指定时跳过页面高度测量。
pub async fn capture(html: &str, quality: u8, height_hint: Option<u32>) -> Result<String> {
    let browser = Browser::instance().await;
    let tab = browser.new_tab().await?;

    tab.set_viewport(&Viewport::new(RENDER_WIDTH, 800)).await?;
    tab.set_content(html).await?;

    // 等待远程图片资源加载
    time::sleep(Duration::from_millis(300)).await;

    let height = match height_hint {
        Some(h) => h,
        None => {
            let height_js =
                "Math.max(document.body.scrollHeight, document.documentElement.scrollHeight)";
            tab.evaluate(height_js).await?.as_f64().unwrap_or(800.0) as u32
        }
    };
    let final_height = height.clamp(100, MAX_RENDER_HEIGHT);

    let viewport = Viewport::new(RENDER_WIDTH, final_height);
    tab.set_viewport(&viewport).await?;

    let format = if quality >= 100 {
        ImageFormat::Png
    } else {
        ImageFormat::Jpeg
    };
    let opts = CaptureOptions::new()
        .with_viewport(viewport)
        .with_format(format)
        .with_quality(quality)
        .with_full_page(true);

    let base64_data = tab.screenshot(opts).await;
    let _ = tab.close().await;

    base64_data.map_err(|e| anyhow!("Screenshot failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(entries: &[(i64, i64)]) -> Map<String, Value> {
        let weapons: Vec<Value> = entries
            .iter()
            .enumerate()
            .map(|(i, (kills, time))| {
                json!({
                    "weaponName": format!("W{}", i),
                    "kills": kills,
                    "timeEquipped": time,
                })
            })
            .collect();
        let mut d = Map::new();
        d.insert("weapons".to_string(), Value::from(weapons));
        d
    }

    #[test]
    fn filters_out_zero_usage_entries() {
        let d = payload(&[(0, 100), (5, 200), (3, 0)]);
        let prepared = prepare_weapons(&d, 50);
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0]["kills"], json!(5));
    }

    #[test]
    fn sorts_descending_by_kills() {
        let d = payload(&[(3, 100), (9, 100), (5, 100)]);
        let prepared = prepare_weapons(&d, 50);
        let kills: Vec<i64> = prepared.iter().map(|w| w["kills"].as_i64().unwrap()).collect();
        assert_eq!(kills, vec![9, 5, 3]);
    }

    #[test]
    fn filter_runs_after_truncation() {
        // 排序后截断到 1 条，剩下的恰好是零使用条目 → 结果为空
        let d = payload(&[(9, 0), (5, 100)]);
        let prepared = prepare_weapons(&d, 1);
        assert!(prepared.is_empty());
    }

    #[test]
    fn attaches_rounded_hours() {
        let d = payload(&[(5, 5400)]);
        let prepared = prepare_weapons(&d, 50);
        assert_eq!(prepared[0]["__timeEquippedHours"], json!(1.5));

        let d = payload(&[(5, 200)]);
        let prepared = prepare_weapons(&d, 50);
        assert_eq!(prepared[0]["__timeEquippedHours"], json!(0.06));
    }

    #[test]
    fn vehicles_use_time_in_field() {
        let mut d = Map::new();
        d.insert(
            "vehicles".to_string(),
            json!([{"vehicleName": "Tank", "kills": 10, "timeIn": 7200}]),
        );
        let prepared = prepare_vehicles(&d, 50);
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0]["__timeInHour"], json!(2.0));
    }

    #[test]
    fn main_html_falls_back_to_default_avatar() {
        let mut d = Map::new();
        d.insert("userName".to_string(), json!("Alice"));
        d.insert("secondsPlayed".to_string(), json!(7200));
        let html = main_html(&d, "bfv", "2025-01-01 00:00:00");
        assert!(html.contains(DEFAULT_AVATAR));
        assert!(html.contains("Alice"));
        assert!(html.contains(BFV_BANNER));
        assert!(html.contains("2h"));
    }

    #[test]
    fn main_html_keeps_payload_avatar() {
        let mut d = Map::new();
        d.insert("userName".to_string(), json!("Alice"));
        d.insert("avatar".to_string(), json!("https://example.com/a.png"));
        let html = main_html(&d, "bf1", "2025-01-01 00:00:00");
        assert!(html.contains("https://example.com/a.png"));
        assert!(!html.contains(DEFAULT_AVATAR));
        assert!(html.contains(BF1_BANNER));
    }

    #[test]
    fn servers_html_lists_entries() {
        let mut d = Map::new();
        d.insert(
            "servers".to_string(),
            json!([{
                "prefix": "Lux Server",
                "currentMap": "Rotterdam",
                "mode": "Conquest",
                "region": "asia",
                "playerAmount": 60,
                "maxPlayers": 64,
                "inQue": 3
            }]),
        );
        let html = servers_html(&d, "bfv", "2025-01-01 00:00:00");
        assert!(html.contains("Lux Server"));
        assert!(html.contains("60/64"));
        assert!(html.contains(BFV_LOGO));
    }
}
