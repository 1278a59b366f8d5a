use regex::Regex;
use std::sync::OnceLock;

use super::QueryError;

// 正则提取用户名和要查询的游戏，逗号兼容全角
static STAT_PATTERN: OnceLock<Regex> = OnceLock::new();

fn pattern() -> &'static Regex {
    STAT_PATTERN
        .get_or_init(|| Regex::new(r"^(\w*)(?:[,，]?game=([\w\-+.]+))?$").expect("Invalid Regex"))
}

/// 指令文本解析结果：目标名与可选的游戏代号
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedQuery {
    pub name: Option<String>,
    pub game: Option<String>,
}

/// 从原始文本中移除全部触发词与空白后，整串匹配提取参数。
///
/// 触发词在文本中出现的任何位置都会被移除（纯子串替换）；
/// 清理后的空串是合法输入，表示"无名字、无游戏"。
pub fn parse(triggers: &[&str], raw: &str) -> Result<ParsedQuery, QueryError> {
    let mut cleaned = raw.to_string();
    for trigger in triggers {
        cleaned = cleaned.replace(trigger, "");
    }
    cleaned.retain(|c| !c.is_whitespace());

    let caps = pattern().captures(&cleaned).ok_or(QueryError::Format)?;

    let name = caps
        .get(1)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from);
    let game = caps.get(2).map(|m| m.as_str().to_string());

    Ok(ParsedQuery { name, game })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_name_and_game() {
        let q = parse(&["stat"], "  Alice , game=bf1").unwrap();
        assert_eq!(q.name.as_deref(), Some("Alice"));
        assert_eq!(q.game.as_deref(), Some("bf1"));
    }

    #[test]
    fn bare_trigger_yields_nothing() {
        let q = parse(&["stat"], "stat").unwrap();
        assert_eq!(q, ParsedQuery::default());
    }

    #[test]
    fn empty_input_is_valid() {
        let q = parse(&["stat"], "").unwrap();
        assert_eq!(q, ParsedQuery::default());
    }

    #[test]
    fn rejects_malformed_text() {
        assert_eq!(parse(&["stat"], "bad#name"), Err(QueryError::Format));
    }

    #[test]
    fn rejects_trailing_garbage() {
        // 整串锚定：game 子句后的多余内容视为格式错误
        assert_eq!(parse(&["stat"], "Alice,game=bf1###"), Err(QueryError::Format));
    }

    #[test]
    fn accepts_fullwidth_comma() {
        let q = parse(&["weapons", "武器"], "武器 Alice，game=bfv").unwrap();
        assert_eq!(q.name.as_deref(), Some("Alice"));
        assert_eq!(q.game.as_deref(), Some("bfv"));
    }

    #[test]
    fn game_without_name() {
        let q = parse(&["stat"], "game=bf4").unwrap();
        assert_eq!(q.name, None);
        assert_eq!(q.game.as_deref(), Some("bf4"));
    }

    #[test]
    fn strips_triggers_anywhere() {
        // 触发词按子串移除，不限于前缀位置
        let q = parse(&["servers", "服务器"], "Lux服务器").unwrap();
        assert_eq!(q.name.as_deref(), Some("Lux"));
    }

    #[test]
    fn stripping_is_idempotent() {
        let triggers = &["stat", "weapons"];
        let once = parse(triggers, "statAlice,game=bfv").unwrap();
        // 已清理文本再过一遍解析，结果不变
        let twice = parse(triggers, "Alice,game=bfv").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn game_tag_allows_extended_chars() {
        let q = parse(&["stat"], "game=bf2042-beta+v1.0").unwrap();
        assert_eq!(q.game.as_deref(), Some("bf2042-beta+v1.0"));
    }
}
