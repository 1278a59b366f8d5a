/// 指令匹配：在纯文本消息上匹配 [前缀][指令名]，返回其后的参数文本。
///
/// 指令名必须紧跟某个配置的前缀出现在消息开头（允许前导空白），
/// 否则视为未命中；返回值保留参数原文，由具体插件自行解析。
/// 英文指令名后必须出现词边界，"/stats" 不会命中指令 "stat"。
pub fn match_command<'a>(prefixes: &[String], text: &'a str, command: &str) -> Option<&'a str> {
    let trimmed = text.trim_start();
    for prefix in prefixes {
        let target = format!("{}{}", prefix, command);
        if let Some(rest) = trimmed.strip_prefix(&target) {
            if word_char(command.chars().last()) && word_char(rest.chars().next()) {
                continue;
            }
            return Some(rest.trim_start());
        }
    }
    None
}

fn word_char(c: Option<char>) -> bool {
    matches!(c, Some(c) if c.is_ascii_alphanumeric() || c == '_')
}
