use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static SELECTION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t\-*]*(\d+)[ \t]*:[ \t]*(.+?)[ \t]*$")
        .expect("selection line pattern is valid")
});

/// 解析二次匹配回答 `{序号}: {用例ID|None}`。
///
/// 返回序号 -> 选中的用例ID，`None` 表示模型认为没有匹配项。
/// 同一序号出现多次时以第一次为准，无法识别的行被忽略。
pub fn parse_selections(answer: &str) -> HashMap<usize, Option<String>> {
    let mut selections = HashMap::new();

    for captures in SELECTION_LINE.captures_iter(answer) {
        let Ok(index) = captures[1].parse::<usize>() else {
            continue;
        };
        let raw = captures[2].trim_matches(|c: char| matches!(c, '"' | '\'' | '.' | '`') || c.is_whitespace());
        if raw.is_empty() {
            continue;
        }

        let selected = if raw.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(raw.to_string())
        };
        selections.entry(index).or_insert(selected);
    }

    selections
}
