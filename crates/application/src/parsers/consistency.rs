use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static ISSUE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^Issues \(([\w.]+ - [\w.]+(?:, ?[\w.]+ - [\w.]+)*)\): ")
        .expect("issue header pattern is valid")
});

/// 一条带编号对的问题描述
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairIssue {
    pub pair_ids: Vec<(String, String)>,
    pub message: String,
}

fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (a, b) = pair.trim().split_once(" - ")?;
            Some((a.trim().to_string(), b.trim().to_string()))
        })
        .collect()
}

/// 解析 `Issues (a - b): message` 段落。消息一直延续到下一个合法的段落头或文本结尾；
/// 第一个段落头之前的内容被忽略。
pub fn parse_pair_issues(answer: &str) -> Vec<PairIssue> {
    let headers: Vec<_> = ISSUE_HEADER.captures_iter(answer).collect();
    let mut issues = Vec::with_capacity(headers.len());

    for (i, captures) in headers.iter().enumerate() {
        let (Some(whole), Some(pairs)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(answer.len(), |next| next.start());

        issues.push(PairIssue {
            pair_ids: parse_pairs(pairs.as_str()),
            message: answer[whole.end()..end].trim().to_string(),
        });
    }

    issues
}
