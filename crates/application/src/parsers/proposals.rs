use once_cell::sync::Lazy;
use regex::Regex;

use analyzer_core::{AnalyzerError, AnalyzerResult, TestCaseProposal};

/// 需求缺少约束，无法生成测试用例
pub const LACK_OF_CONSTRAINTS: &str = "LACK_OF_CONSTRAINTS";
/// 需求引用的信号取值未找到
pub const SIGNAL_VALUES_NOT_FOUND: &str = "SIGNAL_VALUES_NOT_FOUND";

static ERROR_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(lack[ _]of[ _]constraints|signal[ _]values[ _]not[ _]found)\b")
        .expect("error marker pattern is valid")
});

static TEST_CASE_DELIMITER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^[ \t*#]*Test Case[ \t]*\d+[ \t]*:[ \t*]*")
        .expect("test case delimiter pattern is valid")
});

static FIELD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[ \t*\-]*(title|description|output defined)[ \t*]*:[ \t*]*(.*)$")
        .expect("field line pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    OutputDefined,
}

#[derive(Debug, Default)]
struct RawRecord {
    title: String,
    description: String,
    output_defined: String,
}

impl RawRecord {
    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Description => &mut self.description,
            Field::OutputDefined => &mut self.output_defined,
        }
    }
}

fn parse_output_defined(raw: &str) -> Option<bool> {
    match raw.trim().trim_end_matches('.').to_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_record(text: &str) -> Option<(String, String, Option<bool>)> {
    let mut record = RawRecord::default();
    let mut current: Option<Field> = None;

    for line in text.lines() {
        if let Some(captures) = FIELD_LINE.captures(line) {
            let field = match captures[1].to_lowercase().as_str() {
                "title" => Field::Title,
                "description" => Field::Description,
                _ => Field::OutputDefined,
            };
            let value = captures.get(2).map_or("", |m| m.as_str());
            let slot = record.field_mut(field);
            slot.clear();
            slot.push_str(value.trim());
            current = Some(field);
        } else if let Some(field) = current {
            // 描述等字段可以跨行，直到下一个字段名出现
            let slot = record.field_mut(field);
            if !slot.is_empty() {
                slot.push('\n');
            }
            slot.push_str(line.trim());
        }
    }

    let title = record.title.trim().to_string();
    let description = record.description.trim().to_string();
    if title.is_empty() || description.is_empty() {
        return None;
    }
    Some((title, description, parse_output_defined(&record.output_defined)))
}

/// 查找回答中的不可测试标记
pub fn find_error_marker(answer: &str) -> Option<&'static str> {
    let found = ERROR_MARKER.find(answer)?;
    if found.as_str().to_lowercase().starts_with("lack") {
        Some(LACK_OF_CONSTRAINTS)
    } else {
        Some(SIGNAL_VALUES_NOT_FOUND)
    }
}

/// 解析生成的测试用例。
///
/// 回答以 `Test Case` 开头时按 `Test Case <n>:` 拆分为多条记录，否则视为单条记录。
/// `Output defined` 明确为 false 的记录被丢弃，其余记录按出现顺序从 0 编号。
/// 包含不可测试标记时返回 [`AnalyzerError::NotTestable`]；没有任何可用记录时返回
/// [`AnalyzerError::Parse`]。
pub fn parse_proposals(answer: &str) -> AnalyzerResult<Vec<TestCaseProposal>> {
    if let Some(marker) = find_error_marker(answer) {
        return Err(AnalyzerError::NotTestable(marker.to_string()));
    }

    let trimmed = answer.trim_start_matches(|c: char| c.is_whitespace() || c == '*' || c == '#');
    let segments: Vec<&str> = if trimmed.to_lowercase().starts_with("test case") {
        TEST_CASE_DELIMITER
            .split(answer)
            .filter(|segment| !segment.trim().is_empty())
            .collect()
    } else {
        vec![answer]
    };

    let records: Vec<_> = segments.into_iter().filter_map(parse_record).collect();
    if records.is_empty() {
        return Err(AnalyzerError::Parse(
            "回答中没有可识别的测试用例记录".to_string(),
        ));
    }

    Ok(records
        .into_iter()
        .filter(|(_, _, output_defined)| *output_defined != Some(false))
        .enumerate()
        .map(|(index, (title, description, output_defined))| TestCaseProposal {
            index,
            title,
            description,
            output_defined,
        })
        .collect())
}
