use std::collections::{HashMap, HashSet};

use analyzer_core::ExistingTestCase;

use crate::tokenize;

/// 已有测试用例的预分词结果
#[derive(Debug, Clone)]
pub struct IndexedTestCase {
    pub id: String,
    pub test_level: Option<String>,
    pub title_words: HashSet<String>,
    pub description_words: HashSet<String>,
    pub description_numbers: HashSet<String>,
}

/// 已有测试用例索引，每次调用构建一次，之后只读共享
#[derive(Debug, Clone, Default)]
pub struct ExistingTestCaseIndex {
    entries: Vec<IndexedTestCase>,
    records: HashMap<String, ExistingTestCase>,
}

impl ExistingTestCaseIndex {
    pub fn build(test_cases: &[ExistingTestCase]) -> Self {
        let mut entries = Vec::with_capacity(test_cases.len());
        let mut records = HashMap::with_capacity(test_cases.len());

        for test_case in test_cases {
            // 重复ID只保留第一次出现的记录
            if records.contains_key(&test_case.id) {
                continue;
            }
            entries.push(IndexedTestCase {
                id: test_case.id.clone(),
                test_level: test_case.test_level.clone(),
                title_words: tokenize::words(&test_case.title),
                description_words: tokenize::words(&test_case.description),
                description_numbers: tokenize::numbers(&test_case.description),
            });
            records.insert(test_case.id.clone(), test_case.clone());
        }

        Self { entries, records }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ExistingTestCase> {
        self.records.get(id)
    }

    /// 与指定测试级别匹配的条目；级别为 None 时不做限制
    pub fn entries_for_level<'a>(
        &'a self,
        test_level: Option<&'a str>,
    ) -> impl Iterator<Item = &'a IndexedTestCase> + 'a {
        self.entries.iter().filter(move |entry| match test_level {
            Some(level) => entry.test_level.as_deref() == Some(level),
            None => true,
        })
    }
}
