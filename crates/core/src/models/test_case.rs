use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::job::Artifact;

/// 已有测试用例
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExistingTestCase {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub test_level: Option<String>,
}

/// 信号定义及其取值元数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignalDefinition {
    pub name: String,
    /// 枚举取值集合，为空表示连续取值
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl SignalDefinition {
    pub fn has_enumerated_values(&self) -> bool {
        !self.values.is_empty()
    }
}

/// 测试用例生成所需的数据集
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseDataset {
    #[serde(default)]
    pub existing_test_cases: Vec<ExistingTestCase>,
    #[serde(default)]
    pub signals: Vec<SignalDefinition>,
    /// 条目类型 -> 测试级别
    #[serde(default)]
    pub test_levels: HashMap<String, String>,
}

impl TestCaseDataset {
    /// 条目显式测试级别优先，其次按条目类型映射；都没有则不限制
    pub fn test_level_for(&self, artifact: &Artifact) -> Option<String> {
        artifact.test_level.clone().or_else(|| {
            artifact
                .artifact_type
                .as_ref()
                .and_then(|kind| self.test_levels.get(kind).cloned())
        })
    }
}

/// 模型生成的候选测试用例
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseProposal {
    pub index: usize,
    pub title: String,
    pub description: String,
    pub output_defined: Option<bool>,
}
