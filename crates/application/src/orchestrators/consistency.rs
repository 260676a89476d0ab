use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use analyzer_core::{
    config::ConsistencyConfig, AnalyzerResult, Artifact, ChatMessage, JobContext, JobData,
    ToolOutput,
};
use analyzer_dispatcher::{BatchDispatcher, BatchOutcome};

use crate::completion::CompletionCaller;
use crate::parsers::{parse_pair_issues, PairIssue};

/// 一个比较单元：当前条目与其后若干条目的文本批次
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonUnit {
    pub current_id: String,
    pub current_text: String,
    pub other_ids: Vec<String>,
    pub others_text: String,
}

impl ComparisonUnit {
    /// 去重键：当前条目ID + 排序后的其他条目ID
    pub fn visited_key(&self) -> String {
        let mut ids = self.other_ids.clone();
        ids.sort();
        format!("{}: {}", self.current_id, ids.join(","))
    }

    pub fn user_message(&self, prompt: &str) -> String {
        format!("{prompt}{}\nOthers:\n{}", self.current_text, self.others_text)
    }

    /// 预算统计口径下的字符数
    pub fn char_count(&self, prompt: &str) -> usize {
        prompt.chars().count() + self.current_text.chars().count() + self.others_text.chars().count()
    }

    /// 单元覆盖的无序条目对
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.other_ids
            .iter()
            .map(move |other| (self.current_id.as_str(), other.as_str()))
    }
}

fn current_statement(artifact: &Artifact) -> String {
    format!("Main: {}: {}", artifact.id, artifact.primary_text.trim())
}

fn other_statement(artifact: &Artifact) -> String {
    format!("{}: {}\n", artifact.id, artifact.primary_text.trim())
}

/// 为一组条目生成比较单元。
///
/// 每个条目只与排在它后面的条目比较，因此每个无序条目对恰好出现一次。
/// 追加下一条会使字符数达到 `max_chars` 时先输出当前单元，再用空缓冲区重新考虑该条；
/// 缓冲区为空时该条总被接受，所以单元最多超出预算一条语句的长度。
pub fn build_comparison_units(
    requirements: &[&Artifact],
    prompt: &str,
    max_chars: usize,
) -> Vec<ComparisonUnit> {
    let prompt_len = prompt.chars().count();
    let mut units = Vec::new();

    for (i, current) in requirements.iter().enumerate() {
        let current_text = current_statement(current);
        let base = prompt_len + current_text.chars().count();

        let mut other_ids: Vec<String> = Vec::new();
        let mut others_text = String::new();
        let mut buffer_len = 0;

        let remaining = &requirements[i + 1..];
        let mut j = 0;
        while j < remaining.len() {
            let other = remaining[j];
            let next = other_statement(other);
            let next_len = next.chars().count();

            if base + buffer_len + next_len >= max_chars && !other_ids.is_empty() {
                units.push(ComparisonUnit {
                    current_id: current.id.clone(),
                    current_text: current_text.clone(),
                    other_ids: std::mem::take(&mut other_ids),
                    others_text: std::mem::take(&mut others_text),
                });
                buffer_len = 0;
                continue;
            }

            other_ids.push(other.id.clone());
            others_text.push_str(&next);
            buffer_len += next_len;
            j += 1;
        }

        if !other_ids.is_empty() {
            units.push(ComparisonUnit {
                current_id: current.id.clone(),
                current_text,
                other_ids,
                others_text,
            });
        }
    }

    units
}

/// 按相似分组解析条目；未提供分组时全部条目为一组，未知ID被忽略
fn resolve_groups(data: &JobData) -> Vec<Vec<&Artifact>> {
    let Some(groups) = &data.similarity_groups else {
        return vec![data.artifacts.iter().collect()];
    };

    let by_id: HashMap<&str, &Artifact> = data
        .artifacts
        .iter()
        .map(|artifact| (artifact.id.as_str(), artifact))
        .collect();

    groups
        .iter()
        .map(|group| {
            group
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).copied())
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct IssueRecord {
    source_id: String,
    compared_ids: Vec<String>,
    message: String,
    parsed_pair_issues: Vec<PairIssue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConsistencyReport {
    consistency_issues: Vec<String>,
    consistency_issues_data: Vec<IssueRecord>,
}

/// 一致性检查编排
#[derive(Clone)]
pub struct ConsistencyOrchestrator {
    caller: CompletionCaller,
    config: ConsistencyConfig,
}

impl ConsistencyOrchestrator {
    pub fn new(caller: CompletionCaller, config: ConsistencyConfig) -> Self {
        Self { caller, config }
    }

    /// 生成本次任务的全部比较单元，跨分组按去重键跳过已生成的单元
    pub fn plan(&self, data: &JobData) -> Vec<ComparisonUnit> {
        let mut visited = HashSet::new();
        let mut units = Vec::new();

        for group in resolve_groups(data) {
            for unit in build_comparison_units(&group, &data.prompt, self.config.max_chars) {
                if visited.insert(unit.visited_key()) {
                    units.push(unit);
                } else {
                    debug!("跳过重复的比较单元: {}", unit.visited_key());
                }
            }
        }

        units
    }

    async fn check_unit(
        &self,
        data: &JobData,
        unit: ComparisonUnit,
        cancellation: CancellationToken,
    ) -> AnalyzerResult<Option<IssueRecord>> {
        let messages = ChatMessage::conversation(&data.role, unit.user_message(&data.prompt));
        let Some(answer) = self.caller.complete(&messages, &cancellation).await? else {
            return Ok(None);
        };

        Ok(Some(IssueRecord {
            parsed_pair_issues: parse_pair_issues(&answer),
            source_id: unit.current_id,
            compared_ids: unit.other_ids,
            message: answer,
        }))
    }

    pub async fn run(&self, ctx: &JobContext) -> AnalyzerResult<ToolOutput> {
        let units = self.plan(&ctx.data);
        info!(
            "会话 {} 生成 {} 个一致性比较单元",
            ctx.session_id,
            units.len()
        );

        let dispatcher = BatchDispatcher::new(self.config.requests_per_cycle)?;
        let data = ctx.data.as_ref();
        let outcomes = dispatcher
            .dispatch_with_progress(
                units,
                &ctx.cancellation,
                |unit, token| self.check_unit(data, unit, token),
                |progress| ctx.progress.report(progress.processed, progress.total),
            )
            .await;

        let mut report = ConsistencyReport {
            consistency_issues: Vec::new(),
            consistency_issues_data: Vec::new(),
        };
        let mut errors = Vec::new();

        for outcome in outcomes {
            match outcome {
                BatchOutcome::Fulfilled(Some(record)) => {
                    report.consistency_issues.push(format!(
                        "({} - {}) - {}",
                        record.source_id,
                        record.compared_ids.join(", "),
                        record.message
                    ));
                    report.consistency_issues_data.push(record);
                }
                BatchOutcome::Fulfilled(None) => {}
                BatchOutcome::Rejected(e) => errors.push(e.to_string()),
            }
        }

        Ok(ToolOutput::new(serde_json::to_value(report)?, errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_testing_utils::ArtifactBuilder;

    fn artifacts(texts: &[&str]) -> Vec<Artifact> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| ArtifactBuilder::new(&(i + 1).to_string()).with_text(text).build())
            .collect()
    }

    fn all_pairs(units: &[ComparisonUnit]) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = units
            .iter()
            .flat_map(|unit| unit.pairs().map(|(a, b)| (a.to_string(), b.to_string())))
            .collect();
        pairs.sort();
        pairs
    }

    #[test]
    fn test_tiny_budget_gives_one_unit_per_pair() {
        let reqs = artifacts(&["Lamp on", "Lamp off", "Lamp dim"]);
        let refs: Vec<&Artifact> = reqs.iter().collect();
        let units = build_comparison_units(&refs, "Check:", 10);

        assert_eq!(units.len(), 3);
        let keys: HashSet<String> = units.iter().map(ComparisonUnit::visited_key).collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(
            all_pairs(&units),
            vec![
                ("1".to_string(), "2".to_string()),
                ("1".to_string(), "3".to_string()),
                ("2".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_large_budget_batches_all_later_statements() {
        let reqs = artifacts(&["A", "B", "C", "D"]);
        let refs: Vec<&Artifact> = reqs.iter().collect();
        let units = build_comparison_units(&refs, "Check:", 4000);

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].other_ids, vec!["2", "3", "4"]);
        assert_eq!(units[0].others_text, "2: B\n3: C\n4: D\n");
        assert_eq!(units[2].other_ids, vec!["4"]);
        assert_eq!(
            units[2].user_message("Check:"),
            "Check:Main: 3: C\nOthers:\n4: D\n"
        );
    }

    #[test]
    fn test_budget_bound_and_pair_coverage() {
        let texts: Vec<String> = (0..12)
            .map(|i| format!("The controller shall handle case {} within {} ms", i, i * 7))
            .collect();
        let reqs: Vec<Artifact> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| ArtifactBuilder::new(&format!("R{i}")).with_text(text).build())
            .collect();
        let refs: Vec<&Artifact> = reqs.iter().collect();
        let longest = refs
            .iter()
            .map(|a| other_statement(a).chars().count())
            .max()
            .unwrap();

        for max_chars in [1, 60, 120, 200, 500, 10_000] {
            let units = build_comparison_units(&refs, "Prompt: ", max_chars);
            for unit in &units {
                let base = "Prompt: ".len() + unit.current_text.chars().count();
                if unit.other_ids.len() > 1 {
                    assert!(unit.char_count("Prompt: ") < max_chars);
                } else {
                    // 单条语句可以超出预算，但只超出这一条
                    assert!(unit.char_count("Prompt: ") <= base + longest);
                }
            }

            let pairs = all_pairs(&units);
            assert_eq!(pairs.len(), 12 * 11 / 2);
            let unique: HashSet<_> = pairs.iter().collect();
            assert_eq!(unique.len(), pairs.len());
        }
    }

    #[test]
    fn test_flush_boundary_is_inclusive() {
        // "Main: 1: A" = 10，"2: B\n" = 5，"3: C\n" = 5
        let reqs = artifacts(&["A", "B", "C"]);
        let refs: Vec<&Artifact> = reqs.iter().collect();

        // 10 + 5 + 5 = 20 达到预算，拆分
        let split = build_comparison_units(&refs, "", 20);
        assert_eq!(split[0].other_ids, vec!["2"]);
        assert_eq!(split[1].other_ids, vec!["3"]);

        // 预算 21 时可以容纳
        let joined = build_comparison_units(&refs, "", 21);
        assert_eq!(joined[0].other_ids, vec!["2", "3"]);
    }

    #[test]
    fn test_visited_key_sorts_other_ids() {
        let unit = ComparisonUnit {
            current_id: "1".to_string(),
            current_text: String::new(),
            other_ids: vec!["9".to_string(), "3".to_string()],
            others_text: String::new(),
        };
        assert_eq!(unit.visited_key(), "1: 3,9");
    }

    #[test]
    fn test_overlapping_groups_are_deduplicated() {
        let reqs = artifacts(&["A", "B", "C"]);
        let data = JobData {
            artifacts: reqs,
            prompt: "Check:".to_string(),
            role: "reviewer".to_string(),
            data_for_test_cases: None,
            similarity_groups: Some(vec![
                vec!["1".to_string(), "2".to_string()],
                vec!["1".to_string(), "2".to_string(), "unknown".to_string()],
                vec!["2".to_string(), "3".to_string()],
            ]),
        };
        let orchestrator = ConsistencyOrchestrator::new(
            CompletionCaller::new(
                std::sync::Arc::new(analyzer_testing_utils::MockCompletionService::new()),
                &Default::default(),
            ),
            ConsistencyConfig::default(),
        );

        let units = orchestrator.plan(&data);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].visited_key(), "1: 2");
        assert_eq!(units[1].visited_key(), "2: 3");
    }
}
