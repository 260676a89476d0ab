//! 测试用例生成与匹配
//!
//! 每个需求条目的处理流程：
//!
//! 1. 扫描需求文本中出现的信号名，附上取值元数据和生成策略
//! 2. 请求模型生成候选测试用例并解析
//! 3. 在适用测试级别的已有用例中做相似度匹配，每个候选最多保留若干匹配
//! 4. 对有匹配的候选再请求一次模型，按序号选出唯一最佳匹配或 `None`
//! 5. 按是否选中已有用例分为 matched 与 creation required

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use analyzer_core::{
    config::TestCaseConfig, AnalyzerError, AnalyzerResult, Artifact, ChatMessage,
    ExistingTestCase, JobContext, SignalDefinition, TestCaseDataset, TestCaseProposal,
    ToolOutput,
};
use analyzer_dispatcher::{BatchDispatcher, BatchOutcome};
use analyzer_worker::{
    CandidateMatch, ExistingTestCaseIndex, ProposalQuery, SimilarityParams,
    SimilarityWorkerPool, TaskPool,
};

use crate::completion::CompletionCaller;
use crate::parsers::{parse_proposals, parse_selections};

static SIGNAL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_]+").expect("signal token pattern is valid"));

const DISAMBIGUATION_ROLE: &str =
    "You compare proposed test cases with existing test cases and pick duplicates.";

const DISAMBIGUATION_PROMPT: &str = "Pick the single existing test case that already covers the proposed test case. \
Answer with one line in the form `<index>: <existing test case id>` or `<index>: None` when none of them covers it.\n\n";

/// 测试用例生成策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestStrategy {
    EquivalenceClassPartitioning,
    BoundaryValueAnalysis,
}

impl TestStrategy {
    pub fn for_signal(signal: &SignalDefinition) -> Self {
        if signal.has_enumerated_values() {
            TestStrategy::EquivalenceClassPartitioning
        } else {
            TestStrategy::BoundaryValueAnalysis
        }
    }
}

/// 需求中引用到的信号及其生成策略
#[derive(Debug, Clone, PartialEq)]
pub struct SignalContext {
    pub signal: SignalDefinition,
    pub strategy: TestStrategy,
}

impl SignalContext {
    fn render(&self) -> String {
        let mut line = format!("- {} ({:?})", self.signal.name, self.strategy);
        if self.signal.has_enumerated_values() {
            let _ = write!(line, ": values [{}]", self.signal.values.join(", "));
        } else {
            let min = self.signal.min.map_or("-".to_string(), |v| v.to_string());
            let max = self.signal.max.map_or("-".to_string(), |v| v.to_string());
            let _ = write!(line, ": range {min}..{max}");
            if let Some(unit) = &self.signal.unit {
                let _ = write!(line, " {unit}");
            }
        }
        line
    }
}

/// 按出现顺序找出文本中引用的已知信号，每个信号只出现一次。
/// 只匹配由字母和下划线组成的完整片段，避免把长信号名的一部分当成信号。
pub fn scan_signals(text: &str, signals: &[SignalDefinition]) -> Vec<SignalContext> {
    let by_name: HashMap<&str, &SignalDefinition> = signals
        .iter()
        .map(|signal| (signal.name.as_str(), signal))
        .collect();

    let mut found: Vec<SignalContext> = Vec::new();
    for token in SIGNAL_TOKEN.find_iter(text) {
        let Some(signal) = by_name.get(token.as_str()) else {
            continue;
        };
        if found.iter().any(|ctx| ctx.signal.name == signal.name) {
            continue;
        }
        found.push(SignalContext {
            signal: (*signal).clone(),
            strategy: TestStrategy::for_signal(signal),
        });
    }
    found
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchedTestCase {
    artifact_id: String,
    proposal: TestCaseProposal,
    test_case: ExistingTestCase,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreationRequired {
    artifact_id: String,
    proposal: TestCaseProposal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct NonTestable {
    artifact_id: String,
    reason: String,
}

#[derive(Debug, Default, Serialize)]
struct TestCaseReport {
    #[serde(rename = "matchedTCs")]
    matched: Vec<MatchedTestCase>,
    #[serde(rename = "tcCreationRequired")]
    creation_required: Vec<CreationRequired>,
    #[serde(rename = "nonTestable")]
    non_testable: Vec<NonTestable>,
}

/// 单个条目的处理结果
#[derive(Debug, Default)]
struct ArtifactOutcome {
    matched: Vec<MatchedTestCase>,
    creation_required: Vec<CreationRequired>,
    non_testable: Option<NonTestable>,
    errors: Vec<String>,
}

/// 二次匹配的一个待选项
struct Disambiguation {
    proposal: TestCaseProposal,
    candidates: Vec<CandidateMatch>,
}

/// 二次匹配的结果
struct Selection {
    proposal: TestCaseProposal,
    test_case: Option<ExistingTestCase>,
    error: Option<String>,
}

impl Selection {
    fn unmatched(proposal: TestCaseProposal, error: Option<String>) -> Self {
        Self {
            proposal,
            test_case: None,
            error,
        }
    }
}

/// 测试用例生成与匹配编排
#[derive(Clone)]
pub struct TestCaseOrchestrator {
    caller: CompletionCaller,
    config: TestCaseConfig,
    pool: SimilarityWorkerPool,
}

impl TestCaseOrchestrator {
    pub fn new(caller: CompletionCaller, config: TestCaseConfig) -> Self {
        let pool = SimilarityWorkerPool::new(
            TaskPool::new(config.max_workers),
            config.chunk_size,
            SimilarityParams {
                threshold: config.similarity_threshold,
                max_candidates: config.max_candidates,
            },
        );
        Self {
            caller,
            config,
            pool,
        }
    }

    pub async fn run(&self, ctx: &JobContext) -> AnalyzerResult<ToolOutput> {
        let data = ctx.data.as_ref();
        let dataset = data.data_for_test_cases.as_ref().ok_or_else(|| {
            AnalyzerError::Validation("测试用例生成缺少 dataForTestCases".to_string())
        })?;
        let index = Arc::new(ExistingTestCaseIndex::build(&dataset.existing_test_cases));
        info!(
            "会话 {} 开始为 {} 个条目生成测试用例，已有用例 {} 个",
            ctx.session_id,
            data.artifacts.len(),
            index.len()
        );

        let dispatcher = BatchDispatcher::new(self.config.artifact_batch_size)?;
        let outcomes = dispatcher
            .dispatch_with_progress(
                data.artifacts.clone(),
                &ctx.cancellation,
                |artifact, token| {
                    self.process_artifact(
                        &data.role,
                        &data.prompt,
                        dataset,
                        Arc::clone(&index),
                        artifact,
                        token,
                    )
                },
                |progress| ctx.progress.report(progress.processed, progress.total),
            )
            .await;

        let mut report = TestCaseReport::default();
        let mut errors = Vec::new();
        for (artifact, outcome) in data.artifacts.iter().zip(outcomes) {
            match outcome {
                BatchOutcome::Fulfilled(outcome) => {
                    report.matched.extend(outcome.matched);
                    report.creation_required.extend(outcome.creation_required);
                    report.non_testable.extend(outcome.non_testable);
                    errors.extend(outcome.errors);
                }
                BatchOutcome::Rejected(e) => {
                    warn!("条目 {} 生成测试用例失败: {}", artifact.id, e);
                    errors.push(format!("条目 {}: {}", artifact.id, e));
                }
            }
        }

        Ok(ToolOutput::new(serde_json::to_value(report)?, errors))
    }

    async fn process_artifact(
        &self,
        role: &str,
        prompt: &str,
        dataset: &TestCaseDataset,
        index: Arc<ExistingTestCaseIndex>,
        artifact: Artifact,
        cancellation: CancellationToken,
    ) -> AnalyzerResult<ArtifactOutcome> {
        let signals = scan_signals(&artifact.primary_text, &dataset.signals);
        let mut user_message = format!("{prompt}{}", artifact.primary_text);
        if !signals.is_empty() {
            user_message.push_str("\n\nSignals:\n");
            for signal in &signals {
                user_message.push_str(&signal.render());
                user_message.push('\n');
            }
        }

        let messages = ChatMessage::conversation(role, user_message);
        let Some(answer) = self.caller.complete(&messages, &cancellation).await? else {
            return Ok(ArtifactOutcome::default());
        };

        let proposals = match parse_proposals(&answer) {
            Ok(proposals) => proposals,
            Err(AnalyzerError::NotTestable(reason)) => {
                info!("条目 {} 不可测试: {}", artifact.id, reason);
                return Ok(ArtifactOutcome {
                    non_testable: Some(NonTestable {
                        artifact_id: artifact.id,
                        reason,
                    }),
                    ..ArtifactOutcome::default()
                });
            }
            Err(e) => return Err(e),
        };
        debug!("条目 {} 解析出 {} 个候选测试用例", artifact.id, proposals.len());

        let test_level = dataset.test_level_for(&artifact);
        let signal_names: Vec<String> = signals.iter().map(|s| s.signal.name.clone()).collect();
        let queries = proposals
            .iter()
            .map(|proposal| ProposalQuery {
                index: proposal.index,
                title: proposal.title.clone(),
                description: proposal.description.clone(),
                test_level: test_level.clone(),
                signal_names: signal_names.clone(),
            })
            .collect();

        let mut report = self
            .pool
            .match_proposals(queries, Arc::clone(&index), &cancellation)
            .await;

        let mut outcome = ArtifactOutcome {
            errors: std::mem::take(&mut report.errors),
            ..ArtifactOutcome::default()
        };

        let mut pending = Vec::new();
        for proposal in proposals {
            match report.matches.remove(&proposal.index) {
                Some(candidates) if !candidates.is_empty() => pending.push(Disambiguation {
                    proposal,
                    candidates,
                }),
                _ => outcome.creation_required.push(CreationRequired {
                    artifact_id: artifact.id.clone(),
                    proposal,
                }),
            }
        }

        let dispatcher = BatchDispatcher::new(self.config.match_batch_size)?;
        let selections = dispatcher
            .dispatch(pending, &cancellation, |item, token| {
                self.disambiguate(&index, item, token)
            })
            .await;

        for selection in selections {
            let selection = match selection {
                BatchOutcome::Fulfilled(selection) => selection,
                BatchOutcome::Rejected(e) => {
                    outcome.errors.push(e.to_string());
                    continue;
                }
            };
            if let Some(error) = selection.error {
                outcome.errors.push(error);
            }
            match selection.test_case {
                Some(test_case) => outcome.matched.push(MatchedTestCase {
                    artifact_id: artifact.id.clone(),
                    proposal: selection.proposal,
                    test_case,
                }),
                None => outcome.creation_required.push(CreationRequired {
                    artifact_id: artifact.id.clone(),
                    proposal: selection.proposal,
                }),
            }
        }

        Ok(outcome)
    }

    /// 请求模型在候选匹配中选择一个。调用失败时候选计入需要新建，并记录错误。
    async fn disambiguate(
        &self,
        index: &ExistingTestCaseIndex,
        item: Disambiguation,
        cancellation: CancellationToken,
    ) -> AnalyzerResult<Selection> {
        let Disambiguation {
            proposal,
            candidates,
        } = item;

        let mut message = String::from(DISAMBIGUATION_PROMPT);
        let _ = writeln!(
            message,
            "Proposed test case {}:\nTitle: {}\nDescription: {}\n",
            proposal.index, proposal.title, proposal.description
        );
        message.push_str("Existing test cases:\n");
        for candidate in &candidates {
            if let Some(existing) = index.get(&candidate.id) {
                let _ = writeln!(
                    message,
                    "{}: {} - {}",
                    existing.id, existing.title, existing.description
                );
            }
        }

        let messages = ChatMessage::conversation(DISAMBIGUATION_ROLE, message);
        let answer = match self.caller.complete(&messages, &cancellation).await {
            Ok(Some(answer)) => answer,
            Ok(None) => return Ok(Selection::unmatched(proposal, None)),
            Err(e) => {
                warn!("候选测试用例 {} 二次匹配失败: {}", proposal.index, e);
                let error = format!("候选测试用例 {} 二次匹配失败，需要新建: {}", proposal.index, e);
                return Ok(Selection::unmatched(proposal, Some(error)));
            }
        };

        let test_case = parse_selections(&answer)
            .remove(&proposal.index)
            .flatten()
            .and_then(|id| index.get(&id).cloned());
        if test_case.is_none() {
            debug!("候选测试用例 {} 没有选中已有用例", proposal.index);
        }
        Ok(Selection {
            proposal,
            test_case,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_testing_utils::signal;

    #[test]
    fn test_scan_signals_matches_whole_tokens_only() {
        let signals = vec![
            signal("LAMP_REQ", &["ON", "OFF"]),
            signal("SPEED", &[]),
            signal("LAMP", &["0", "1"]),
        ];
        let found = scan_signals(
            "When LAMP_REQ is ON and SPEED exceeds 50 km/h, LAMP_REQ stays ON",
            &signals,
        );

        let names: Vec<&str> = found.iter().map(|s| s.signal.name.as_str()).collect();
        assert_eq!(names, vec!["LAMP_REQ", "SPEED"]);
        assert_eq!(found[0].strategy, TestStrategy::EquivalenceClassPartitioning);
        assert_eq!(found[1].strategy, TestStrategy::BoundaryValueAnalysis);
    }

    #[test]
    fn test_scan_signals_ignores_digit_suffixes() {
        let signals = vec![signal("SPEED", &[])];
        // 字符类只含字母和下划线，SPEED2 被拆成 SPEED 和 2
        assert_eq!(scan_signals("SPEED2 rises", &signals).len(), 1);
        assert!(scan_signals("SPEEDOMETER rises", &signals).is_empty());
    }

    #[test]
    fn test_signal_render() {
        let enumerated = SignalContext {
            signal: signal("LAMP_REQ", &["ON", "OFF"]),
            strategy: TestStrategy::EquivalenceClassPartitioning,
        };
        assert_eq!(
            enumerated.render(),
            "- LAMP_REQ (EquivalenceClassPartitioning): values [ON, OFF]"
        );

        let ranged = SignalContext {
            signal: signal("SPEED", &[]),
            strategy: TestStrategy::BoundaryValueAnalysis,
        };
        assert_eq!(
            ranged.render(),
            "- SPEED (BoundaryValueAnalysis): range 0..255"
        );
    }
}
