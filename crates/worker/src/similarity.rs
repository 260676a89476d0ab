use std::collections::HashSet;

use serde::Serialize;

use crate::candidates::{CandidateMatch, RankedCandidates, DEFAULT_MAX_CANDIDATES};
use crate::index::ExistingTestCaseIndex;
use crate::tokenize;

/// 一个待匹配的候选测试用例
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalQuery {
    pub index: usize,
    pub title: String,
    pub description: String,
    /// 需求适用的测试级别，None 表示不限制
    pub test_level: Option<String>,
    /// 生成时使用到的信号名
    pub signal_names: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct SimilarityParams {
    pub threshold: f64,
    pub max_candidates: usize,
}

impl Default for SimilarityParams {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

fn ratio(matched: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        matched as f64 / total as f64
    }
}

/// 计算一个分片内每个候选的匹配列表，返回 (候选序号, 排名列表)，没有匹配的候选不出现
pub fn score_chunk(
    queries: &[ProposalQuery],
    index: &ExistingTestCaseIndex,
    params: SimilarityParams,
) -> Vec<(usize, Vec<CandidateMatch>)> {
    let mut groups = Vec::new();

    for query in queries {
        let words = tokenize::words(&query.description);
        let numbers = tokenize::numbers(&query.description);
        let title_words = tokenize::words(&query.title);
        let signal_names: HashSet<String> = query
            .signal_names
            .iter()
            .map(|name| name.to_lowercase())
            .collect();

        let mut ranked = RankedCandidates::new(params.max_candidates);

        for entry in index.entries_for_level(query.test_level.as_deref()) {
            let shared_words = words
                .iter()
                .filter(|w| entry.description_words.contains(*w))
                .count();
            let number_matches = numbers
                .iter()
                .filter(|n| entry.description_numbers.contains(*n))
                .count();
            let signal_matches = signal_names
                .iter()
                .filter(|s| entry.description_words.contains(*s))
                .count();

            if !numbers.is_empty() && number_matches == 0 && signal_matches == 0 {
                continue;
            }
            if shared_words == 0 && number_matches == 0 && signal_matches == 0 {
                continue;
            }

            let mut similarity = tokenize::jaccard(&words, &entry.description_words);
            let mut number_similarity = 0.0;
            let mut signal_similarity = 0.0;

            if number_matches > 0 {
                similarity = 1.0;
                number_similarity = ratio(number_matches, numbers.len());
            }
            if signal_matches > 0 {
                similarity = 1.0;
                signal_similarity = ratio(signal_matches, signal_names.len());
            }

            if similarity < params.threshold {
                continue;
            }

            ranked.insert(CandidateMatch {
                id: entry.id.clone(),
                similarity,
                signal_similarity,
                number_similarity,
                title_similarity: tokenize::jaccard(&title_words, &entry.title_words),
            });
        }

        if !ranked.is_empty() {
            groups.push((query.index, ranked.into_vec()));
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_testing_utils::ExistingTestCaseBuilder;

    fn query(index: usize, description: &str) -> ProposalQuery {
        ProposalQuery {
            index,
            title: format!("Proposal {index}"),
            description: description.to_string(),
            test_level: None,
            signal_names: Vec::new(),
        }
    }

    fn corpus() -> ExistingTestCaseIndex {
        ExistingTestCaseIndex::build(&[
            ExistingTestCaseBuilder::new("5")
                .with_title("TC1")
                .with_description("Set speed to 42 and verify the warning lamp")
                .build(),
            ExistingTestCaseBuilder::new("6")
                .with_title("TC2")
                .with_description("Open the driver door and check the interior light")
                .build(),
            ExistingTestCaseBuilder::new("7")
                .with_title("TC3")
                .with_description("Verify HEAD_LIGHT switches on at dusk")
                .with_test_level("SYS")
                .build(),
        ])
    }

    #[test]
    fn test_shared_number_forces_full_similarity() {
        let groups = score_chunk(
            &[query(0, "Drive at 42 km/h")],
            &corpus(),
            SimilarityParams::default(),
        );
        assert_eq!(groups.len(), 1);
        let (index, matches) = &groups[0];
        assert_eq!(*index, 0);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "5");
        assert_eq!(matches[0].similarity, 1.0);
        assert_eq!(matches[0].number_similarity, 1.0);
    }

    #[test]
    fn test_unmatched_numbers_skip_candidate_despite_word_overlap() {
        // 与 "5" 的描述词汇高度重合，但数字不同
        let groups = score_chunk(
            &[query(0, "Set speed to 99 and verify the warning lamp")],
            &corpus(),
            SimilarityParams::default(),
        );
        assert!(groups.is_empty());
    }

    #[test]
    fn test_zero_overlap_never_matches_even_with_zero_threshold() {
        let params = SimilarityParams {
            threshold: 0.0,
            max_candidates: 7,
        };
        let groups = score_chunk(&[query(1, "Battery voltage telemetry")], &corpus(), params);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_signal_name_match_and_test_level_filter() {
        let mut with_signal = query(2, "Lights react at dusk");
        with_signal.signal_names = vec!["HEAD_LIGHT".to_string()];
        with_signal.test_level = Some("SYS".to_string());

        let groups = score_chunk(&[with_signal.clone()], &corpus(), SimilarityParams::default());
        assert_eq!(groups[0].1[0].id, "7");
        assert_eq!(groups[0].1[0].signal_similarity, 1.0);

        with_signal.test_level = Some("HW".to_string());
        assert!(score_chunk(&[with_signal], &corpus(), SimilarityParams::default()).is_empty());
    }

    #[test]
    fn test_jaccard_threshold() {
        let text_match = query(3, "Open the driver door and check the interior light");
        let groups = score_chunk(&[text_match], &corpus(), SimilarityParams::default());
        assert_eq!(groups[0].1[0].id, "6");
        assert_eq!(groups[0].1[0].similarity, 1.0);

        let weak = query(4, "the");
        let strict = SimilarityParams {
            threshold: 0.5,
            max_candidates: 7,
        };
        assert!(score_chunk(&[weak], &corpus(), strict).is_empty());
    }

    #[test]
    fn test_duplicate_ids_ranked_once_and_shared_between_proposals() {
        let index = ExistingTestCaseIndex::build(&[
            ExistingTestCaseBuilder::new("5")
                .with_description("Set speed to 42 and verify the warning lamp")
                .build(),
            ExistingTestCaseBuilder::new("5")
                .with_description("Speed 42 warning lamp duplicate record")
                .build(),
        ]);

        let groups = score_chunk(
            &[query(0, "Drive at 42 km/h"), query(1, "Warn at 42 km/h")],
            &index,
            SimilarityParams::default(),
        );

        assert_eq!(groups.len(), 2);
        for (_, matches) in &groups {
            assert_eq!(matches.len(), 1);
            assert_eq!(matches[0].id, "5");
        }
    }

    #[test]
    fn test_candidates_capped() {
        let test_cases: Vec<_> = (0..12)
            .map(|i| {
                ExistingTestCaseBuilder::new(&i.to_string())
                    .with_description(&format!("brake pressure check step{i}"))
                    .build()
            })
            .collect();
        let index = ExistingTestCaseIndex::build(&test_cases);

        let groups = score_chunk(
            &[query(0, "brake pressure check")],
            &index,
            SimilarityParams::default(),
        );
        assert_eq!(groups[0].1.len(), 7);
    }
}
