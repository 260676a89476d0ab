use std::cmp::Ordering;

use serde::Serialize;

/// 默认的每个候选保留的最大匹配数
pub const DEFAULT_MAX_CANDIDATES: usize = 7;

/// 与某个候选测试用例相似的已有测试用例
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMatch {
    pub id: String,
    pub similarity: f64,
    pub signal_similarity: f64,
    pub number_similarity: f64,
    pub title_similarity: f64,
}

impl CandidateMatch {
    /// 降序排名：相似度、信号名相似度、数字相似度、标题相似度，最后按ID保证稳定
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .similarity
            .total_cmp(&self.similarity)
            .then_with(|| other.signal_similarity.total_cmp(&self.signal_similarity))
            .then_with(|| other.number_similarity.total_cmp(&self.number_similarity))
            .then_with(|| other.title_similarity.total_cmp(&self.title_similarity))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// 按排名排序、容量有限的匹配列表；超出容量时淘汰排名最低的条目
#[derive(Debug, Clone)]
pub struct RankedCandidates {
    capacity: usize,
    entries: Vec<CandidateMatch>,
}

impl RankedCandidates {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Vec::with_capacity(capacity + 1),
        }
    }

    /// 插入匹配，返回被淘汰的条目（可能就是刚插入的这条）
    pub fn insert(&mut self, candidate: CandidateMatch) -> Option<CandidateMatch> {
        let position = self
            .entries
            .partition_point(|existing| existing.rank_cmp(&candidate) != Ordering::Greater);
        self.entries.insert(position, candidate);

        if self.entries.len() > self.capacity {
            return self.entries.pop();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|c| c.id.clone()).collect()
    }

    pub fn into_vec(self) -> Vec<CandidateMatch> {
        self.entries
    }
}

impl Default for RankedCandidates {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CANDIDATES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, similarity: f64) -> CandidateMatch {
        CandidateMatch {
            id: id.to_string(),
            similarity,
            signal_similarity: 0.0,
            number_similarity: 0.0,
            title_similarity: 0.0,
        }
    }

    #[test]
    fn test_eighth_lower_ranked_insertion_keeps_top_seven() {
        let mut ranked = RankedCandidates::default();
        for i in 0..7 {
            assert!(ranked.insert(candidate(&format!("tc{i}"), 0.9 - i as f64 * 0.05)).is_none());
        }
        let before = ranked.ids();

        let evicted = ranked.insert(candidate("low", 0.31)).unwrap();
        assert_eq!(evicted.id, "low");
        assert_eq!(ranked.len(), 7);
        assert_eq!(ranked.ids(), before);
    }

    #[test]
    fn test_higher_ranked_insertion_evicts_lowest() {
        let mut ranked = RankedCandidates::new(3);
        ranked.insert(candidate("a", 0.5));
        ranked.insert(candidate("b", 0.7));
        ranked.insert(candidate("c", 0.4));

        let evicted = ranked.insert(candidate("d", 0.9)).unwrap();
        assert_eq!(evicted.id, "c");
        assert_eq!(ranked.ids(), vec!["d", "b", "a"]);
    }

    #[test]
    fn test_tie_breaks_signal_before_number() {
        let mut by_number = candidate("number", 1.0);
        by_number.number_similarity = 1.0;
        let mut by_signal = candidate("signal", 1.0);
        by_signal.signal_similarity = 0.5;
        let mut by_title = candidate("title", 1.0);
        by_title.title_similarity = 0.9;

        let mut ranked = RankedCandidates::default();
        ranked.insert(by_title);
        ranked.insert(by_number);
        ranked.insert(by_signal);

        assert_eq!(ranked.ids(), vec!["signal", "number", "title"]);
    }
}
