use serde::{Deserialize, Serialize};

fn default_max_chars() -> usize {
    4000
}

fn default_requests_per_cycle() -> usize {
    30
}

fn default_individual_batch_size() -> usize {
    30
}

fn default_artifact_batch_size() -> usize {
    10
}

fn default_match_batch_size() -> usize {
    5
}

fn default_similarity_threshold() -> f64 {
    0.3
}

fn default_max_candidates() -> usize {
    7
}

fn default_chunk_size() -> usize {
    50
}

/// 一致性检查配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    /// 单个比较单元的字符预算
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// 每批并发的比较请求数
    #[serde(default = "default_requests_per_cycle")]
    pub requests_per_cycle: usize,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            requests_per_cycle: default_requests_per_cycle(),
        }
    }
}

impl ConsistencyConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_chars == 0 {
            return Err(anyhow::anyhow!("字符预算必须大于0"));
        }
        if self.requests_per_cycle == 0 {
            return Err(anyhow::anyhow!("每批请求数必须大于0"));
        }
        Ok(())
    }
}

/// 翻译/毒性/质量逐条检查配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualConfig {
    #[serde(default = "default_individual_batch_size")]
    pub batch_size: usize,
}

impl Default for IndividualConfig {
    fn default() -> Self {
        Self {
            batch_size: default_individual_batch_size(),
        }
    }
}

impl IndividualConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            return Err(anyhow::anyhow!("批大小必须大于0"));
        }
        Ok(())
    }
}

/// 测试用例生成与匹配配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseConfig {
    /// 外层按条目分批的批大小
    #[serde(default = "default_artifact_batch_size")]
    pub artifact_batch_size: usize,
    /// 二次匹配请求的批大小
    #[serde(default = "default_match_batch_size")]
    pub match_batch_size: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// 每个相似度Worker处理的候选用例数
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// 并行Worker上限，未设置时取CPU核数
    #[serde(default)]
    pub max_workers: Option<usize>,
}

impl Default for TestCaseConfig {
    fn default() -> Self {
        Self {
            artifact_batch_size: default_artifact_batch_size(),
            match_batch_size: default_match_batch_size(),
            similarity_threshold: default_similarity_threshold(),
            max_candidates: default_max_candidates(),
            chunk_size: default_chunk_size(),
            max_workers: None,
        }
    }
}

impl TestCaseConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.artifact_batch_size == 0 || self.match_batch_size == 0 {
            return Err(anyhow::anyhow!("批大小必须大于0"));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(anyhow::anyhow!(
                "相似度阈值必须在 0.0 到 1.0 之间: {}",
                self.similarity_threshold
            ));
        }
        if self.max_candidates == 0 {
            return Err(anyhow::anyhow!("候选用例上限必须大于0"));
        }
        if self.chunk_size == 0 {
            return Err(anyhow::anyhow!("分片大小必须大于0"));
        }
        if self.max_workers == Some(0) {
            return Err(anyhow::anyhow!("Worker上限必须大于0"));
        }
        Ok(())
    }
}
