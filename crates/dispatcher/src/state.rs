use std::collections::HashSet;

use serde::Serialize;

use analyzer_core::JobKey;

/// 服务运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    Idle,
    Busy,
}

/// 调度器的服务状态
///
/// 不变量：当且仅当活跃集合非空时为 `Busy`；活跃集合大小不超过并发上限。
#[derive(Debug, Clone)]
pub struct ServiceState {
    mode: ServiceMode,
    limit: usize,
    active: HashSet<JobKey>,
}

impl ServiceState {
    pub fn new(limit: usize) -> Self {
        Self {
            mode: ServiceMode::Idle,
            limit: limit.max(1),
            active: HashSet::new(),
        }
    }

    pub fn mode(&self) -> ServiceMode {
        self.mode
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_busy(&self) -> bool {
        self.mode == ServiceMode::Busy
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn has_capacity(&self) -> bool {
        self.active.len() < self.limit
    }

    /// 标记任务为活跃，超出并发上限时拒绝
    pub fn activate(&mut self, key: JobKey) -> bool {
        if !self.has_capacity() || self.active.contains(&key) {
            return false;
        }
        self.active.insert(key);
        self.refresh_mode();
        true
    }

    /// 释放活跃任务，返回该任务此前是否活跃
    pub fn deactivate(&mut self, key: &JobKey) -> bool {
        let removed = self.active.remove(key);
        self.refresh_mode();
        removed
    }

    fn refresh_mode(&mut self) {
        self.mode = if self.active.is_empty() {
            ServiceMode::Idle
        } else {
            ServiceMode::Busy
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_follows_active_set() {
        let mut state = ServiceState::new(2);
        assert_eq!(state.mode(), ServiceMode::Idle);

        assert!(state.activate(JobKey::new("s1", "c1")));
        assert!(state.is_busy());
        assert!(state.activate(JobKey::new("s2", "c1")));
        assert!(!state.activate(JobKey::new("s3", "c1")));
        assert_eq!(state.active_count(), 2);

        assert!(state.deactivate(&JobKey::new("s1", "c1")));
        assert!(state.is_busy());
        assert!(state.deactivate(&JobKey::new("s2", "c1")));
        assert_eq!(state.mode(), ServiceMode::Idle);
        assert!(!state.deactivate(&JobKey::new("s2", "c1")));
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let mut state = ServiceState::new(0);
        assert_eq!(state.limit(), 1);
        assert!(state.activate(JobKey::new("s1", "c1")));
        assert!(!state.has_capacity());
    }
}
