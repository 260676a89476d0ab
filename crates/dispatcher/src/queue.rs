//! 请求队列
//!
//! 等待中的任务按提交顺序排在 FIFO 中，运行中的任务占用固定容量的执行槽。
//! 运行中的任务总是位于队列视图的最前面，因此"并发窗口"规则等价于：
//! 槽位有空闲时，FIFO 队首即为下一个可执行任务。

use std::collections::VecDeque;

use tokio_util::sync::CancellationToken;

use analyzer_core::{Job, JobKey, JobStatus, ProgressEntryView, QueueEntryView, QueueFilter, QueueView};

#[derive(Debug)]
pub struct RequestQueue {
    pending: VecDeque<Job>,
    slots: Vec<Job>,
    capacity: usize,
}

impl RequestQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: VecDeque::new(),
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// 入队并返回新的队列长度（等待 + 运行中）
    pub fn enqueue(&mut self, mut job: Job) -> usize {
        job.status = JobStatus::Pending;
        job.progress = 0.0;
        job.cancellation = None;
        self.pending.push_back(job);
        self.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len() + self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.slots.len()
    }

    pub fn has_free_slot(&self) -> bool {
        self.slots.len() < self.capacity
    }

    /// 槽位有空闲时返回下一个可执行的等待任务
    pub fn next_eligible(&self) -> Option<&Job> {
        if !self.has_free_slot() {
            return None;
        }
        self.pending.front()
    }

    /// 将指定的等待任务移入执行槽：pending → running，并绑定取消令牌
    pub fn admit(&mut self, key: &JobKey, token: CancellationToken) -> Option<&Job> {
        if !self.has_free_slot() {
            return None;
        }
        let position = self
            .pending
            .iter()
            .position(|job| job.matches(&key.session_id, &key.client_id))?;
        let mut job = self.pending.remove(position)?;
        job.status = JobStatus::Running;
        job.progress = 0.0;
        job.cancellation = Some(token);
        self.slots.push(job);
        self.slots.last()
    }

    /// 运行中任务完成：running → done，进度置100并移出队列
    pub fn complete(&mut self, key: &JobKey) -> Option<Job> {
        let position = self
            .slots
            .iter()
            .position(|job| job.matches(&key.session_id, &key.client_id))?;
        let mut job = self.slots.remove(position);
        job.status = JobStatus::Done;
        job.progress = 100.0;
        Some(job)
    }

    /// 运行中任务失败，移出队列
    pub fn fail(&mut self, key: &JobKey) -> Option<Job> {
        let position = self
            .slots
            .iter()
            .position(|job| job.matches(&key.session_id, &key.client_id))?;
        let mut job = self.slots.remove(position);
        job.status = JobStatus::Error;
        Some(job)
    }

    /// 按身份移除等待或运行中的任务，运行中的任务会触发其取消令牌。
    /// 找不到时返回 None。
    pub fn remove(&mut self, session_id: &str, client_id: &str) -> Option<Job> {
        if let Some(position) = self
            .slots
            .iter()
            .position(|job| job.matches(session_id, client_id))
        {
            let mut job = self.slots.remove(position);
            if let Some(token) = &job.cancellation {
                token.cancel();
            }
            job.status = JobStatus::Cancelled;
            return Some(job);
        }

        let position = self
            .pending
            .iter()
            .position(|job| job.matches(session_id, client_id))?;
        let mut job = self.pending.remove(position)?;
        job.status = JobStatus::Cancelled;
        Some(job)
    }

    /// 查找执行槽中的任务
    pub fn running(&self, key: &JobKey) -> Option<&Job> {
        self.slots
            .iter()
            .find(|job| job.matches(&key.session_id, &key.client_id))
    }

    /// 只更新运行中任务的进度
    pub fn set_progress(&mut self, key: &JobKey, pct: f64) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|job| job.matches(&key.session_id, &key.client_id))
        {
            Some(job) => {
                job.progress = pct.clamp(0.0, 100.0);
                true
            }
            None => false,
        }
    }

    /// 运行中任务在前，等待任务按提交顺序在后
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().chain(self.pending.iter())
    }

    pub fn view(&self, filter: &QueueFilter) -> QueueView {
        let jobs = self.iter().filter(|job| filter.accepts(job));
        if filter.for_progress {
            QueueView::Progress(jobs.map(ProgressEntryView::from).collect())
        } else {
            QueueView::Full(jobs.map(QueueEntryView::from).collect())
        }
    }
}
