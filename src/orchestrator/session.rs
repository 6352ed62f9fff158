//! 批量任务会话 - 编排层
//!
//! 一个会话同一时刻最多只有一个活动任务。
//! 提交新任务时先停止旧任务并等待它退出，再启动新任务。
//! 展示层通过会话发出命令（提交 / 停止 / 选择工作表），
//! 通过 `JobHandle` 和进度通道读取状态。

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::control::NavigationLock;
use crate::models::{BatchJob, BatchSummary, CellState};
use crate::orchestrator::batch_scheduler::BatchScheduler;
use crate::orchestrator::handle::JobHandle;
use crate::progress::{progress_channel, ProgressReceiver};
use crate::services::ResultSink;
use crate::workflow::QuestionPipeline;

/// 提交任务后交给展示层的两样东西
pub struct Submission {
    pub handle: Arc<JobHandle>,
    pub events: ProgressReceiver,
}

struct ActiveJob {
    handle: Arc<JobHandle>,
    worker: Option<JoinHandle<BatchSummary>>,
    summary: Option<BatchSummary>,
}

pub struct BatchSession {
    pipeline: Arc<QuestionPipeline>,
    sink: Arc<dyn ResultSink>,
    progress_capacity: usize,
    current: Option<ActiveJob>,
    navigation: NavigationLock,
}

impl BatchSession {
    pub fn new(
        pipeline: Arc<QuestionPipeline>,
        sink: Arc<dyn ResultSink>,
        progress_capacity: usize,
    ) -> Self {
        Self {
            pipeline,
            sink,
            progress_capacity,
            current: None,
            navigation: NavigationLock::new(),
        }
    }

    /// 提交新任务
    ///
    /// 如果旧任务还在运行，先请求停止并等待它在下一个检查点退出。
    pub async fn submit(&mut self, job: BatchJob) -> Submission {
        if let Some(previous) = self.current.take() {
            if previous.handle.stop() {
                info!("[任务 {}] 收到新任务，停止当前任务", previous.handle.id());
            }
            Self::join(previous).await;
        }

        // 锁定只对当前任务有效
        self.navigation.release();

        let handle = Arc::new(JobHandle::new(&job));
        let (sender, events) = progress_channel(self.progress_capacity);
        let scheduler = BatchScheduler::new(
            self.pipeline.clone(),
            self.sink.clone(),
            sender,
            handle.clone(),
        );
        let worker = tokio::spawn(scheduler.run(job));

        self.current = Some(ActiveJob {
            handle: handle.clone(),
            worker: Some(worker),
            summary: None,
        });

        Submission { handle, events }
    }

    /// 停止当前任务；没有任务或任务已结束时什么也不做
    pub fn stop(&self) -> bool {
        self.current
            .as_ref()
            .map(|job| job.handle.stop())
            .unwrap_or(false)
    }

    /// 等待当前任务结束并返回汇总；可重复调用
    pub async fn wait(&mut self) -> Option<BatchSummary> {
        let job = self.current.as_mut()?;
        if let Some(worker) = job.worker.take() {
            match worker.await {
                Ok(summary) => job.summary = Some(summary),
                Err(e) => error!("[任务 {}] 后台任务异常退出: {}", job.handle.id(), e),
            }
        }
        job.summary.clone()
    }

    pub fn current(&self) -> Option<Arc<JobHandle>> {
        self.current.as_ref().map(|job| job.handle.clone())
    }

    /// 用户手动选择工作表，之后不再自动跟随
    pub fn select_sheet(&self, sheet: usize) -> bool {
        match &self.current {
            Some(job) if sheet < job.handle.sheet_count() => {
                self.navigation.pin(sheet);
                true
            }
            _ => false,
        }
    }

    /// 用户选择恢复自动跟随
    pub fn follow_active(&self) {
        self.navigation.release();
    }

    pub fn is_pinned(&self) -> bool {
        self.navigation.is_pinned()
    }

    /// 当前应该显示的工作表：锁定优先，否则为调度器正在处理的工作表
    pub fn displayed_sheet(&self) -> Option<usize> {
        let active = self.current.as_ref().and_then(|job| job.handle.active_sheet());
        self.navigation.resolve(active)
    }

    pub fn snapshot(&self, sheet: usize) -> Option<Vec<CellState>> {
        self.current.as_ref()?.handle.snapshot(sheet)
    }

    async fn join(mut job: ActiveJob) {
        if let Some(worker) = job.worker.take() {
            if let Err(e) = worker.await {
                error!("[任务 {}] 后台任务异常退出: {}", job.handle.id(), e);
            }
        }
    }
}
