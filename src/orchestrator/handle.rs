//! 批量任务句柄
//!
//! 后台任务和展示层共享同一个 `JobHandle`：
//! 后台任务写状态，展示层只读快照、发出停止命令。

use tokio::sync::watch;

use crate::control::CancellationToken;
use crate::models::{ActivePosition, BatchJob, CellState, JobId, JobStatus};
use crate::progress::{CellStateTracker, SheetSnapshot};

#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    status: watch::Sender<JobStatus>,
    active: watch::Sender<Option<ActivePosition>>,
    cancel: CancellationToken,
    cells: CellStateTracker,
}

impl JobHandle {
    pub fn new(job: &BatchJob) -> Self {
        let (status, _) = watch::channel(job.status);
        let (active, _) = watch::channel(job.active);
        Self {
            id: job.id,
            status,
            active,
            cancel: CancellationToken::new(),
            cells: CellStateTracker::new(&job.sheets),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        *self.status.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.status() == JobStatus::Running
    }

    pub fn active(&self) -> Option<ActivePosition> {
        *self.active.borrow()
    }

    /// 调度器当前所在的工作表（任务结束后为 None）
    pub fn active_sheet(&self) -> Option<usize> {
        self.active().map(|pos| pos.sheet)
    }

    pub fn cells(&self) -> &CellStateTracker {
        &self.cells
    }

    pub fn sheet_count(&self) -> usize {
        self.cells.sheet_count()
    }

    pub fn snapshot(&self, sheet: usize) -> Option<Vec<CellState>> {
        self.cells.snapshot(sheet)
    }

    pub fn sheet_snapshot(&self, sheet: usize) -> Option<SheetSnapshot> {
        self.cells.sheet_snapshot(sheet)
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// 请求停止；重复调用或任务已结束时什么也不做
    ///
    /// 返回这次调用是否真正设置了取消标志。
    pub fn stop(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.cancel.cancel()
    }

    /// 等待任务进入终态
    pub async fn finished(&self) -> JobStatus {
        let mut rx = self.status.subscribe();
        let status = match rx.wait_for(|status| status.is_finished()).await {
            Ok(status) => *status,
            Err(_) => self.status(),
        };
        status
    }

    /// 只允许从 Running 进入终态一次
    pub(crate) fn finish(&self, next: JobStatus) -> bool {
        self.status.send_if_modified(|status| {
            if *status == JobStatus::Running && next.is_finished() {
                *status = next;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn set_active(&self, position: Option<ActivePosition>) {
        self.active.send_if_modified(|active| {
            if *active != position {
                *active = position;
                true
            } else {
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Question, SheetState};

    fn handle() -> JobHandle {
        JobHandle::new(&BatchJob::new(
            "wb",
            vec![SheetState::questionnaire(
                "Q",
                vec![Question::new("a", "", 10, 1)],
            )],
        ))
    }

    #[test]
    fn finishes_exactly_once() {
        let handle = handle();
        assert!(handle.finish(JobStatus::Cancelled));
        assert!(!handle.finish(JobStatus::Cancelled));
        assert!(!handle.finish(JobStatus::Completed));
        assert_eq!(handle.status(), JobStatus::Cancelled);
    }

    #[test]
    fn stop_is_idempotent() {
        let handle = handle();
        assert!(handle.stop());
        assert!(!handle.stop());
        assert!(handle.cancel_token().is_cancelled());
    }

    #[test]
    fn stop_after_finish_is_noop() {
        let handle = handle();
        handle.finish(JobStatus::Completed);
        assert!(!handle.stop());
        assert!(!handle.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn finished_resolves_on_terminal_status() {
        let handle = std::sync::Arc::new(handle());
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.finished().await })
        };
        tokio::task::yield_now().await;
        handle.finish(JobStatus::Failed);
        assert_eq!(waiter.await.unwrap(), JobStatus::Failed);
    }

    #[tokio::test]
    async fn finished_returns_at_once_for_done_job() {
        let handle = handle();
        handle.finish(JobStatus::Completed);
        assert_eq!(handle.finished().await, JobStatus::Completed);
    }

    #[test]
    fn snapshot_starts_pending() {
        let handle = handle();
        assert_eq!(handle.snapshot(0), Some(vec![CellState::Pending]));
        assert_eq!(handle.snapshot(1), None);
        assert_eq!(handle.active_sheet(), None);
    }
}
