use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::sheet::SheetState;

pub type JobId = u64;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// 批量任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Cancelled,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// 调度器当前所在位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePosition {
    pub sheet: usize,
    pub row: Option<usize>,
}

/// 一次完整的批量处理任务
///
/// 提交后由调度器独占；展示层只通过 `JobHandle` 读取状态。
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub id: JobId,
    pub status: JobStatus,
    pub sheets: Vec<SheetState>,
    pub active: Option<ActivePosition>,
    /// 来源名称（通常是工作簿文件名），用于日志和结果文件
    pub source: String,
}

impl BatchJob {
    pub fn new(source: impl Into<String>, sheets: Vec<SheetState>) -> Self {
        Self {
            id: NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed),
            status: JobStatus::Running,
            sheets,
            active: None,
            source: source.into(),
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// 需要送入流程的行数
    pub fn eligible_rows(&self) -> usize {
        self.sheets
            .iter()
            .filter(|sheet| sheet.is_questionnaire())
            .map(|sheet| sheet.rows().iter().filter(|row| row.is_eligible()).count())
            .sum()
    }
}

/// 批量任务结束后的汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub job_id: JobId,
    pub status: JobStatus,
    pub completed_rows: usize,
    pub failed_rows: usize,
    /// 结果是否已写入
    pub persisted: bool,
}
