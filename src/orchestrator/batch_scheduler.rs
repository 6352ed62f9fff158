//! 批量调度器 - 编排层
//!
//! ## 职责
//!
//! 在后台任务中按顺序处理一个 `BatchJob` 的所有工作表和行：
//!
//! 1. **遍历工作表**：非问卷表直接标记 Skipped，内容不动
//! 2. **遍历行**：每行之前检查取消标志，然后串行调用 `QuestionPipeline`
//! 3. **状态推进**：写 `CellStateTracker`，同时发出进度事件
//! 4. **快速失败**：任一行出现基础设施错误，整个任务立即 Failed
//! 5. **结果落盘**：只有任务 Completed 之后才调用一次 `ResultSink`

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::models::{
    ActivePosition, BatchJob, BatchSummary, CellState, ErrorCode, JobStatus, Outcome,
    SheetState, SheetStatus,
};
use crate::orchestrator::handle::JobHandle;
use crate::progress::{ProgressEvent, ProgressSender};
use crate::services::ResultSink;
use crate::utils::logging;
use crate::utils::text::truncate_text;
use crate::workflow::QuestionPipeline;

pub struct BatchScheduler {
    pipeline: Arc<QuestionPipeline>,
    sink: Arc<dyn ResultSink>,
    events: ProgressSender,
    handle: Arc<JobHandle>,
}

impl BatchScheduler {
    pub fn new(
        pipeline: Arc<QuestionPipeline>,
        sink: Arc<dyn ResultSink>,
        events: ProgressSender,
        handle: Arc<JobHandle>,
    ) -> Self {
        Self {
            pipeline,
            sink,
            events,
            handle,
        }
    }

    /// 处理整个任务，返回汇总
    ///
    /// 调度器拥有 `job`；结束时发送端随之释放，接收端读完剩余事件后收到 None。
    pub async fn run(self, mut job: BatchJob) -> BatchSummary {
        logging::log_job_start(job.id, &job.source, job.sheet_count(), job.eligible_rows());

        for sheet_index in 0..job.sheets.len() {
            if self.handle.cancel_token().is_cancelled() {
                return self.cancel(job);
            }

            if !job.sheets[sheet_index].is_questionnaire() {
                self.skip_sheet(&mut job, sheet_index);
                continue;
            }

            self.start_sheet(&mut job, sheet_index);

            for row in 0..job.sheets[sheet_index].row_count() {
                if self.handle.cancel_token().is_cancelled() {
                    return self.cancel(job);
                }

                let result = {
                    let Some(question) = job.sheets[sheet_index].rows()[row].question.as_ref()
                    else {
                        continue;
                    };

                    self.move_to(&mut job.active, sheet_index, Some(row));
                    self.advance(sheet_index, row, CellState::Working);
                    self.events.emit(ProgressEvent::CellWorking {
                        sheet: sheet_index,
                        row,
                    });
                    log_row_start(sheet_index, row, &question.text);

                    self.pipeline.run(question).await
                };

                let outcome = result.outcome();
                match outcome {
                    Outcome::Succeeded => {
                        self.advance(sheet_index, row, CellState::Completed);
                        let text = result
                            .answer
                            .as_ref()
                            .map(|a| a.text.clone())
                            .unwrap_or_default();
                        info!(
                            "[工作表 {}] [行 {}] ✓ 完成 (重试 {} 次，耗时 {:.1}s)",
                            sheet_index,
                            row,
                            result.retries_used,
                            result.elapsed.as_secs_f64()
                        );
                        self.events.emit(ProgressEvent::CellCompleted {
                            sheet: sheet_index,
                            row,
                            text,
                        });
                    }
                    Outcome::FailedContent | Outcome::FailedInfra => {
                        self.advance(sheet_index, row, CellState::Failed);
                        let code = result.error.unwrap_or(ErrorCode::ServiceError);
                        warn!("[工作表 {}] [行 {}] ❌ 失败: {}", sheet_index, row, code);
                        self.events.emit(ProgressEvent::CellFailed {
                            sheet: sheet_index,
                            row,
                            error: code,
                        });
                    }
                }

                let error = result.error;
                job.sheets[sheet_index].record_result(row, result);

                if outcome == Outcome::FailedInfra {
                    return self.fail(job, error.unwrap_or(ErrorCode::ServiceError));
                }
            }

            self.complete_sheet(&mut job, sheet_index);
        }

        self.complete(job).await
    }

    fn skip_sheet(&self, job: &mut BatchJob, sheet_index: usize) {
        let sheet = &mut job.sheets[sheet_index];
        info!("[工作表 {}] ⏭️ 非问卷工作表，跳过: {}", sheet_index, sheet.name);
        sheet.status = SheetStatus::Skipped;
        if let Err(e) = self
            .handle
            .cells()
            .set_sheet_status(sheet_index, SheetStatus::Skipped)
        {
            error!("{}", e);
        }
    }

    fn start_sheet(&self, job: &mut BatchJob, sheet_index: usize) {
        let sheet = &mut job.sheets[sheet_index];
        logging::log_sheet_start(sheet_index, &sheet.name, sheet.row_count());
        sheet.status = SheetStatus::InProgress;
        if let Err(e) = self
            .handle
            .cells()
            .set_sheet_status(sheet_index, SheetStatus::InProgress)
        {
            error!("{}", e);
        }
        self.move_to(&mut job.active, sheet_index, None);
        self.events.emit(ProgressEvent::SheetStarted { sheet: sheet_index });
    }

    fn complete_sheet(&self, job: &mut BatchJob, sheet_index: usize) {
        let sheet = &mut job.sheets[sheet_index];
        sheet.status = SheetStatus::Completed;
        if let Err(e) = self
            .handle
            .cells()
            .set_sheet_status(sheet_index, SheetStatus::Completed)
        {
            error!("{}", e);
        }

        let (completed, failed) = count_outcomes(std::slice::from_ref(sheet));
        logging::log_sheet_complete(sheet_index, &sheet.name, completed, failed);
        self.events
            .emit(ProgressEvent::SheetCompleted { sheet: sheet_index });
    }

    fn advance(&self, sheet: usize, row: usize, next: CellState) {
        if let Err(e) = self.handle.cells().advance(sheet, row, next) {
            error!("{}", e);
        }
    }

    fn move_to(&self, active: &mut Option<ActivePosition>, sheet: usize, row: Option<usize>) {
        let position = Some(ActivePosition { sheet, row });
        *active = position;
        self.handle.set_active(position);
    }

    fn cancel(&self, mut job: BatchJob) -> BatchSummary {
        job.status = JobStatus::Cancelled;
        self.handle.finish(JobStatus::Cancelled);
        self.handle.set_active(None);
        self.events.emit(ProgressEvent::BatchCancelled);

        let summary = summarize(&job, false);
        warn!(
            "[任务 {}] ⏹️ 已停止：已完成 {} 行，失败 {} 行，结果未保存",
            job.id, summary.completed_rows, summary.failed_rows
        );
        summary
    }

    fn fail(&self, mut job: BatchJob, code: ErrorCode) -> BatchSummary {
        job.status = JobStatus::Failed;
        self.handle.finish(JobStatus::Failed);
        self.handle.set_active(None);
        self.events.emit(ProgressEvent::BatchFailed { error: code });

        error!("[任务 {}] ❌ 服务不可用，任务中止: {}", job.id, code);
        summarize(&job, false)
    }

    async fn complete(&self, mut job: BatchJob) -> BatchSummary {
        job.status = JobStatus::Completed;
        job.active = None;
        self.handle.finish(JobStatus::Completed);
        self.handle.set_active(None);
        self.events.emit(ProgressEvent::BatchCompleted);

        let persisted = match self.sink.persist(job.id, &job.sheets).await {
            Ok(()) => true,
            Err(e) => {
                error!("[任务 {}] 结果保存失败: {}", job.id, e);
                false
            }
        };

        let summary = summarize(&job, persisted);
        logging::log_job_complete(&summary);
        summary
    }
}

fn count_outcomes(sheets: &[SheetState]) -> (usize, usize) {
    sheets
        .iter()
        .flat_map(|sheet| sheet.results().iter().flatten())
        .fold((0, 0), |(ok, failed), result| {
            if result.success {
                (ok + 1, failed)
            } else {
                (ok, failed + 1)
            }
        })
}

fn summarize(job: &BatchJob, persisted: bool) -> BatchSummary {
    let (completed_rows, failed_rows) = count_outcomes(&job.sheets);
    BatchSummary {
        job_id: job.id,
        status: job.status,
        completed_rows,
        failed_rows,
        persisted,
    }
}

// ========== 日志辅助函数 ==========

fn log_row_start(sheet: usize, row: usize, question: &str) {
    info!("\n[工作表 {}] {}", sheet, "─".repeat(30));
    info!(
        "[工作表 {}] [行 {}] 处理: {}",
        sheet,
        row,
        truncate_text(question, 50)
    );
}
