mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{question, wait_for_cell, RecordingSink, ScriptedAgent};
use questionnaire_agent::{
    BatchJob, BatchSession, CellState, JobStatus, ProgressEvent, QuestionPipeline, SheetState,
};
use tokio::sync::Semaphore;

fn session(agent: Arc<ScriptedAgent>, sink: Arc<RecordingSink>) -> BatchSession {
    let pipeline = Arc::new(QuestionPipeline::new(agent, Duration::from_secs(30)));
    BatchSession::new(pipeline, sink, 64)
}

fn two_sheet_job() -> BatchJob {
    BatchJob::new(
        "workbook",
        vec![
            SheetState::questionnaire("A", vec![question("a0"), question("a1")]),
            SheetState::questionnaire("B", vec![question("b0")]),
        ],
    )
}

#[tokio::test]
async fn test_runs_job_to_completion() {
    let sink = Arc::new(RecordingSink::new());
    let mut session = session(Arc::new(ScriptedAgent::new()), sink.clone());

    let mut submission = session.submit(two_sheet_job()).await;
    let mut events = Vec::new();
    while let Some(event) = submission.events.recv().await {
        events.push(event);
    }

    assert_eq!(events.last(), Some(&ProgressEvent::BatchCompleted));
    let summary = session.wait().await.unwrap();
    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.completed_rows, 3);
    assert!(summary.persisted);
    assert_eq!(sink.jobs(), vec![submission.handle.id()]);

    // 可重复读取
    assert_eq!(session.wait().await, Some(summary));
}

#[tokio::test]
async fn test_stop_twice_cancels_once() {
    let gate = Arc::new(Semaphore::new(0));
    let agent = Arc::new(ScriptedAgent::new().with_gate(gate.clone()));
    let sink = Arc::new(RecordingSink::new());
    let mut session = session(agent, sink.clone());

    let mut submission = session.submit(two_sheet_job()).await;
    wait_for_cell(&submission.handle, 0, 0, CellState::Working).await;

    assert!(session.stop());
    assert!(!session.stop());
    gate.add_permits(10);

    let mut cancelled = 0;
    while let Some(event) = submission.events.recv().await {
        if event == ProgressEvent::BatchCancelled {
            cancelled += 1;
        }
    }
    assert_eq!(cancelled, 1);

    let summary = session.wait().await.unwrap();
    assert_eq!(summary.status, JobStatus::Cancelled);
    assert_eq!(submission.handle.status(), JobStatus::Cancelled);
    assert_eq!(sink.count(), 0);

    // 任务结束后再停止也是无害的
    assert!(!session.stop());
}

#[tokio::test]
async fn test_stop_without_job_is_noop() {
    let session = session(Arc::new(ScriptedAgent::new()), Arc::new(RecordingSink::new()));
    assert!(!session.stop());
    assert!(session.current().is_none());
    assert_eq!(session.displayed_sheet(), None);
    assert!(!session.select_sheet(0));
}

#[tokio::test]
async fn test_new_submission_cancels_running_job() {
    let gate = Arc::new(Semaphore::new(0));
    let agent = Arc::new(ScriptedAgent::new().with_gate(gate.clone()));
    let sink = Arc::new(RecordingSink::new());
    let mut session = session(agent, sink.clone());

    let first = session.submit(two_sheet_job()).await;
    wait_for_cell(&first.handle, 0, 0, CellState::Working).await;

    let release = {
        let gate = gate.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            gate.add_permits(100);
        })
    };

    let second = session.submit(two_sheet_job()).await;
    // 新任务开始之前旧任务已经结束
    assert_eq!(first.handle.status(), JobStatus::Cancelled);
    assert_eq!(first.handle.snapshot(0), Some(vec![CellState::Completed, CellState::Pending]));

    release.await.unwrap();
    let summary = session.wait().await.unwrap();
    assert_eq!(summary.job_id, second.handle.id());
    assert_eq!(summary.status, JobStatus::Completed);

    // 只有第二个任务落盘
    assert_eq!(sink.jobs(), vec![second.handle.id()]);
}

#[tokio::test]
async fn test_navigation_lock_overrides_auto_follow() {
    let gate = Arc::new(Semaphore::new(0));
    let agent = Arc::new(ScriptedAgent::new().with_gate(gate.clone()));
    let mut session = session(agent, Arc::new(RecordingSink::new()));

    let submission = session.submit(two_sheet_job()).await;
    wait_for_cell(&submission.handle, 0, 0, CellState::Working).await;

    // 未锁定时跟随调度器
    assert_eq!(session.displayed_sheet(), Some(0));

    assert!(session.select_sheet(1));
    assert!(!session.select_sheet(5));
    assert_eq!(session.displayed_sheet(), Some(1));

    // 调度器推进到下一张表、任务完成都不会解除锁定
    gate.add_permits(100);
    session.wait().await.unwrap();
    assert!(session.is_pinned());
    assert_eq!(session.displayed_sheet(), Some(1));

    session.follow_active();
    assert_eq!(session.displayed_sheet(), None);
}

#[tokio::test]
async fn test_lock_resets_for_new_job() {
    let mut session = session(Arc::new(ScriptedAgent::new()), Arc::new(RecordingSink::new()));

    session.submit(two_sheet_job()).await;
    session.wait().await.unwrap();
    assert!(session.select_sheet(1));

    session.submit(two_sheet_job()).await;
    assert!(!session.is_pinned());
    session.wait().await.unwrap();
}

#[tokio::test]
async fn test_snapshot_reads_current_job() {
    let mut session = session(Arc::new(ScriptedAgent::new()), Arc::new(RecordingSink::new()));
    session.submit(two_sheet_job()).await;
    session.wait().await.unwrap();

    assert_eq!(
        session.snapshot(0),
        Some(vec![CellState::Completed, CellState::Completed])
    );
    assert_eq!(session.snapshot(1), Some(vec![CellState::Completed]));
    assert_eq!(session.snapshot(2), None);
}
