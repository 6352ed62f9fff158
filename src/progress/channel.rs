//! 进度事件通道
//!
//! 单生产者（后台任务）、单消费者（展示层），严格按产生顺序投递。
//! 通道有容量上限；满了以后后台任务不会等待，而是丢弃该事件并记一次滞后，
//! 消费方发现滞后后应从 `CellStateTracker` 重新读取快照。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::models::ErrorCode;

/// 进度事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    SheetStarted { sheet: usize },
    CellWorking { sheet: usize, row: usize },
    CellCompleted { sheet: usize, row: usize, text: String },
    CellFailed { sheet: usize, row: usize, error: ErrorCode },
    SheetCompleted { sheet: usize },
    BatchCompleted,
    BatchFailed { error: ErrorCode },
    BatchCancelled,
}

impl ProgressEvent {
    /// 任务结束事件，之后不会再有事件
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::BatchCompleted
                | ProgressEvent::BatchFailed { .. }
                | ProgressEvent::BatchCancelled
        )
    }

    pub fn sheet(&self) -> Option<usize> {
        match self {
            ProgressEvent::SheetStarted { sheet }
            | ProgressEvent::CellWorking { sheet, .. }
            | ProgressEvent::CellCompleted { sheet, .. }
            | ProgressEvent::CellFailed { sheet, .. }
            | ProgressEvent::SheetCompleted { sheet } => Some(*sheet),
            _ => None,
        }
    }
}

/// 创建一对进度通道端点
pub fn progress_channel(capacity: usize) -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let lagged = Arc::new(AtomicU64::new(0));
    (
        ProgressSender {
            tx,
            lagged: lagged.clone(),
        },
        ProgressReceiver { rx, lagged },
    )
}

/// 后台任务持有的发送端
#[derive(Debug)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressEvent>,
    lagged: Arc<AtomicU64>,
}

impl ProgressSender {
    /// 发送事件，从不等待
    ///
    /// 返回事件是否进入了通道。
    pub fn emit(&self, event: ProgressEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                self.lagged.fetch_add(1, Ordering::AcqRel);
                warn!("进度通道已满，丢弃事件: {:?}", event);
                false
            }
            Err(TrySendError::Closed(event)) => {
                debug!("进度通道已关闭，忽略事件: {:?}", event);
                false
            }
        }
    }
}

/// 展示层持有的接收端
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::Receiver<ProgressEvent>,
    lagged: Arc<AtomicU64>,
}

impl ProgressReceiver {
    /// 等待下一条事件；发送端释放且事件读完后返回 None
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }

    /// 取出当前已到达的全部事件
    pub fn drain(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }

    /// 自上次调用以来丢弃的事件数，读取后清零
    pub fn take_lagged(&self) -> u64 {
        self.lagged.swap(0, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_production_order() {
        let (tx, mut rx) = progress_channel(16);
        tx.emit(ProgressEvent::SheetStarted { sheet: 0 });
        tx.emit(ProgressEvent::CellWorking { sheet: 0, row: 0 });
        tx.emit(ProgressEvent::CellCompleted {
            sheet: 0,
            row: 0,
            text: "ok".into(),
        });
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                ProgressEvent::SheetStarted { sheet: 0 },
                ProgressEvent::CellWorking { sheet: 0, row: 0 },
                ProgressEvent::CellCompleted {
                    sheet: 0,
                    row: 0,
                    text: "ok".into()
                },
            ]
        );
    }

    #[test]
    fn full_channel_drops_and_counts_lag() {
        let (tx, mut rx) = progress_channel(2);
        assert!(tx.emit(ProgressEvent::SheetStarted { sheet: 0 }));
        assert!(tx.emit(ProgressEvent::CellWorking { sheet: 0, row: 0 }));
        assert!(!tx.emit(ProgressEvent::CellWorking { sheet: 0, row: 1 }));
        assert!(!tx.emit(ProgressEvent::BatchCompleted));

        assert_eq!(rx.take_lagged(), 2);
        assert_eq!(rx.take_lagged(), 0);
        assert_eq!(rx.drain().len(), 2);
    }

    #[test]
    fn closed_receiver_is_ignored() {
        let (tx, rx) = progress_channel(4);
        drop(rx);
        assert!(!tx.emit(ProgressEvent::BatchCancelled));
    }

    #[test]
    fn terminal_events() {
        assert!(ProgressEvent::BatchCancelled.is_terminal());
        assert!(ProgressEvent::BatchFailed {
            error: ErrorCode::Timeout
        }
        .is_terminal());
        assert!(!ProgressEvent::SheetCompleted { sheet: 1 }.is_terminal());
    }
}
