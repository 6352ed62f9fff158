//! 单元格状态跟踪
//!
//! 每张工作表一个 `watch` 通道：后台任务是唯一的写入方，
//! 展示层随时可以复制一份当前快照，读取不会阻塞写入方的推进。
//! 事件通道丢了消息时，以这里的快照为准恢复界面。

use tokio::sync::watch;

use crate::error::TrackerError;
use crate::models::{CellState, SheetState, SheetStatus};

/// 一张工作表在某一时刻的状态副本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSnapshot {
    pub status: SheetStatus,
    pub cells: Vec<CellState>,
}

impl SheetSnapshot {
    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|c| **c == state).count()
    }
}

#[derive(Debug)]
pub struct CellStateTracker {
    sheets: Vec<watch::Sender<SheetSnapshot>>,
}

impl CellStateTracker {
    /// 按工作表的行数建立状态数组，之后长度不再变化
    pub fn new(sheets: &[SheetState]) -> Self {
        let sheets = sheets
            .iter()
            .map(|sheet| {
                let (tx, _rx) = watch::channel(SheetSnapshot {
                    status: sheet.status,
                    cells: vec![CellState::Pending; sheet.row_count()],
                });
                tx
            })
            .collect();
        Self { sheets }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// 第 `sheet` 张表所有行的状态（按行序）
    pub fn snapshot(&self, sheet: usize) -> Option<Vec<CellState>> {
        self.sheets.get(sheet).map(|tx| tx.borrow().cells.clone())
    }

    pub fn sheet_snapshot(&self, sheet: usize) -> Option<SheetSnapshot> {
        self.sheets.get(sheet).map(|tx| tx.borrow().clone())
    }

    pub fn sheet_status(&self, sheet: usize) -> Option<SheetStatus> {
        self.sheets.get(sheet).map(|tx| tx.borrow().status)
    }

    /// 订阅某张表的变化通知
    pub fn subscribe(&self, sheet: usize) -> Option<watch::Receiver<SheetSnapshot>> {
        self.sheets.get(sheet).map(watch::Sender::subscribe)
    }

    /// 推进一行的状态；不允许回退或跳级
    pub(crate) fn advance(
        &self,
        sheet: usize,
        row: usize,
        next: CellState,
    ) -> Result<(), TrackerError> {
        let tx = self.sheets.get(sheet).ok_or(TrackerError::OutOfRange {
            sheet,
            row: Some(row),
        })?;

        let mut outcome = Ok(());
        tx.send_if_modified(|snapshot| match snapshot.cells.get_mut(row) {
            None => {
                outcome = Err(TrackerError::OutOfRange {
                    sheet,
                    row: Some(row),
                });
                false
            }
            Some(current) if !current.can_advance_to(next) => {
                outcome = Err(TrackerError::InvalidTransition {
                    sheet,
                    row,
                    from: *current,
                    to: next,
                });
                false
            }
            Some(current) => {
                *current = next;
                true
            }
        });
        outcome
    }

    pub(crate) fn set_sheet_status(
        &self,
        sheet: usize,
        next: SheetStatus,
    ) -> Result<(), TrackerError> {
        let tx = self
            .sheets
            .get(sheet)
            .ok_or(TrackerError::OutOfRange { sheet, row: None })?;

        let mut outcome = Ok(());
        tx.send_if_modified(|snapshot| {
            if snapshot.status.can_advance_to(next) {
                snapshot.status = next;
                true
            } else {
                outcome = Err(TrackerError::InvalidSheetTransition {
                    sheet,
                    from: snapshot.status,
                    to: next,
                });
                false
            }
        });
        outcome
    }
}
