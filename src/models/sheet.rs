use serde::{Deserialize, Serialize};

use crate::models::question::{ProcessingResult, Question};

/// 单行的处理状态
///
/// 只能向前推进：Pending → Working → {Completed | Failed}。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    Pending,
    Working,
    Completed,
    Failed,
}

impl CellState {
    /// 偏序中的层级：Pending < Working < {Completed, Failed}
    pub fn rank(self) -> u8 {
        match self {
            CellState::Pending => 0,
            CellState::Working => 1,
            CellState::Completed | CellState::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    /// 是否允许从 `self` 转到 `next`
    pub fn can_advance_to(self, next: CellState) -> bool {
        matches!(
            (self, next),
            (CellState::Pending, CellState::Working)
                | (CellState::Working, CellState::Completed)
                | (CellState::Working, CellState::Failed)
        )
    }
}

/// 工作表分类：只有问卷表会送入流程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SheetKind {
    Questionnaire,
    NonQuestionnaire,
}

/// 工作表级状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SheetStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Skipped,
}

impl SheetStatus {
    pub fn can_advance_to(self, next: SheetStatus) -> bool {
        matches!(
            (self, next),
            (SheetStatus::NotStarted, SheetStatus::InProgress)
                | (SheetStatus::NotStarted, SheetStatus::Skipped)
                | (SheetStatus::InProgress, SheetStatus::Completed)
        )
    }
}

/// 工作表中的一行
///
/// `question` 为空表示该行不参与处理（说明行、空行或非问卷表的内容），
/// 但仍占据行号，保证与状态数组一一对齐。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub display: String,
    pub question: Option<Question>,
}

impl Row {
    pub fn question(question: Question) -> Self {
        Self {
            display: question.text.clone(),
            question: Some(question),
        }
    }

    pub fn display_only(display: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            question: None,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.question.is_some()
    }
}

/// 工作表状态
///
/// 行列表加载后不再增减；每行的 `CellState` 由 `CellStateTracker` 按相同下标维护。
#[derive(Debug, Clone, PartialEq)]
pub struct SheetState {
    pub name: String,
    pub kind: SheetKind,
    pub status: SheetStatus,
    rows: Vec<Row>,
    results: Vec<Option<ProcessingResult>>,
}

impl SheetState {
    pub fn new(name: impl Into<String>, kind: SheetKind, rows: Vec<Row>) -> Self {
        let results = vec![None; rows.len()];
        Self {
            name: name.into(),
            kind,
            status: SheetStatus::NotStarted,
            rows,
            results,
        }
    }

    pub fn questionnaire(name: impl Into<String>, questions: Vec<Question>) -> Self {
        Self::new(
            name,
            SheetKind::Questionnaire,
            questions.into_iter().map(Row::question).collect(),
        )
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_questionnaire(&self) -> bool {
        self.kind == SheetKind::Questionnaire
    }

    /// 第 `row` 行的处理结果（未处理时为 None）
    pub fn result(&self, row: usize) -> Option<&ProcessingResult> {
        self.results.get(row).and_then(Option::as_ref)
    }

    pub fn results(&self) -> &[Option<ProcessingResult>] {
        &self.results
    }

    pub(crate) fn record_result(&mut self, row: usize, result: ProcessingResult) {
        if let Some(slot) = self.results.get_mut(row) {
            *slot = Some(result);
        }
    }
}
