//! 错误类型
//!
//! 库内各层边界使用 `thiserror` 定义的结构化错误；
//! 应用入口（`main` / `App`）统一使用 `anyhow::Result`。

use thiserror::Error;

use crate::models::{CellState, ErrorCode, SheetStatus};

/// Agent 能力调用错误
///
/// 所有变体在流程层一律归类为基础设施失败（FailedInfra），不消耗重试次数。
#[derive(Debug, Error)]
pub enum AgentError {
    /// 远程服务返回错误
    #[error("Agent 服务错误 ({operation}): {message}")]
    Service {
        operation: &'static str,
        message: String,
    },
    /// 网络连接失败
    #[error("Agent 连接失败 ({operation}): {message}")]
    Connectivity {
        operation: &'static str,
        message: String,
    },
    /// 单次调用超时
    #[error("Agent 调用超时 ({operation}): 超过 {timeout_secs} 秒")]
    Timeout {
        operation: &'static str,
        timeout_secs: u64,
    },
    /// 服务返回了无法解析的内容
    #[error("Agent 返回内容无法解析 ({operation}): {detail}")]
    Malformed {
        operation: &'static str,
        detail: String,
    },
}

impl AgentError {
    pub fn service(operation: &'static str, message: impl Into<String>) -> Self {
        AgentError::Service {
            operation,
            message: message.into(),
        }
    }

    pub fn connectivity(operation: &'static str, message: impl Into<String>) -> Self {
        AgentError::Connectivity {
            operation,
            message: message.into(),
        }
    }

    pub fn malformed(operation: &'static str, detail: impl Into<String>) -> Self {
        AgentError::Malformed {
            operation,
            detail: detail.into(),
        }
    }

    /// 映射为处理结果中的错误码
    pub fn code(&self) -> ErrorCode {
        match self {
            AgentError::Service { .. } | AgentError::Malformed { .. } => ErrorCode::ServiceError,
            AgentError::Connectivity { .. } => ErrorCode::ConnectivityError,
            AgentError::Timeout { .. } => ErrorCode::Timeout,
        }
    }
}

/// 工作簿加载错误
#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("读取工作簿失败 ({path}): {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("解析工作簿失败 ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("工作簿不包含任何工作表: {path}")]
    Empty { path: String },
    #[error("工作表 {sheet} 的字数限制必须为正整数")]
    InvalidLimit { sheet: String },
}

/// 结果持久化错误
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("写入结果文件失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("序列化结果失败: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// 单元格状态更新错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// 行状态只能向前推进
    #[error("工作表 {sheet} 第 {row} 行状态不可从 {from:?} 变为 {to:?}")]
    InvalidTransition {
        sheet: usize,
        row: usize,
        from: CellState,
        to: CellState,
    },
    #[error("工作表 {sheet} 状态不可从 {from:?} 变为 {to:?}")]
    InvalidSheetTransition {
        sheet: usize,
        from: SheetStatus,
        to: SheetStatus,
    },
    #[error("位置越界: 工作表 {sheet} 第 {row:?} 行")]
    OutOfRange { sheet: usize, row: Option<usize> },
}

/// 单题（非批量）调用的错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnswerError {
    /// 内容校验多次未通过
    #[error("无法生成可接受的回答（已重试 {retries_used} 次）")]
    Unacceptable { retries_used: u32 },
    /// 远程服务不可用
    #[error("远程服务不可用: {0}")]
    Infrastructure(ErrorCode),
}
