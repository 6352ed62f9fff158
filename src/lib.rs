//! # Questionnaire Agent
//!
//! 一个用于自动填写问卷工作簿的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `LlmClient` - 唯一的 LLM 客户端
//! - `LinkChecker` - 唯一的 HTTP 客户端（链接检查）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个问题
//! - `AgentCapability` - 生成 / 审核回答 / 检查链接
//! - `LlmAgent` - 基于 LLM 的实现
//! - `ResultWriter` - 结果落盘能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一道题"的完整处理流程
//! - `QuestionPipeline` - 显式状态机（生成 → 审核 → 链接检查 → 重试）
//! - `TargetLengthSchedule` - 重试时的目标长度收紧策略
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/session` - 单个活动任务的提交、停止、导航
//! - `orchestrator/batch_scheduler` - 按顺序处理工作表和行
//!
//! ### 进度与控制
//! - `progress/` - 有序进度事件 + 单元格状态快照
//! - `control/` - 取消标志 + 工作表导航锁定
//!
//! ## 模块结构

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use control::{CancellationToken, NavigationLock};
pub use error::{AgentError, AnswerError, PersistError, TrackerError, WorkbookError};
pub use models::{
    Answer, BatchJob, BatchSummary, CellState, ErrorCode, JobStatus, ProcessingResult, Question,
    SheetKind, SheetState, SheetStatus,
};
pub use orchestrator::{BatchScheduler, BatchSession, JobHandle, Submission};
pub use progress::{progress_channel, CellStateTracker, ProgressEvent, ProgressReceiver};
pub use services::{AgentCapability, LinkVerdict, ResultSink, ResultWriter, Verdict};
pub use workflow::{QuestionPipeline, TargetLengthSchedule};
