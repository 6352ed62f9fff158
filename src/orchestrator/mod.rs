//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量任务的调度和生命周期，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `session` - 批量任务会话
//! - 同一时刻只保留一个活动任务，提交新任务时先停止旧任务
//! - 在后台任务中运行调度器
//! - 接收展示层命令：提交 / 停止 / 选择工作表
//!
//! ### `batch_scheduler` - 批量调度器
//! - 按顺序遍历工作表和行
//! - 串行调用 `QuestionPipeline`
//! - 推进单元格状态、发出进度事件
//! - 任务完成后调用一次结果落盘
//!
//! ### `handle` - 任务句柄
//! - 后台任务与展示层共享的只读视图和停止开关
//!
//! ## 层次关系
//!
//! ```text
//! session (一个活动 BatchJob)
//!     ↓
//! batch_scheduler (处理 Vec<SheetState>)
//!     ↓
//! workflow::QuestionPipeline (处理单个 Question)
//!     ↓
//! services (能力层：generate / validate / persist)
//!     ↓
//! infrastructure (基础设施：LLM 客户端、HTTP 客户端)
//! ```

pub mod batch_scheduler;
pub mod handle;
pub mod session;

pub use batch_scheduler::BatchScheduler;
pub use handle::JobHandle;
pub use session::{BatchSession, Submission};
