//! 日志工具模块
//!
//! 提供日志初始化和格式化输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{BatchSummary, JobId, JobStatus};

/// 初始化 tracing 订阅者
///
/// 默认 `info` 级别，可通过 `RUST_LOG` 覆盖；重复调用不会出错。
pub fn init() {
    init_with_default("info");
}

/// 以指定的默认级别初始化（`RUST_LOG` 仍然优先）
pub fn init_with_default(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 问卷自动填写模式");
    info!("🤖 模型: {}", config.llm_model_name);
    info!(
        "📏 默认字数限制: {}，默认最大重试: {}",
        config.default_char_limit, config.default_max_retries
    );
    info!("⏱️ 单次调用超时: {} 秒", config.agent_call_timeout_secs);
    info!("{}", "=".repeat(60));
}

/// 记录任务开始信息
pub fn log_job_start(job_id: JobId, source: &str, sheet_count: usize, eligible_rows: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 [任务 {}] 开始处理: {}", job_id, source);
    info!(
        "📄 [任务 {}] 工作表 {} 张，待回答 {} 行",
        job_id, sheet_count, eligible_rows
    );
    info!("{}", "=".repeat(60));
}

/// 记录工作表开始信息
pub fn log_sheet_start(sheet: usize, name: &str, rows: usize) {
    info!("[工作表 {}] 开始处理", sheet);
    info!("[工作表 {}] 名称: {}", sheet, name);
    info!("[工作表 {}] 行数: {}", sheet, rows);
}

/// 记录工作表完成信息
pub fn log_sheet_complete(sheet: usize, name: &str, completed: usize, failed: usize) {
    info!(
        "[工作表 {}] 行统计: 成功 {}, 失败 {} ({})",
        sheet, completed, failed, name
    );
    info!("\n[工作表 {}] ✅ 工作表处理完成\n", sheet);
}

/// 记录任务完成信息
pub fn log_job_complete(summary: &BatchSummary) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ [任务 {}] 完成: 成功 {} 行，失败 {} 行",
        summary.job_id, summary.completed_rows, summary.failed_rows
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &BatchSummary, output_path: Option<&str>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("状态: {}", status_label(summary.status));
    info!("✅ 成功: {}", summary.completed_rows);
    info!("❌ 失败: {}", summary.failed_rows);
    info!("{}", "=".repeat(60));
    match output_path {
        Some(path) if summary.persisted => info!("\n结果已保存至: {}", path),
        _ => info!("\n⚠️ 结果未保存（只保留了已完成的进度）"),
    }
}

pub fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Running => "运行中",
        JobStatus::Completed => "已完成",
        JobStatus::Cancelled => "已停止",
        JobStatus::Failed => "失败（服务不可用）",
    }
}
