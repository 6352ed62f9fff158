//! 应用入口 - 控制台展示层
//!
//! - 批量模式：加载工作簿、提交任务、消费进度事件并在控制台绘制当前工作表
//! - 单题模式：直接对一个问题运行流程
//!
//! Ctrl-C 映射为"停止"命令。批量模式下还可以从标准输入输入命令：
//! `数字` 锁定显示第 N 张工作表（从 1 开始），`a` 恢复自动跟随，`s` 停止任务。

use anyhow::{anyhow, Context, Result};
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::{LinkChecker, LlmClient};
use crate::models::{load_workbook, Answer, BatchJob, BatchSummary, CellState, Question};
use crate::orchestrator::{BatchSession, Submission};
use crate::progress::ProgressEvent;
use crate::services::{AgentCapability, LlmAgent, ResultWriter};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::utils::truncate_text;
use crate::workflow::QuestionPipeline;

/// 应用主结构
pub struct App {
    config: Config,
    pipeline: Arc<QuestionPipeline>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        if config.llm_api_key.is_empty() {
            warn!("⚠️ 未设置 LLM_API_KEY，调用可能被服务拒绝");
        }

        let agent: Arc<dyn AgentCapability> = Arc::new(LlmAgent::new(
            LlmClient::new(&config),
            LinkChecker::new(config.link_check_timeout()).context("无法创建链接检查客户端")?,
        ));

        Ok(Self::with_agent(config, agent))
    }

    /// 使用自定义的 Agent 能力构建应用
    pub fn with_agent(config: Config, agent: Arc<dyn AgentCapability>) -> Self {
        let pipeline = Arc::new(QuestionPipeline::new(agent, config.agent_call_timeout()));
        Self { config, pipeline }
    }

    /// 批量模式：处理配置中的工作簿
    pub async fn run(&self) -> Result<BatchSummary> {
        info!("\n📁 正在加载工作簿: {}", self.config.workbook_path.display());
        let workbook = load_workbook(&self.config.workbook_path, self.config.question_defaults())
            .await
            .context("加载工作簿失败")?;

        let writer = ResultWriter::for_workbook(&self.config.output_dir, &workbook.name);
        let output_path = writer.output_path().display().to_string();
        let sheet_names: Vec<String> = workbook.sheets.iter().map(|s| s.name.clone()).collect();

        let mut session = BatchSession::new(
            self.pipeline.clone(),
            Arc::new(writer),
            self.config.progress_capacity,
        );
        let Submission { handle, mut events } = session
            .submit(BatchJob::new(workbook.name, workbook.sheets))
            .await;

        let view = ConsoleView::new(sheet_names, self.config.verbose_logging);
        let mut commands = spawn_command_reader();
        let mut stop_requested = false;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => view.on_event(&session, &event),
                    None => break,
                },
                signal = tokio::signal::ctrl_c(), if !stop_requested => {
                    stop_requested = true;
                    if signal.is_ok() && session.stop() {
                        warn!("⏹️ 收到 Ctrl-C，当前行完成后停止...");
                    }
                }
                Some(command) = commands.recv() => {
                    view.on_command(&session, command);
                }
            }

            let lagged = events.take_lagged();
            if lagged > 0 {
                warn!("进度事件丢失 {} 条，按快照重绘", lagged);
                view.resync(&session);
            }
        }

        let summary = session
            .wait()
            .await
            .ok_or_else(|| anyhow!("[任务 {}] 后台任务没有返回结果", handle.id()))?;
        print_final_stats(&summary, Some(&output_path));
        Ok(summary)
    }

    /// 单题模式
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = Question::new(
            question,
            "",
            self.config.default_char_limit,
            self.config.default_max_retries,
        );
        let answer = self.pipeline.answer(&question).await?;
        Ok(answer)
    }
}

/// 控制台视图：只读快照，不阻塞后台任务
struct ConsoleView {
    sheet_names: Vec<String>,
    verbose: bool,
}

impl ConsoleView {
    fn new(sheet_names: Vec<String>, verbose: bool) -> Self {
        Self {
            sheet_names,
            verbose,
        }
    }

    fn on_event(&self, session: &BatchSession, event: &ProgressEvent) {
        match event {
            ProgressEvent::CellCompleted { sheet, row, text } if self.verbose => {
                info!("[工作表 {}] [行 {}] {}", sheet, row, truncate_text(text, 80));
            }
            ProgressEvent::BatchFailed { error } => {
                warn!("❌ 服务不可用，任务已中止: {}", error);
            }
            ProgressEvent::BatchCancelled => {
                warn!("⏹️ 任务已停止，已完成的行不会写入文件");
            }
            _ => {}
        }

        // 只重绘正在显示的工作表
        if event.sheet().is_some() && event.sheet() == session.displayed_sheet() {
            self.draw(session);
        }
    }

    fn on_command(&self, session: &BatchSession, command: Command) {
        match command {
            Command::Select(sheet) => {
                if session.select_sheet(sheet) {
                    self.draw(session);
                } else {
                    warn!("没有第 {} 张工作表", sheet + 1);
                }
            }
            Command::Follow => {
                session.follow_active();
                info!("📺 恢复自动跟随当前工作表");
                self.draw(session);
            }
            Command::Stop => {
                if session.stop() {
                    warn!("⏹️ 收到停止命令，当前行完成后停止...");
                }
            }
        }
    }

    fn resync(&self, session: &BatchSession) {
        self.draw(session);
    }

    fn draw(&self, session: &BatchSession) {
        let Some(sheet) = session.displayed_sheet() else {
            return;
        };
        let Some(cells) = session.snapshot(sheet) else {
            return;
        };
        let name = self.sheet_names.get(sheet).map(String::as_str).unwrap_or("?");
        let pin = if session.is_pinned() { " 📌" } else { "" };
        info!("[{}]{} {}", name, pin, render_strip(&cells));
    }
}

/// 控制台命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// 锁定显示某张工作表（0 起始）
    Select(usize),
    Follow,
    Stop,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "a" | "auto" => Some(Command::Follow),
            "s" | "stop" => Some(Command::Stop),
            other => other
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .map(Command::Select),
        }
    }
}

/// 在独立线程中读取标准输入
///
/// 阻塞读取放在普通线程里，进程退出时不需要等待它。
fn spawn_command_reader() -> mpsc::UnboundedReceiver<Command> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match Command::parse(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => warn!("未知命令: {}（数字 / a / s）", line.trim()),
            }
        }
    });
    rx
}

/// 单元格状态条：· 待处理 ▶ 处理中 ✓ 完成 ✗ 失败
fn render_strip(cells: &[CellState]) -> String {
    cells
        .iter()
        .map(|cell| match cell {
            CellState::Pending => '·',
            CellState::Working => '▶',
            CellState::Completed => '✓',
            CellState::Failed => '✗',
        })
        .collect()
}
