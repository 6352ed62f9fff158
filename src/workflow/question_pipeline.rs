//! 单题处理流程 - 流程层
//!
//! 核心职责：定义"一道题"的完整处理流程
//!
//! 流程是一个显式的状态机：
//! 1. Generating → 生成回答（超长直接视为内容不合格）
//! 2. ValidatingAnswer → 审核回答，不通过则进入 Retrying
//! 3. ValidatingLinks → 回答中有链接时检查链接，失效则去掉链接后直接成功
//! 4. Retrying → 消耗一次重试预算，预算用完进入 FailedContent
//!
//! 任何 Agent 调用错误（含超时）立即进入 FailedInfra，不消耗重试预算。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{AgentError, AnswerError};
use crate::models::{Answer, ErrorCode, ProcessingResult, Question};
use crate::services::{AgentCapability, LinkVerdict, Verdict};
use crate::utils::text::truncate_text;
use crate::workflow::retry_policy::TargetLengthSchedule;

/// 状态种类（不带数据），用于转换表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Generating,
    ValidatingAnswer,
    ValidatingLinks,
    Retrying,
    Succeeded,
    FailedContent,
    FailedInfra,
}

/// 允许的状态转换，表外的转换都是缺陷
pub const TRANSITIONS: &[(StateKind, StateKind)] = &[
    (StateKind::Generating, StateKind::ValidatingAnswer),
    (StateKind::Generating, StateKind::Retrying),
    (StateKind::Generating, StateKind::FailedInfra),
    (StateKind::ValidatingAnswer, StateKind::ValidatingLinks),
    (StateKind::ValidatingAnswer, StateKind::Succeeded),
    (StateKind::ValidatingAnswer, StateKind::Retrying),
    (StateKind::ValidatingAnswer, StateKind::FailedInfra),
    (StateKind::ValidatingLinks, StateKind::Succeeded),
    (StateKind::ValidatingLinks, StateKind::FailedInfra),
    (StateKind::Retrying, StateKind::Generating),
    (StateKind::Retrying, StateKind::FailedContent),
];

impl StateKind {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StateKind::Succeeded | StateKind::FailedContent | StateKind::FailedInfra
        )
    }

    pub fn can_transition_to(self, next: StateKind) -> bool {
        TRANSITIONS.contains(&(self, next))
    }
}

/// 内容不合格的原因
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rejection {
    TooLong { len: usize, limit: usize },
    Validator(String),
}

#[derive(Debug)]
enum PipelineState {
    Generating,
    ValidatingAnswer(Answer),
    ValidatingLinks(Answer),
    Retrying(Rejection),
    Succeeded { answer: Answer, links_stripped: bool },
    FailedContent,
    FailedInfra(AgentError),
}

impl PipelineState {
    fn kind(&self) -> StateKind {
        match self {
            PipelineState::Generating => StateKind::Generating,
            PipelineState::ValidatingAnswer(_) => StateKind::ValidatingAnswer,
            PipelineState::ValidatingLinks(_) => StateKind::ValidatingLinks,
            PipelineState::Retrying(_) => StateKind::Retrying,
            PipelineState::Succeeded { .. } => StateKind::Succeeded,
            PipelineState::FailedContent => StateKind::FailedContent,
            PipelineState::FailedInfra(_) => StateKind::FailedInfra,
        }
    }
}

/// 单题处理流程
///
/// - 编排 生成 → 审核 → 链接检查 的完整流程
/// - 决定何时重试、何时放弃
/// - 只依赖业务能力（`AgentCapability`），不持有任何其它资源
/// - 调用严格串行，同一时刻最多一个 Agent 调用在途
pub struct QuestionPipeline {
    agent: Arc<dyn AgentCapability>,
    call_timeout: Duration,
    schedule: TargetLengthSchedule,
}

impl QuestionPipeline {
    pub fn new(agent: Arc<dyn AgentCapability>, call_timeout: Duration) -> Self {
        Self {
            agent,
            call_timeout,
            schedule: TargetLengthSchedule::default(),
        }
    }

    /// 处理一道题，总是返回结构化结果，从不 panic
    pub async fn run(&self, question: &Question) -> ProcessingResult {
        let started = Instant::now();
        let label = question.id.as_deref().unwrap_or("-");
        let mut retries_used = 0u32;

        info!("[题目 {}] 📝 {}", label, truncate_text(&question.text, 60));

        let mut state = PipelineState::Generating;

        loop {
            let from = state.kind();
            let next = match state {
                PipelineState::Generating => self.generate(question, retries_used).await,
                PipelineState::ValidatingAnswer(answer) => {
                    self.validate_answer(question, answer).await
                }
                PipelineState::ValidatingLinks(answer) => self.validate_links(label, answer).await,
                PipelineState::Retrying(reason) => {
                    retries_used += 1;
                    warn!(
                        "[题目 {}] ⚠️ 回答不合格 ({}/{}): {}",
                        label,
                        retries_used,
                        question.max_retries,
                        describe(&reason)
                    );
                    if retries_used < question.max_retries {
                        PipelineState::Generating
                    } else {
                        PipelineState::FailedContent
                    }
                }
                PipelineState::Succeeded {
                    answer,
                    links_stripped,
                } => {
                    info!(
                        "[题目 {}] ✓ 回答通过 ({} 字符，重试 {} 次)",
                        label,
                        answer.char_len(),
                        retries_used
                    );
                    return ProcessingResult::succeeded(
                        answer,
                        retries_used,
                        started.elapsed(),
                        links_stripped,
                    );
                }
                PipelineState::FailedContent => {
                    warn!(
                        "[题目 {}] ❌ 已达最大重试次数 {}，放弃",
                        label, question.max_retries
                    );
                    return ProcessingResult::failed(
                        ErrorCode::MaxRetriesExceeded,
                        retries_used,
                        started.elapsed(),
                    );
                }
                PipelineState::FailedInfra(err) => {
                    error!("[题目 {}] ❌ 服务不可用: {}", label, err);
                    return ProcessingResult::failed(err.code(), retries_used, started.elapsed());
                }
            };

            let to = next.kind();
            debug!("[题目 {}] 状态 {:?} -> {:?}", label, from, to);
            debug_assert!(
                from.can_transition_to(to),
                "非法状态转换 {:?} -> {:?}",
                from,
                to
            );
            state = next;
        }
    }

    /// 单题调用：把结果转换成 `Result`
    ///
    /// 链接失效时仍然返回成功（链接已去掉）。
    pub async fn answer(&self, question: &Question) -> Result<Answer, AnswerError> {
        let result = self.run(question).await;
        match (result.answer, result.error) {
            (Some(answer), _) if result.success => Ok(answer),
            (_, Some(ErrorCode::MaxRetriesExceeded)) | (_, None) => Err(AnswerError::Unacceptable {
                retries_used: result.retries_used,
            }),
            (_, Some(code)) => Err(AnswerError::Infrastructure(code)),
        }
    }

    async fn generate(&self, question: &Question, retries_used: u32) -> PipelineState {
        let target = self.schedule.target_for(question.char_limit, retries_used);
        let generated = self
            .call(
                "generate",
                self.agent
                    .generate(&question.text, &question.context, target),
            )
            .await;

        let answer = match generated {
            Ok(text) => Answer::from_text(text),
            Err(err) => return PipelineState::FailedInfra(err),
        };

        let len = answer.char_len();
        if len > question.char_limit {
            return PipelineState::Retrying(Rejection::TooLong {
                len,
                limit: question.char_limit,
            });
        }
        PipelineState::ValidatingAnswer(answer)
    }

    async fn validate_answer(&self, question: &Question, answer: Answer) -> PipelineState {
        let verdict = self
            .call(
                "validate_answer",
                self.agent.validate_answer(&question.text, &answer.text),
            )
            .await;

        match verdict {
            Ok(Verdict::Approved) if answer.has_urls() => PipelineState::ValidatingLinks(answer),
            Ok(Verdict::Approved) => PipelineState::Succeeded {
                answer,
                links_stripped: false,
            },
            Ok(Verdict::Rejected { reason }) => {
                PipelineState::Retrying(Rejection::Validator(reason))
            }
            Err(err) => PipelineState::FailedInfra(err),
        }
    }

    async fn validate_links(&self, label: &str, answer: Answer) -> PipelineState {
        match self
            .call("validate_links", self.agent.validate_links(&answer))
            .await
        {
            Ok(LinkVerdict::Approved) => PipelineState::Succeeded {
                answer,
                links_stripped: false,
            },
            Ok(LinkVerdict::Rejected { broken }) => {
                warn!(
                    "[题目 {}] 🔗 {} 个链接失效，去掉全部链接后提交: {:?}",
                    label,
                    broken.len(),
                    broken
                );
                PipelineState::Succeeded {
                    answer: answer.without_urls(),
                    links_stripped: true,
                }
            }
            Err(err) => PipelineState::FailedInfra(err),
        }
    }

    /// 给一次 Agent 调用加上超时
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, AgentError>
    where
        F: Future<Output = Result<T, AgentError>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout {
                operation,
                timeout_secs: self.call_timeout.as_secs(),
            }),
        }
    }
}

fn describe(reason: &Rejection) -> String {
    match reason {
        Rejection::TooLong { len, limit } => format!("超长 {} > {}", len, limit),
        Rejection::Validator(reason) if reason.is_empty() => "审核未通过".to_string(),
        Rejection::Validator(reason) => format!("审核未通过: {}", reason),
    }
}
