//! 集成测试共用的脚本化 Agent 和记录型结果落盘
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use questionnaire_agent::models::{JobId, JobStatus};
use questionnaire_agent::{
    AgentCapability, AgentError, Answer, CellState, LinkVerdict, PersistError, Question,
    ResultSink, SheetState, Verdict,
};

/// Agent 收到的一次调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Generate { question: String, target: usize },
    ValidateAnswer { answer: String },
    ValidateLinks { urls: Vec<String> },
}

/// 按脚本返回结果的 Agent
///
/// 脚本用完后：生成返回 "ok"，审核通过，链接有效。
#[derive(Default)]
pub struct ScriptedAgent {
    drafts: Mutex<VecDeque<Result<String, AgentError>>>,
    verdicts: Mutex<VecDeque<Result<Verdict, AgentError>>>,
    links: Mutex<VecDeque<Result<LinkVerdict, AgentError>>>,
    /// 这些问题的生成调用返回连接错误
    unreachable: Mutex<HashSet<String>>,
    /// 这些问题的回答总是被拒绝
    rejected: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(self, text: impl Into<String>) -> Self {
        self.drafts.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn draft_err(self, err: AgentError) -> Self {
        self.drafts.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn approve(self) -> Self {
        self.verdicts.lock().unwrap().push_back(Ok(Verdict::Approved));
        self
    }

    pub fn reject(self, reason: &str) -> Self {
        self.verdicts.lock().unwrap().push_back(Ok(Verdict::Rejected {
            reason: reason.to_string(),
        }));
        self
    }

    pub fn verdict_err(self, err: AgentError) -> Self {
        self.verdicts.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn broken_links(self, broken: &[&str]) -> Self {
        self.links.lock().unwrap().push_back(Ok(LinkVerdict::Rejected {
            broken: broken.iter().map(|s| s.to_string()).collect(),
        }));
        self
    }

    pub fn links_err(self, err: AgentError) -> Self {
        self.links.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn unreachable_for(self, question: &str) -> Self {
        self.unreachable.lock().unwrap().insert(question.to_string());
        self
    }

    pub fn always_reject(self, question: &str) -> Self {
        self.rejected.lock().unwrap().insert(question.to_string());
        self
    }

    /// 每次生成前等待
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 每次生成前必须拿到一个许可，测试用来卡住后台任务
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn generate_calls(&self) -> Vec<(String, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Generate { question, target } => Some((question, target)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AgentCapability for ScriptedAgent {
    async fn generate(
        &self,
        question: &str,
        _context: &str,
        char_limit: usize,
    ) -> Result<String, AgentError> {
        self.record(Call::Generate {
            question: question.to_string(),
            target: char_limit,
        });
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable.lock().unwrap().contains(question) {
            return Err(AgentError::connectivity("generate", "connection refused"));
        }
        let next = self.drafts.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok("ok".to_string()))
    }

    async fn validate_answer(&self, question: &str, answer: &str) -> Result<Verdict, AgentError> {
        self.record(Call::ValidateAnswer {
            answer: answer.to_string(),
        });
        if self.rejected.lock().unwrap().contains(question) {
            return Ok(Verdict::Rejected {
                reason: "scripted".to_string(),
            });
        }
        let next = self.verdicts.lock().unwrap().pop_front();
        next.unwrap_or(Ok(Verdict::Approved))
    }

    async fn validate_links(&self, answer: &Answer) -> Result<LinkVerdict, AgentError> {
        self.record(Call::ValidateLinks {
            urls: answer.urls.clone(),
        });
        let next = self.links.lock().unwrap().pop_front();
        next.unwrap_or(Ok(LinkVerdict::Approved))
    }
}

/// 记录每次落盘调用的结果落盘
#[derive(Default)]
pub struct RecordingSink {
    persisted: Mutex<Vec<(JobId, Vec<Vec<CellState>>)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn jobs(&self) -> Vec<JobId> {
        self.persisted
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.persisted.lock().unwrap().len()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn persist(&self, job_id: JobId, sheets: &[SheetState]) -> Result<(), PersistError> {
        let outcome = sheets
            .iter()
            .map(|sheet| {
                sheet
                    .results()
                    .iter()
                    .map(|r| match r {
                        None => CellState::Pending,
                        Some(r) if r.success => CellState::Completed,
                        Some(_) => CellState::Failed,
                    })
                    .collect()
            })
            .collect();
        self.persisted.lock().unwrap().push((job_id, outcome));
        if self.fail {
            return Err(PersistError::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

pub fn question(text: &str) -> Question {
    Question::new(text, "", 100, 3)
}

/// 等待某张表的某一行进入指定状态
pub async fn wait_for_cell(
    handle: &questionnaire_agent::JobHandle,
    sheet: usize,
    row: usize,
    state: CellState,
) {
    let mut rx = handle.cells().subscribe(sheet).unwrap();
    rx.wait_for(|snapshot| snapshot.cells[row] == state)
        .await
        .unwrap();
}

pub fn finished(status: JobStatus) -> bool {
    status != JobStatus::Running
}
