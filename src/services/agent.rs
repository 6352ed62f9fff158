//! Agent 能力接口 - 业务能力层
//!
//! 三个不透明的远程操作：生成回答、校验回答、校验链接。
//! 流程层只依赖这个 trait，不关心背后是哪个模型或服务。

use async_trait::async_trait;

use crate::error::AgentError;
use crate::models::Answer;

/// 回答校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected { reason: String },
}

/// 链接校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkVerdict {
    Approved,
    Rejected { broken: Vec<String> },
}

#[async_trait]
pub trait AgentCapability: Send + Sync {
    /// 根据题目和上下文生成回答，`char_limit` 是本次的目标长度
    async fn generate(
        &self,
        question: &str,
        context: &str,
        char_limit: usize,
    ) -> Result<String, AgentError>;

    /// 判断回答是否可接受
    async fn validate_answer(&self, question: &str, answer: &str) -> Result<Verdict, AgentError>;

    /// 检查回答中的链接是否有效
    async fn validate_links(&self, answer: &Answer) -> Result<LinkVerdict, AgentError>;
}
