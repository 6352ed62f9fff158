//! 基于 LLM 的 Agent 能力实现 - 业务能力层
//!
//! 只负责"生成 / 判断"能力，不关心重试和流程。

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::infrastructure::{LinkChecker, LlmClient};
use crate::models::Answer;
use crate::services::agent::{AgentCapability, LinkVerdict, Verdict};

const GENERATE_SYSTEM_PROMPT: &str = "你是一名严谨的问卷填写助手。根据给定的背景资料回答问题，\
     回答要准确、直接、可以直接填入表格。只在确有把握时引用链接，链接必须是完整的 http(s) 地址。";

const VALIDATE_SYSTEM_PROMPT: &str = "你是问卷回答的审核员。判断回答是否准确、切题、没有编造。\
     只返回 JSON：{\"approved\": true 或 false, \"reason\": \"简短理由\"}，不要返回任何其他内容。";

/// LLM Agent
///
/// 职责：
/// - 构建生成 / 审核的提示词
/// - 解析审核结论
/// - 链接检查委托给 `LinkChecker`
pub struct LlmAgent {
    llm: LlmClient,
    links: LinkChecker,
}

impl LlmAgent {
    pub fn new(llm: LlmClient, links: LinkChecker) -> Self {
        Self { llm, links }
    }

    fn build_generate_message(question: &str, context: &str, char_limit: usize) -> String {
        let context = if context.trim().is_empty() {
            "（无）"
        } else {
            context.trim()
        };
        format!(
            r#"背景资料：
{}

问题：
{}

要求：
- 回答不超过 {} 个字符（含标点和链接）
- 只输出回答正文，不要复述问题，不要加前缀"#,
            context, question, char_limit
        )
    }

    fn build_validate_message(question: &str, answer: &str) -> String {
        format!(
            r#"问题：
{}

待审核的回答：
{}

请判断该回答是否可以直接提交。"#,
            question, answer
        )
    }
}

/// 生成时的 token 上限：按目标字符数粗略估算
fn max_tokens_for(char_limit: usize) -> u32 {
    let estimate = char_limit.saturating_mul(2).clamp(256, 4096);
    u32::try_from(estimate).unwrap_or(4096)
}

#[derive(Debug, Deserialize)]
struct VerdictPayload {
    approved: bool,
    #[serde(default)]
    reason: String,
}

/// 解析审核结论
///
/// 优先按 JSON 解析（允许包在 ``` 代码块里），
/// 其次接受以 APPROVED / REJECTED 开头的纯文本。
fn parse_verdict(response: &str) -> Result<Verdict, AgentError> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(payload) = serde_json::from_str::<VerdictPayload>(cleaned) {
        return Ok(if payload.approved {
            Verdict::Approved
        } else {
            Verdict::Rejected {
                reason: payload.reason,
            }
        });
    }

    let upper = cleaned.to_uppercase();
    if upper.starts_with("APPROVED") {
        return Ok(Verdict::Approved);
    }
    if upper.starts_with("REJECTED") {
        let reason = cleaned["REJECTED".len()..]
            .trim_start_matches(&[':', '：', '-', ' '][..])
            .trim()
            .to_string();
        return Ok(Verdict::Rejected { reason });
    }

    warn!("无法解析审核结论: '{}'", response);
    Err(AgentError::malformed("validate_answer", response.to_string()))
}

#[async_trait]
impl AgentCapability for LlmAgent {
    async fn generate(
        &self,
        question: &str,
        context: &str,
        char_limit: usize,
    ) -> Result<String, AgentError> {
        let message = Self::build_generate_message(question, context, char_limit);
        let text = self
            .llm
            .send(
                "generate",
                &message,
                Some(GENERATE_SYSTEM_PROMPT),
                max_tokens_for(char_limit),
            )
            .await?;
        debug!("生成回答 {} 字符（目标 {}）", text.chars().count(), char_limit);
        Ok(text)
    }

    async fn validate_answer(&self, question: &str, answer: &str) -> Result<Verdict, AgentError> {
        let message = Self::build_validate_message(question, answer);
        let response = self
            .llm
            .send(
                "validate_answer",
                &message,
                Some(VALIDATE_SYSTEM_PROMPT),
                256,
            )
            .await?;
        parse_verdict(&response)
    }

    async fn validate_links(&self, answer: &Answer) -> Result<LinkVerdict, AgentError> {
        if answer.urls.is_empty() {
            return Ok(LinkVerdict::Approved);
        }
        let broken = self.links.find_broken(&answer.urls).await;
        if broken.is_empty() {
            Ok(LinkVerdict::Approved)
        } else {
            Ok(LinkVerdict::Rejected { broken })
        }
    }
}
