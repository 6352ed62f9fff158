//! LLM 客户端 - 基础设施层
//!
//! 持有唯一的 OpenAI 兼容客户端，只暴露"发一条消息、拿一段文本"的能力。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AgentError;

/// LLM 客户端
///
/// 职责：
/// - 调用 LLM API
/// - 不认识 Question / Sheet
/// - 不处理重试和流程
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `operation`: 调用方的操作名（用于错误信息）
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `max_tokens`: 回复的 token 上限
    ///
    /// # 返回
    /// 返回去掉首尾空白的响应内容
    pub async fn send(
        &self,
        operation: &'static str,
        user_message: &str,
        system_message: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, AgentError> {
        debug!("调用 LLM API ({})，模型: {}", operation, self.model_name);
        debug!("用户消息长度: {} 字符", user_message.chars().count());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(|e| AgentError::malformed(operation, e.to_string()))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| AgentError::malformed(operation, e.to_string()))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.3)
            .max_tokens(max_tokens)
            .build()
            .map_err(|e| AgentError::malformed(operation, e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败 ({}): {}", operation, e);
            classify(operation, e)
        })?;

        debug!("LLM API 调用成功 ({})", operation);

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AgentError::malformed(operation, "LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }
}

/// 服务端明确返回的错误算服务错误，其余（传输、解码）按连接问题处理
fn classify(operation: &'static str, err: OpenAIError) -> AgentError {
    match err {
        OpenAIError::ApiError(api) => AgentError::service(operation, api.message),
        other => AgentError::connectivity(operation, other.to_string()),
    }
}
