use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::utils::text::{char_len, extract_urls, strip_urls};

/// 待回答的题目
///
/// 提交给流程后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub context: String,
    /// 回答允许的最大字符数（按 Unicode 字符计）
    pub char_limit: usize,
    /// 内容校验失败后允许的最大尝试次数
    pub max_retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Question {
    pub fn new(
        text: impl Into<String>,
        context: impl Into<String>,
        char_limit: usize,
        max_retries: u32,
    ) -> Self {
        Self {
            text: text.into(),
            context: context.into(),
            char_limit,
            max_retries,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// 生成的回答：正文 + 正文中出现的链接（按出现顺序，去重）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub urls: Vec<String>,
}

impl Answer {
    /// 从模型输出构建回答，自动提取其中的链接
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into().trim().to_string();
        let urls = extract_urls(&text);
        Self { text, urls }
    }

    /// 字符数（不是字节数）
    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }

    pub fn has_urls(&self) -> bool {
        !self.urls.is_empty()
    }

    /// 去掉所有链接，正文中的链接也一并移除
    pub fn without_urls(self) -> Self {
        let text = strip_urls(&self.text, &self.urls);
        Self {
            text,
            urls: Vec::new(),
        }
    }
}

/// 处理结果的错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// 内容校验在重试预算内始终未通过
    MaxRetriesExceeded,
    ServiceError,
    ConnectivityError,
    Timeout,
}

impl ErrorCode {
    /// 基础设施类错误：批量任务中会导致整个任务中止
    pub fn is_infrastructure(self) -> bool {
        !matches!(self, ErrorCode::MaxRetriesExceeded)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::MaxRetriesExceeded => write!(f, "超过最大重试次数"),
            ErrorCode::ServiceError => write!(f, "服务错误"),
            ErrorCode::ConnectivityError => write!(f, "网络连接错误"),
            ErrorCode::Timeout => write!(f, "调用超时"),
        }
    }
}

/// 一次流程调用的终态分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    FailedContent,
    FailedInfra,
}

/// 单题流程的处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    pub success: bool,
    pub answer: Option<Answer>,
    pub error: Option<ErrorCode>,
    pub retries_used: u32,
    pub elapsed: Duration,
    /// 回答通过校验但链接失效，已去掉链接
    pub links_stripped: bool,
}

impl ProcessingResult {
    pub fn succeeded(
        answer: Answer,
        retries_used: u32,
        elapsed: Duration,
        links_stripped: bool,
    ) -> Self {
        Self {
            success: true,
            answer: Some(answer),
            error: None,
            retries_used,
            elapsed,
            links_stripped,
        }
    }

    pub fn failed(error: ErrorCode, retries_used: u32, elapsed: Duration) -> Self {
        Self {
            success: false,
            answer: None,
            error: Some(error),
            retries_used,
            elapsed,
            links_stripped: false,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self.error {
            _ if self.success => Outcome::Succeeded,
            Some(code) if code.is_infrastructure() => Outcome::FailedInfra,
            _ => Outcome::FailedContent,
        }
    }
}
