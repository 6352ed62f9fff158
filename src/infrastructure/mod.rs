//! 基础设施层：持有远程资源（LLM 客户端、HTTP 客户端），只暴露能力

pub mod link_checker;
pub mod llm_client;

pub use link_checker::LinkChecker;
pub use llm_client::LlmClient;
