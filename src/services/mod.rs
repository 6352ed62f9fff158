pub mod agent;
pub mod llm_agent;
pub mod result_writer;

pub use agent::{AgentCapability, LinkVerdict, Verdict};
pub use llm_agent::LlmAgent;
pub use result_writer::{ResultSink, ResultWriter};
