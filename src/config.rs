use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::QuestionDefaults;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 输入输出 ---
    /// 待处理的工作簿（TOML）
    pub workbook_path: PathBuf,
    /// 结果文件存放目录
    pub output_dir: PathBuf,
    // --- 流程参数 ---
    /// 工作表未指定时的字数限制
    pub default_char_limit: usize,
    /// 工作表未指定时的最大重试次数
    pub default_max_retries: u32,
    /// 单次 Agent 调用超时（秒）
    pub agent_call_timeout_secs: u64,
    /// 单个链接检查超时（秒）
    pub link_check_timeout_secs: u64,
    /// 进度通道容量
    pub progress_capacity: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            workbook_path: PathBuf::from("questionnaire.toml"),
            output_dir: PathBuf::from("output"),
            default_char_limit: 1000,
            default_max_retries: 3,
            agent_call_timeout_secs: 120,
            link_check_timeout_secs: 10,
            progress_capacity: 256,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 默认值 + 环境变量覆盖
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// 从 TOML 文件读取，缺省的键使用默认值
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("配置文件格式错误: {}", path.display()))
    }

    /// 程序入口使用：`APP_CONFIG` 指向的文件（可选）+ 环境变量覆盖
    pub fn load() -> Result<Self> {
        let base = match std::env::var("APP_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };
        Ok(base.apply_env())
    }

    fn apply_env(self) -> Self {
        Self {
            llm_api_key: env_string("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            workbook_path: env_string("WORKBOOK_PATH")
                .map(PathBuf::from)
                .unwrap_or(self.workbook_path),
            output_dir: env_string("OUTPUT_DIR").map(PathBuf::from).unwrap_or(self.output_dir),
            default_char_limit: env_parse("DEFAULT_CHAR_LIMIT").unwrap_or(self.default_char_limit),
            default_max_retries: env_parse("DEFAULT_MAX_RETRIES")
                .unwrap_or(self.default_max_retries),
            agent_call_timeout_secs: env_parse("AGENT_CALL_TIMEOUT_SECS")
                .unwrap_or(self.agent_call_timeout_secs),
            link_check_timeout_secs: env_parse("LINK_CHECK_TIMEOUT_SECS")
                .unwrap_or(self.link_check_timeout_secs),
            progress_capacity: env_parse("PROGRESS_CAPACITY").unwrap_or(self.progress_capacity),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
        }
    }

    pub fn question_defaults(&self) -> QuestionDefaults {
        QuestionDefaults {
            char_limit: self.default_char_limit,
            max_retries: self.default_max_retries,
        }
    }

    pub fn agent_call_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_call_timeout_secs)
    }

    pub fn link_check_timeout(&self) -> Duration {
        Duration::from_secs(self.link_check_timeout_secs)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.default_char_limit, 1000);
        assert_eq!(config.default_max_retries, 3);
        assert_eq!(config.agent_call_timeout(), Duration::from_secs(120));
        assert_eq!(config.progress_capacity, 256);
    }

    #[test]
    fn file_keys_are_optional() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "llm_model_name = \"test-model\"\ndefault_char_limit = 300\noutput_dir = \"out\""
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.llm_model_name, "test-model");
        assert_eq!(config.default_char_limit, 300);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.default_max_retries, 3);
    }

    #[test]
    fn bad_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_char_limit = \"many\"").unwrap();
        assert!(Config::from_file(file.path()).is_err());
        assert!(Config::from_file("/nonexistent/app.toml").is_err());
    }

    #[test]
    fn question_defaults_follow_config() {
        let config = Config {
            default_char_limit: 42,
            default_max_retries: 5,
            ..Config::default()
        };
        let defaults = config.question_defaults();
        assert_eq!(defaults.char_limit, 42);
        assert_eq!(defaults.max_retries, 5);
    }
}
