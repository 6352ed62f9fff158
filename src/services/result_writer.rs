//! 结果写入服务 - 业务能力层
//!
//! 只负责"把一次批量任务的结果落盘"能力，不关心流程。
//! 调度器保证每个任务最多调用一次，且只在任务完成之后。

use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::PersistError;
use crate::models::{JobId, Outcome, SheetKind, SheetState};

/// 结果持久化接口
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(&self, job_id: JobId, sheets: &[SheetState]) -> Result<(), PersistError>;
}

#[derive(Debug, Serialize)]
struct AnswerFile {
    job_id: JobId,
    generated_at: String,
    sheets: Vec<SheetRecord>,
}

#[derive(Debug, Serialize)]
struct SheetRecord {
    name: String,
    rows: Vec<RowRecord>,
}

#[derive(Debug, Serialize)]
struct RowRecord {
    row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    question: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    answer: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    retries_used: u32,
    links_stripped: bool,
}

/// 结果写入器
///
/// 写入 TOML 文件：先写临时文件再重命名，避免留下半个文件。
pub struct ResultWriter {
    output_path: PathBuf,
}

impl ResultWriter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    /// `<output_dir>/<workbook>.answers.toml`
    pub fn for_workbook(output_dir: &Path, workbook_name: &str) -> Self {
        Self::new(output_dir.join(format!("{}.answers.toml", workbook_name)))
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn render(job_id: JobId, sheets: &[SheetState]) -> Result<String, PersistError> {
        let sheets = sheets
            .iter()
            .filter(|sheet| sheet.kind == SheetKind::Questionnaire)
            .map(|sheet| SheetRecord {
                name: sheet.name.clone(),
                rows: sheet
                    .rows()
                    .iter()
                    .enumerate()
                    .filter_map(|(row, cell)| {
                        let question = cell.question.as_ref()?;
                        let result = sheet.result(row);
                        Some(RowRecord {
                            row,
                            id: question.id.clone(),
                            question: question.text.clone(),
                            status: match result.map(|r| r.outcome()) {
                                None => "pending",
                                Some(Outcome::Succeeded) => "completed",
                                Some(Outcome::FailedContent | Outcome::FailedInfra) => "failed",
                            },
                            answer: result
                                .and_then(|r| r.answer.as_ref())
                                .map(|a| a.text.clone()),
                            urls: result
                                .and_then(|r| r.answer.as_ref())
                                .map(|a| a.urls.clone())
                                .unwrap_or_default(),
                            error: result.and_then(|r| r.error).map(|e| format!("{:?}", e)),
                            retries_used: result.map(|r| r.retries_used).unwrap_or(0),
                            links_stripped: result.map(|r| r.links_stripped).unwrap_or(false),
                        })
                    })
                    .collect(),
            })
            .collect();

        let file = AnswerFile {
            job_id,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            sheets,
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    fn write_atomic(path: &Path, content: &str) -> Result<(), PersistError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(path).map_err(|e| PersistError::Io(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl ResultSink for ResultWriter {
    async fn persist(&self, job_id: JobId, sheets: &[SheetState]) -> Result<(), PersistError> {
        let content = Self::render(job_id, sheets)?;
        debug!("结果文件 {} 字节", content.len());

        let path = self.output_path.clone();
        tokio::task::spawn_blocking(move || Self::write_atomic(&path, &content))
            .await
            .map_err(|e| PersistError::Io(std::io::Error::other(e)))??;

        info!("💾 结果已保存至: {}", self.output_path.display());
        Ok(())
    }
}
