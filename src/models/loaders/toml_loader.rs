use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::WorkbookError;
use crate::models::question::Question;
use crate::models::sheet::{Row, SheetKind, SheetState};

/// 工作表未指定时使用的默认值（来自 `Config`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionDefaults {
    pub char_limit: usize,
    pub max_retries: u32,
}

/// 加载完成的工作簿
#[derive(Debug, Clone)]
pub struct Workbook {
    pub name: String,
    pub path: Option<PathBuf>,
    pub sheets: Vec<SheetState>,
}

#[derive(Debug, Deserialize)]
struct WorkbookFile {
    #[serde(default)]
    sheets: Vec<SheetFile>,
}

#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum SheetKindFile {
    #[default]
    Questionnaire,
    #[serde(alias = "non_questionnaire")]
    Reference,
}

#[derive(Debug, Deserialize)]
struct SheetFile {
    name: String,
    #[serde(default)]
    kind: SheetKindFile,
    char_limit: Option<usize>,
    max_retries: Option<u32>,
    /// 整张表共用的上下文，行级 context 会追加在其后
    #[serde(default)]
    context: String,
    #[serde(default)]
    rows: Vec<RowFile>,
}

#[derive(Debug, Deserialize)]
struct RowFile {
    #[serde(default, alias = "text")]
    question: String,
    context: Option<String>,
    id: Option<String>,
}

/// 从 TOML 文件加载工作簿
pub async fn load_workbook(
    path: &Path,
    defaults: QuestionDefaults,
) -> Result<Workbook, WorkbookError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| WorkbookError::Read {
            path: path.display().to_string(),
            source,
        })?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "workbook".to_string());

    let mut workbook = parse_workbook(&name, &content, defaults).map_err(|e| match e {
        WorkbookError::Parse { source, .. } => WorkbookError::Parse {
            path: path.display().to_string(),
            source,
        },
        WorkbookError::Empty { .. } => WorkbookError::Empty {
            path: path.display().to_string(),
        },
        other => other,
    })?;
    workbook.path = Some(path.to_path_buf());

    tracing::info!(
        "✓ 已加载工作簿 {}: {} 张工作表",
        workbook.name,
        workbook.sheets.len()
    );

    Ok(workbook)
}

/// 解析 TOML 文本为工作簿
///
/// 空问题的行保留在行列表中（保持行号对齐），但不会被处理。
pub fn parse_workbook(
    name: &str,
    content: &str,
    defaults: QuestionDefaults,
) -> Result<Workbook, WorkbookError> {
    let file: WorkbookFile = toml::from_str(content).map_err(|source| WorkbookError::Parse {
        path: name.to_string(),
        source,
    })?;

    if file.sheets.is_empty() {
        return Err(WorkbookError::Empty {
            path: name.to_string(),
        });
    }

    let sheets = file
        .sheets
        .into_iter()
        .map(|sheet| build_sheet(sheet, defaults))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Workbook {
        name: name.to_string(),
        path: None,
        sheets,
    })
}

fn build_sheet(sheet: SheetFile, defaults: QuestionDefaults) -> Result<SheetState, WorkbookError> {
    let char_limit = sheet.char_limit.unwrap_or(defaults.char_limit);
    if char_limit == 0 {
        return Err(WorkbookError::InvalidLimit { sheet: sheet.name });
    }
    let max_retries = sheet.max_retries.unwrap_or(defaults.max_retries);

    if sheet.kind == SheetKindFile::Reference {
        let rows = sheet
            .rows
            .into_iter()
            .map(|row| Row::display_only(row.question))
            .collect();
        return Ok(SheetState::new(sheet.name, SheetKind::NonQuestionnaire, rows));
    }

    let rows = sheet
        .rows
        .into_iter()
        .map(|row| {
            let text = row.question.trim();
            if text.is_empty() {
                return Row::display_only(row.question.clone());
            }
            let context = join_context(&sheet.context, row.context.as_deref());
            let mut question = Question::new(text, context, char_limit, max_retries);
            question.id = row.id;
            Row::question(question)
        })
        .collect();

    Ok(SheetState::new(sheet.name, SheetKind::Questionnaire, rows))
}

fn join_context(sheet_context: &str, row_context: Option<&str>) -> String {
    match row_context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(row) if !sheet_context.trim().is_empty() => {
            format!("{}\n{}", sheet_context.trim(), row)
        }
        Some(row) => row.to_string(),
        None => sheet_context.trim().to_string(),
    }
}
