use std::path::Path;

use tokio::fs;

use crate::error::{AppError, AppResult, FileError};
use crate::models::question::QuestionSheet;

/// 从 TOML 文件加载题目清单
pub async fn load_question_sheet(sheet_path: &str) -> AppResult<QuestionSheet> {
    let path = Path::new(sheet_path);

    if !path.exists() {
        return Err(AppError::File(FileError::NotFound {
            path: sheet_path.to_string(),
        }));
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(sheet_path, e))?;

    let mut sheet: QuestionSheet =
        toml::from_str(&content).map_err(|e| AppError::toml_parse_failed(sheet_path, e))?;

    // 记录来源文件路径
    sheet.file_path = Some(sheet_path.to_string());

    tracing::info!(
        "成功加载 {} 个题目: {}",
        sheet.questions.len(),
        path.file_name().unwrap_or_default().to_string_lossy()
    );

    Ok(sheet)
}

/// 将题目清单（含结果）写入 TOML 文件
///
/// 保持输入顺序，未识别的列原样写回
pub async fn save_question_sheet(sheet: &QuestionSheet, out_path: &str) -> AppResult<()> {
    let content = toml::to_string_pretty(sheet).map_err(|e| {
        AppError::File(FileError::TomlSerializeFailed {
            source: Box::new(e),
        })
    })?;

    fs::write(out_path, content)
        .await
        .map_err(|e| AppError::file_write_failed(out_path, e))?;

    tracing::info!("✓ 结果已写入: {}", out_path);
    Ok(())
}
