//! 警告写入服务 - 业务能力层
//!
//! 只负责"写 warn.txt"能力，不关心流程

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

/// 警告写入服务
///
/// 职责：
/// - 将采集失败的题目追加到 warn.txt，方便操作者事后排查
/// - 只处理单个题目的警告
/// - 不关心流程顺序
pub struct WarnWriter {
    warn_file_path: String,
}

impl WarnWriter {
    /// 创建新的警告写入服务
    pub fn new() -> Self {
        Self {
            warn_file_path: "warn.txt".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    /// 写入一条失败记录
    ///
    /// # 参数
    /// - `profile_name`: 目标名称
    /// - `question_index`: 题目序号（从 1 开始）
    /// - `reason`: 失败原因
    /// - `prompt`: 题目内容
    pub async fn write(
        &self,
        profile_name: &str,
        question_index: usize,
        reason: &str,
        prompt: &str,
    ) -> Result<()> {
        debug!(
            "写入警告: 目标 {} | 题目 {} | 原因: {}",
            profile_name, question_index, reason
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)?;

        let warn_msg = format!(
            "目标 {} | 题目 {} | 原因: {} | 题干: {}\n",
            profile_name, question_index, reason, prompt
        );

        file.write_all(warn_msg.as_bytes())?;

        Ok(())
    }
}

impl Default for WarnWriter {
    fn default() -> Self {
        Self::new()
    }
}
