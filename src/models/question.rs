//! 题目记录
//!
//! 一次运行处理一份题目清单，逐条写回回答、耗时与状态。
//! 清单中未识别的列原样保留，顺序不变。

use serde::{Deserialize, Serialize};

/// 题目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    /// 尚未处理
    #[default]
    Pending,
    /// 成功采集到回答
    Success,
    /// 处理失败（原因见 error_reason）
    Failed,
}

impl std::fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionStatus::Pending => write!(f, "待处理"),
            QuestionStatus::Success => write!(f, "成功"),
            QuestionStatus::Failed => write!(f, "失败"),
        }
    }
}

/// 单条题目记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// 题目内容
    pub prompt: String,

    /// 采集到的回答
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// 从提交到回答完成的耗时（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_secs: Option<f64>,

    /// 处理状态
    #[serde(default)]
    pub status: QuestionStatus,

    /// 失败原因（面向操作者的可读文本）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,

    /// 回答是在等待预算耗尽后截取的，可能不完整
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_confidence: Option<bool>,

    /// 清单中的其他列，原样保留
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl QuestionRecord {
    /// 创建一条新的待处理记录
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: None,
            elapsed_secs: None,
            status: QuestionStatus::Pending,
            error_reason: None,
            low_confidence: None,
            extra: toml::Table::new(),
        }
    }

    /// 是否尚未处理
    pub fn is_pending(&self) -> bool {
        self.status == QuestionStatus::Pending
    }

    /// 标记为成功
    ///
    /// 成功状态下 response 与 elapsed_secs 必定同时存在
    pub fn mark_success(&mut self, response: String, elapsed_secs: f64, low_confidence: bool) {
        self.status = QuestionStatus::Success;
        self.response = Some(response);
        self.elapsed_secs = Some(elapsed_secs);
        self.error_reason = None;
        self.low_confidence = if low_confidence { Some(true) } else { None };
    }

    /// 标记为失败
    ///
    /// 失败状态下不保留 response / elapsed_secs，只记录原因
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = QuestionStatus::Failed;
        self.response = None;
        self.elapsed_secs = None;
        self.error_reason = Some(reason.into());
        self.low_confidence = None;
    }
}

/// 一份题目清单
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuestionSheet {
    /// 清单名称（可选，仅用于日志显示）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 按输入顺序排列的题目，处理顺序与此一致
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,

    /// 来源文件路径（加载时注入，不参与序列化）
    #[serde(skip)]
    pub file_path: Option<String>,
}
