//! 题目处理上下文
//!
//! 封装"我正在为哪个目标处理第几题"这一信息

use std::fmt::Display;

/// 题目处理上下文
#[derive(Debug, Clone)]
pub struct QuestionCtx {
    /// 目标名称
    pub profile_name: String,

    /// 题目序号（从 1 开始）
    pub question_index: usize,

    /// 题目总数（仅用于日志显示）
    pub total: usize,
}

impl QuestionCtx {
    /// 创建新的题目上下文
    pub fn new(profile_name: String, question_index: usize, total: usize) -> Self {
        Self {
            profile_name,
            question_index,
            total,
        }
    }
}

impl Display for QuestionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[目标#{} 题目#{}/{}]",
            self.profile_name, self.question_index, self.total
        )
    }
}
