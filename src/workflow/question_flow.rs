//! 题目处理流程 - 流程层
//!
//! 核心职责：定义"一道题"的完整处理流程
//!
//! 流程顺序：
//! 1. 提交题目（交互驱动）
//! 2. 等待回答完成（完成探测）
//! 3. 失败时写 warn.txt（兜底）

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::JsExecutor;
use crate::models::{QuestionRecord, TargetProfile};
use crate::services::{
    CompletionDetector, InteractionDriver, LivePageObserver, WarnWriter,
};
use crate::utils::logging::truncate_text;
use crate::workflow::question_ctx::QuestionCtx;

/// 题目处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// 采集到回答
    Captured {
        text: String,
        /// 预算耗尽后截取，内容可能不完整
        low_confidence: bool,
    },
    /// 本题失败（原因为面向操作者的可读文本）
    Failed { reason: String },
}

impl CaptureOutcome {
    /// 把结果落到记录上，维持记录的状态不变量
    pub fn apply_to(self, record: &mut QuestionRecord, elapsed_secs: f64) {
        match self {
            CaptureOutcome::Captured {
                text,
                low_confidence,
            } => record.mark_success(text, elapsed_secs, low_confidence),
            CaptureOutcome::Failed { reason } => record.mark_failed(reason),
        }
    }
}

/// 题目处理流程
///
/// - 编排单个题目的提交与等待
/// - 题目级错误在这里转换成 Failed 结果，不向上传播
/// - 不持有任何资源（page）
/// - 只依赖业务能力（services）
pub struct QuestionFlow {
    driver: InteractionDriver,
    detector: CompletionDetector,
    warn_writer: WarnWriter,
    verbose_logging: bool,
}

impl QuestionFlow {
    /// 创建新的题目处理流程
    pub fn new(config: &Config) -> Self {
        Self {
            driver: InteractionDriver::new(config),
            detector: CompletionDetector::new(),
            warn_writer: WarnWriter::new(),
            verbose_logging: config.verbose_logging,
        }
    }

    /// 处理一道题目：提交 → 等待完成 → 提取回答
    ///
    /// 返回 Ok(Failed) 表示题目级失败（元素未找到、超时无输出等），
    /// 运行可以继续；返回 Err 表示流程之外的意外错误。
    pub async fn run(
        &self,
        executor: &JsExecutor,
        profile: &TargetProfile,
        prompt: &str,
        ctx: &QuestionCtx,
    ) -> Result<CaptureOutcome> {
        self.log_prompt(ctx, prompt);

        // ========== 第一步：提交 ==========
        info!("{} 📤 正在提交题目...", ctx);
        match self.driver.submit(executor, profile, prompt).await {
            Ok(receipt) => {
                if self.verbose_logging {
                    info!(
                        "{} 提交完成于 {}",
                        ctx,
                        receipt.submitted_at.format("%H:%M:%S")
                    );
                }
            }
            Err(e) if e.is_question_local() => {
                return self.fail(ctx, prompt, e).await;
            }
            Err(e) => return Err(e.into()),
        }

        // ========== 第二步：等待回答完成 ==========
        info!("{} ⏳ 等待回答...", ctx);
        let observer = LivePageObserver::new(executor, profile);
        match self.detector.wait_for_settle(&observer, profile).await {
            Ok(capture) => {
                if capture.low_confidence {
                    warn!(
                        "{} ⚠️ 等待预算内未确认完成，已截取 {} 字符（低置信度）",
                        ctx,
                        capture.text.chars().count()
                    );
                } else {
                    info!(
                        "{} ✓ 回答完成，共 {} 字符",
                        ctx,
                        capture.text.chars().count()
                    );
                }
                Ok(CaptureOutcome::Captured {
                    text: capture.text,
                    low_confidence: capture.low_confidence,
                })
            }
            Err(e) if e.is_question_local() => self.fail(ctx, prompt, e).await,
            Err(e) => Err(e.into()),
        }
    }

    /// 题目级失败：写入 warn.txt 并返回 Failed 结果
    async fn fail(
        &self,
        ctx: &QuestionCtx,
        prompt: &str,
        error: AppError,
    ) -> Result<CaptureOutcome> {
        let reason = error.to_string();
        warn!("{} ⚠️ 本题失败: {}", ctx, reason);

        self.warn_writer
            .write(
                &ctx.profile_name,
                ctx.question_index,
                &reason,
                &truncate_text(prompt, 120),
            )
            .await?;

        Ok(CaptureOutcome::Failed { reason })
    }

    // ========== 日志辅助方法 ==========

    /// 显示题目预览
    fn log_prompt(&self, ctx: &QuestionCtx, prompt: &str) {
        info!("{} 题目: {}", ctx, truncate_text(prompt, 80));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionStatus;

    #[test]
    fn test_apply_captured_outcome() {
        let mut record = QuestionRecord::new("问题");
        let outcome = CaptureOutcome::Captured {
            text: "回答".to_string(),
            low_confidence: false,
        };
        outcome.apply_to(&mut record, 4.2);

        assert_eq!(record.status, QuestionStatus::Success);
        assert_eq!(record.response.as_deref(), Some("回答"));
        assert_eq!(record.elapsed_secs, Some(4.2));
    }

    #[test]
    fn test_apply_failed_outcome_discards_elapsed() {
        let mut record = QuestionRecord::new("问题");
        let outcome = CaptureOutcome::Failed {
            reason: "等待回答超时".to_string(),
        };
        outcome.apply_to(&mut record, 60.0);

        assert_eq!(record.status, QuestionStatus::Failed);
        assert!(record.response.is_none());
        // 失败的题目不保留耗时
        assert!(record.elapsed_secs.is_none());
        assert_eq!(record.error_reason.as_deref(), Some("等待回答超时"));
    }

    #[test]
    fn test_apply_low_confidence_outcome() {
        let mut record = QuestionRecord::new("问题");
        let outcome = CaptureOutcome::Captured {
            text: "截断的回答".to_string(),
            low_confidence: true,
        };
        outcome.apply_to(&mut record, 61.0);

        // 低置信度截取是成功而不是失败
        assert_eq!(record.status, QuestionStatus::Success);
        assert_eq!(record.low_confidence, Some(true));
    }
}
