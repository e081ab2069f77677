//! 单次运行处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块按输入顺序逐题处理一份题目清单，是运行级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **严格串行**：同一会话内题目绝不并行，避免输入/输出元素串扰
//! 2. **失败隔离**：单个题目失败只记录原因，运行继续
//! 3. **取消检查**：只在题目之间检查取消请求，在途题目处理到终态
//! 4. **节流冷却**：相邻题目之间停顿，降低被目标限流的概率
//! 5. **进度事件**：每题结束后发出一个事件，发送绝不阻塞
//! 6. **统计输出**：记录成功/失败/跳过数量

use std::time::Duration;

use anyhow::Result;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::{QuestionSheet, TargetProfile};
use crate::orchestrator::controls::RunControls;
use crate::services::{ProgressEvent, ProgressSender};
use crate::workflow::{CaptureOutcome, QuestionCtx, QuestionFlow};

/// 运行统计
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// 运行开始前就已处于终态、被跳过的题目（重跑场景）
    pub skipped: usize,
    /// 运行是否因取消而提前结束
    pub cancelled: bool,
}

/// 处理一份题目清单
///
/// # 参数
/// - `executor`: JS 执行器（持有 page）
/// - `profile`: 目标配置（已通过校验）
/// - `sheet`: 题目清单，结果就地写回
/// - `controls`: 操作者控制信号
/// - `progress`: 进度事件发送端
/// - `config`: 配置
///
/// # 返回
/// 返回运行统计
pub async fn process_run(
    executor: &JsExecutor,
    profile: &TargetProfile,
    sheet: &mut QuestionSheet,
    controls: &RunControls,
    progress: &ProgressSender,
    config: &Config,
) -> Result<RunSummary> {
    let total = sheet.questions.len();
    let mut summary = RunSummary {
        total,
        ..Default::default()
    };

    log_run_start(&profile.name, sheet);

    // 创建流程对象（只创建一次，复用）
    let question_flow = QuestionFlow::new(config);
    let cooldown = Duration::from_secs(config.question_cooldown_secs);

    // ========== 按输入顺序遍历所有题目 ==========
    for (index, record) in sheet.questions.iter_mut().enumerate() {
        let question_index = index + 1;

        // 取消只在题目之间生效，在途题目已经处理到了终态
        if controls.is_cancelled() {
            summary.cancelled = true;
            warn!(
                "🛑 收到取消请求，停止运行；题目 {}..{} 保持待处理状态",
                question_index, total
            );
            break;
        }

        // 重跑时跳过已有结果的题目
        if !record.is_pending() {
            info!(
                "[题目 {}/{}] 已处理过 ({})，跳过",
                question_index, total, record.status
            );
            summary.skipped += 1;
            continue;
        }

        log_question_start(question_index, total);

        let prompt = record.prompt.trim().to_string();
        if prompt.is_empty() {
            warn!("[题目 {}/{}] ⚠️ 题目内容为空，跳过", question_index, total);
            record.mark_failed("题目内容为空");
            summary.failed += 1;
            progress.send(ProgressEvent::from_record(question_index, total, record));
            continue;
        }

        let ctx = QuestionCtx::new(profile.name.clone(), question_index, total);
        let started = Instant::now();

        // 执行流程（委托给 QuestionFlow）
        match question_flow.run(executor, profile, &prompt, &ctx).await {
            Ok(outcome) => {
                let elapsed_secs = round_secs(started.elapsed().as_secs_f64());
                match &outcome {
                    CaptureOutcome::Captured { .. } => summary.success += 1,
                    CaptureOutcome::Failed { .. } => summary.failed += 1,
                }
                outcome.apply_to(record, elapsed_secs);
            }
            Err(e) => {
                // 流程层之外的意外错误同样只影响本题
                error!("{} ❌ 处理过程中发生错误: {}", ctx, e);
                record.mark_failed(e.to_string());
                summary.failed += 1;
            }
        }

        progress.send(ProgressEvent::from_record(question_index, total, record));

        // 相邻题目之间冷却，最后一题之后不需要
        if question_index < total && !controls.is_cancelled() {
            sleep(cooldown).await;
        }
    }

    log_run_complete(&summary);
    Ok(summary)
}

/// 耗时保留两位小数
fn round_secs(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

// ========== 日志辅助函数 ==========

fn log_run_start(profile_name: &str, sheet: &QuestionSheet) {
    info!("开始处理，目标: {}", profile_name);
    if let Some(name) = &sheet.name {
        info!("清单名称: {}", name);
    }
    info!("题目总数: {}", sheet.questions.len());
}

fn log_question_start(question_index: usize, total: usize) {
    info!("\n{}", "─".repeat(30));
    info!("处理第 {}/{} 道题目", question_index, total);
}

fn log_run_complete(summary: &RunSummary) {
    info!(
        "题目统计: 成功 {}, 失败 {}, 跳过 {}, 总计 {}",
        summary.success, summary.failed, summary.skipped, summary.total
    );
    if summary.cancelled {
        info!("\n🛑 运行已取消，未处理的题目可下次继续\n");
    } else {
        info!("\n✅ 清单处理完成\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_secs() {
        assert_eq!(round_secs(1.23456), 1.23);
        assert_eq!(round_secs(59.999), 60.0);
        assert_eq!(round_secs(0.0), 0.0);
    }
}
