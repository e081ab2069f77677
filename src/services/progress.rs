//! 进度事件 - 业务能力层
//!
//! 每处理完一个题目就发出一个事件，供展示层渲染。
//! 发送是 fire-and-forget：消费者再慢也不会阻塞采集主循环，
//! 投递语义为 at-least-once、保持顺序，去重由消费者负责。

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::models::{QuestionRecord, QuestionStatus};

/// 单个题目的进度事件
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// 题目序号（从 1 开始）
    pub question_index: usize,
    /// 题目总数
    pub total: usize,
    /// 终态
    pub status: QuestionStatus,
    /// 耗时（秒），失败时为空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_secs: Option<f64>,
    /// 失败原因
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// 回答是否为低置信度截取
    pub low_confidence: bool,
}

impl ProgressEvent {
    /// 从一条已到达终态的记录构造事件
    pub fn from_record(question_index: usize, total: usize, record: &QuestionRecord) -> Self {
        Self {
            question_index,
            total,
            status: record.status,
            elapsed_secs: record.elapsed_secs,
            error_reason: record.error_reason.clone(),
            low_confidence: record.low_confidence.unwrap_or(false),
        }
    }
}

/// 进度事件发送端
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSender {
    /// 创建一对发送端/接收端
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// 发送一个事件
    ///
    /// 消费者已退出时静默丢弃，绝不让主循环等待
    pub fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// 启动默认的进度消费者：把事件逐条打到日志
pub fn spawn_progress_logger(
    mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.status {
                QuestionStatus::Success => {
                    let mark = if event.low_confidence { "⚠️" } else { "✓" };
                    info!(
                        "{} 题目 {}/{} 完成，耗时 {:.2} 秒",
                        mark,
                        event.question_index,
                        event.total,
                        event.elapsed_secs.unwrap_or(0.0)
                    );
                }
                QuestionStatus::Failed => {
                    info!(
                        "❌ 题目 {}/{} 失败: {}",
                        event.question_index,
                        event.total,
                        event.error_reason.as_deref().unwrap_or("未知原因")
                    );
                }
                QuestionStatus::Pending => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn test_from_record_success() {
        let mut record = QuestionRecord::new("问题");
        record.mark_success("回答".to_string(), 2.5, false);

        let event = ProgressEvent::from_record(3, 10, &record);
        assert_eq!(event.question_index, 3);
        assert_eq!(event.total, 10);
        assert_eq!(event.status, QuestionStatus::Success);
        assert_eq!(event.elapsed_secs, Some(2.5));
        assert!(event.error_reason.is_none());
        assert!(!event.low_confidence);
    }

    #[test]
    fn test_from_record_failed_carries_reason() {
        let mut record = QuestionRecord::new("问题");
        record.mark_failed("等待 10 秒后仍未找到元素: #input");

        let event = ProgressEvent::from_record(1, 1, &record);
        assert_eq!(event.status, QuestionStatus::Failed);
        assert!(event.elapsed_secs.is_none());
        // 失败事件必须携带可读的原因文本
        assert!(event
            .error_reason
            .as_deref()
            .is_some_and(|r| r.contains("未找到元素")));
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_does_not_block() {
        let (sender, rx) = ProgressSender::channel();
        drop(rx);

        let mut record = QuestionRecord::new("问题");
        record.mark_success("回答".to_string(), 1.0, false);

        // 消费者已退出时发送应当直接返回
        tokio_test::assert_ok!(tokio::time::timeout(
            std::time::Duration::from_millis(100),
            async {
                sender.send(ProgressEvent::from_record(1, 1, &record));
            }
        )
        .await);
    }

    #[tokio::test]
    async fn test_events_preserve_order() {
        let (sender, mut rx) = ProgressSender::channel();

        for i in 1..=3 {
            let mut record = QuestionRecord::new(format!("问题{}", i));
            record.mark_success("回答".to_string(), i as f64, false);
            sender.send(ProgressEvent::from_record(i, 3, &record));
        }

        for expected in 1..=3 {
            let event = rx.recv().await.expect("应当收到事件");
            assert_eq!(event.question_index, expected);
        }
    }
}
