//! 操作者控制信号
//!
//! 控制面（按钮、终端、信号）在引擎之外，这里只定义两个挂起点：
//! - 取消：在题目之间检查，当前题目会处理到终态再停
//! - 登录确认：未登录且有头模式时，主循环挂起等待操作者确认

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// 一次运行的控制信号
#[derive(Debug, Default)]
pub struct RunControls {
    cancel: CancellationToken,
    login_confirmed: Notify,
}

impl RunControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消运行
    ///
    /// 当前在途题目会处理到终态，之后的题目保持待处理状态
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// 是否已请求取消
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 挂起直到取消被请求
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// 操作者确认已完成人工登录
    pub fn confirm_login(&self) {
        self.login_confirmed.notify_one();
    }

    /// 挂起直到操作者确认登录
    pub async fn wait_login_confirmed(&self) {
        self.login_confirmed.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_is_sticky() {
        let controls = RunControls::new();
        assert!(!controls.is_cancelled());

        controls.request_cancel();
        assert!(controls.is_cancelled());
        // 再次请求没有副作用
        controls.request_cancel();
        assert!(controls.is_cancelled());
    }

    #[tokio::test]
    async fn test_login_confirm_wakes_waiter() {
        let controls = Arc::new(RunControls::new());

        let waiter = {
            let controls = controls.clone();
            tokio::spawn(async move {
                controls.wait_login_confirmed().await;
            })
        };

        // 给等待方一点时间挂起
        tokio::time::sleep(Duration::from_millis(50)).await;
        controls.confirm_login();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("确认后等待方应当被唤醒")
            .expect("等待任务不应 panic");
    }

    #[tokio::test]
    async fn test_login_confirm_before_wait_is_not_lost() {
        let controls = RunControls::new();
        // 操作者先点了确认，之后主循环才开始等待：许可不应丢失
        controls.confirm_login();

        tokio::time::timeout(Duration::from_millis(200), controls.wait_login_confirmed())
            .await
            .expect("已有确认许可时等待应当立即返回");
    }
}
