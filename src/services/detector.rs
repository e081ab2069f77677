//! 完成探测 - 业务能力层
//!
//! 没有任何目标站点暴露统一可靠的"回答完成"事件，只能从页面现象
//! 推断。这里把推断逻辑表达成显式状态机：
//!
//! ```text
//! Submitted ──忙碌指示出现──▶ Busy ──指示消失 且 文本稳定──▶ Settled
//!     │                        │
//!     └────────预算耗尽─────────┴──────────────────────────▶ TimedOut
//! ```
//!
//! 指示消失与文本稳定必须同时满足：部分站点会在最后一段文本刷出之前
//! 先移除忙碌指示，单看任何一个信号都会提前误判。没有配置忙碌指示
//! 的目标退化为固定等待。
//!
//! 对页面的观察收敛在 PageObserver 之后，测试用注入的观察序列驱动
//! 状态机，不需要真实浏览器。

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::JsExecutor;
use crate::models::TargetProfile;

/// 探测状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// 提交刚完成，等待忙碌指示出现
    Submitted,
    /// 目标正在生成回答
    Busy,
    /// 回答已稳定（终态）
    Settled,
    /// 等待预算耗尽（终态）
    TimedOut,
}

/// 采集结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// 回答文本
    pub text: String,
    /// 是在预算耗尽后截取的，内容可能不完整
    pub low_confidence: bool,
}

/// 页面观察接口
///
/// 每个轮询周期观察一次：忙碌指示是否可见、当前输出文本是什么
pub trait PageObserver {
    /// 忙碌指示元素当前是否存在
    fn busy_visible(&self) -> impl std::future::Future<Output = AppResult<bool>> + Send;

    /// 当前最后一个回答容器的文本，没有匹配元素时为 None
    fn output_text(&self) -> impl std::future::Future<Output = AppResult<Option<String>>> + Send;
}

/// 完成探测器
pub struct CompletionDetector {
    /// 轮询间隔
    poll_interval: Duration,
    /// 等待忙碌指示出现的窗口；超过后视为已经越过忙碌阶段
    busy_appear_window: Duration,
    /// 忙碌指示消失后，输出持续为空多少个轮询周期判定为没有输出
    output_grace_polls: u32,
}

impl Default for CompletionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionDetector {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            busy_appear_window: Duration::from_secs(5),
            output_grace_polls: 4,
        }
    }

    /// 使用自定义轮询间隔创建（测试用）
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Self::new()
        }
    }

    /// 等待回答完成并提取文本
    ///
    /// 进入时认为提交刚刚完成。返回 Ok 表示拿到了文本（可能是
    /// 低置信度的截断文本）；Err 表示本题失败。
    pub async fn wait_for_settle<O: PageObserver>(
        &self,
        observer: &O,
        profile: &TargetProfile,
    ) -> AppResult<Capture> {
        match profile.busy_locator {
            Some(_) => self.wait_with_busy_signal(observer, profile).await,
            None => self.wait_fixed(observer, profile).await,
        }
    }

    /// 没有忙碌指示的目标：固定等待后直接取文本
    async fn wait_fixed<O: PageObserver>(
        &self,
        observer: &O,
        profile: &TargetProfile,
    ) -> AppResult<Capture> {
        debug!("无忙碌指示，固定等待 {} 秒", profile.fixed_wait_secs);
        sleep(Duration::from_secs(profile.fixed_wait_secs)).await;

        match non_empty(observer.output_text().await?) {
            Some(text) => Ok(Capture {
                text,
                low_confidence: false,
            }),
            None => Err(AppError::output_not_found(&profile.output_locator)),
        }
    }

    /// 有忙碌指示的目标：驱动状态机直到终态
    async fn wait_with_busy_signal<O: PageObserver>(
        &self,
        observer: &O,
        profile: &TargetProfile,
    ) -> AppResult<Capture> {
        let deadline = Instant::now() + Duration::from_secs(profile.wait_budget_secs);
        let appear_deadline = Instant::now() + self.busy_appear_window;

        let mut state = DetectorState::Submitted;
        let mut last_text: Option<String> = None;
        let mut empty_polls: u32 = 0;

        loop {
            if Instant::now() >= deadline {
                return self
                    .finish_timed_out(observer, profile, last_text.take())
                    .await;
            }

            match state {
                DetectorState::Submitted => {
                    if observer.busy_visible().await? {
                        debug!("状态转移: {:?} -> {:?} (忙碌指示出现)", state, DetectorState::Busy);
                        state = DetectorState::Busy;
                    } else if Instant::now() >= appear_deadline {
                        // 生成可能太快，忙碌阶段在两次观察之间已经结束
                        debug!(
                            "状态转移: {:?} -> {:?} (指示一直未出现，视为已越过)",
                            state,
                            DetectorState::Busy
                        );
                        state = DetectorState::Busy;
                    }
                }
                DetectorState::Busy => {
                    let busy = observer.busy_visible().await?;
                    let text = non_empty(observer.output_text().await?);

                    if busy {
                        empty_polls = 0;
                    } else {
                        match (&last_text, &text) {
                            (Some(prev), Some(current)) if prev == current => {
                                debug!(
                                    "状态转移: {:?} -> {:?} (指示消失且文本稳定)",
                                    state,
                                    DetectorState::Settled
                                );
                                return Ok(Capture {
                                    text: current.clone(),
                                    low_confidence: false,
                                });
                            }
                            (_, None) => {
                                empty_polls += 1;
                                if empty_polls >= self.output_grace_polls {
                                    debug!(
                                        "状态转移: {:?} -> {:?} (指示消失但没有任何输出)",
                                        state,
                                        DetectorState::Settled
                                    );
                                    return Err(AppError::output_not_found(
                                        &profile.output_locator,
                                    ));
                                }
                            }
                            _ => {
                                // 指示已消失但文本还在变化，继续等它稳定
                                empty_polls = 0;
                            }
                        }
                    }
                    last_text = text;
                }
                DetectorState::Settled | DetectorState::TimedOut => {
                    // 终态在上面直接 return，不会走到这里
                    break;
                }
            }

            sleep(self.poll_interval).await;
        }

        self.finish_timed_out(observer, profile, last_text).await
    }

    /// 预算耗尽：已经出现的文本不丢弃，标记为低置信度返回
    ///
    /// 很多目标在预算之外仍在继续输出，此时截取到的内容依然有价值
    async fn finish_timed_out<O: PageObserver>(
        &self,
        observer: &O,
        profile: &TargetProfile,
        last_text: Option<String>,
    ) -> AppResult<Capture> {
        debug!("状态转移: -> {:?} (等待预算耗尽)", DetectorState::TimedOut);
        let text = match observer.output_text().await {
            Ok(current) => non_empty(current).or(last_text),
            Err(_) => last_text,
        };

        match text {
            Some(text) => {
                warn!(
                    "⚠️ 等待超时 ({} 秒)，截取当前已输出的 {} 字符",
                    profile.wait_budget_secs,
                    text.chars().count()
                );
                Ok(Capture {
                    text,
                    low_confidence: true,
                })
            }
            None => Err(AppError::capture_timeout(profile.wait_budget_secs)),
        }
    }
}

/// 把空白文本归一成 None
fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

// ========== 真实页面观察 ==========

/// 基于 JsExecutor 的页面观察实现
pub struct LivePageObserver<'a> {
    executor: &'a JsExecutor,
    profile: &'a TargetProfile,
}

impl<'a> LivePageObserver<'a> {
    pub fn new(executor: &'a JsExecutor, profile: &'a TargetProfile) -> Self {
        Self { executor, profile }
    }
}

impl PageObserver for LivePageObserver<'_> {
    async fn busy_visible(&self) -> AppResult<bool> {
        let Some(busy_locator) = self.profile.busy_locator.as_deref() else {
            return Ok(false);
        };

        let js_code = format!(
            "(() => document.querySelector({}) !== null)()",
            serde_json::to_string(busy_locator)?
        );
        self.executor.eval_as(js_code).await
    }

    async fn output_text(&self) -> AppResult<Option<String>> {
        // 服务端通常是追加新的回答块而不是替换，取最后一个
        let js_code = format!(
            r#"
            (() => {{
                const nodes = document.querySelectorAll({});
                if (nodes.length === 0) {{
                    return null;
                }}
                const text = nodes[nodes.length - 1].innerText;
                return text === undefined || text === null ? null : text;
            }})()
            "#,
            serde_json::to_string(self.profile.output_locator.as_str())?
        );
        self.executor.eval_as(js_code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 一次观察：忙碌指示是否可见 + 当前输出文本
    #[derive(Debug, Clone)]
    struct Observation {
        busy: bool,
        text: Option<&'static str>,
    }

    fn obs(busy: bool, text: Option<&'static str>) -> Observation {
        Observation { busy, text }
    }

    /// 注入观察序列的假观察者
    ///
    /// 每次 busy_visible 调用推进一步，序列耗尽后停在最后一步
    struct FakeObserver {
        steps: Mutex<VecDeque<Observation>>,
        current: Mutex<Observation>,
    }

    impl FakeObserver {
        fn new(steps: Vec<Observation>) -> Self {
            let mut queue: VecDeque<Observation> = steps.into();
            let first = queue.pop_front().unwrap_or(obs(false, None));
            Self {
                steps: Mutex::new(queue),
                current: Mutex::new(first),
            }
        }
    }

    impl PageObserver for FakeObserver {
        async fn busy_visible(&self) -> AppResult<bool> {
            let current = self.current.lock().unwrap().clone();
            Ok(current.busy)
        }

        async fn output_text(&self) -> AppResult<Option<String>> {
            let current = self.current.lock().unwrap().clone();
            // 一次完整观察以读取文本结束，之后推进到下一步
            if let Some(next) = self.steps.lock().unwrap().pop_front() {
                *self.current.lock().unwrap() = next;
            }
            Ok(current.text.map(|t| t.to_string()))
        }
    }

    fn profile_with_busy() -> TargetProfile {
        TargetProfile {
            name: "测试目标".to_string(),
            address: "https://example.com".to_string(),
            input_locator: "#input".to_string(),
            output_locator: ".answer".to_string(),
            submission_mode: crate::models::SubmissionMode::KeyTrigger,
            submit_locator: None,
            busy_locator: Some(".stop-button".to_string()),
            fixed_wait_secs: 1,
            wait_budget_secs: 30,
        }
    }

    fn profile_without_busy() -> TargetProfile {
        TargetProfile {
            busy_locator: None,
            ..profile_with_busy()
        }
    }

    fn detector() -> CompletionDetector {
        CompletionDetector::with_poll_interval(Duration::from_millis(100))
    }

    #[tokio::test(start_paused = true)]
    async fn test_settles_when_busy_gone_and_text_stable() {
        let observer = FakeObserver::new(vec![
            obs(true, None),
            obs(true, Some("答案是")),
            obs(false, Some("答案是 42")),
            obs(false, Some("答案是 42")),
        ]);

        let capture = detector()
            .wait_for_settle(&observer, &profile_with_busy())
            .await
            .expect("应当成功采集");

        assert_eq!(capture.text, "答案是 42");
        assert!(!capture.low_confidence);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tolerates_busy_vanishing_before_text_flush() {
        // 忙碌指示先消失，最后一段文本随后才刷出：不能在指示消失的
        // 瞬间就判定完成
        let observer = FakeObserver::new(vec![
            obs(true, Some("第一段")),
            obs(false, None),
            obs(false, Some("第一段 第二段")),
            obs(false, Some("第一段 第二段")),
        ]);

        let capture = detector()
            .wait_for_settle(&observer, &profile_with_busy())
            .await
            .expect("应当成功采集");

        assert_eq!(capture.text, "第一段 第二段");
        assert!(!capture.low_confidence);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_with_partial_text_is_low_confidence_capture() {
        // 忙碌指示一直不消失，但页面上已经有输出：
        // 超时不是失败，截取已有文本并标记低置信度
        let mut profile = profile_with_busy();
        profile.wait_budget_secs = 1;

        let observer = FakeObserver::new(vec![obs(true, Some("写到一半的回答"))]);

        let capture = detector()
            .wait_for_settle(&observer, &profile)
            .await
            .expect("超时但有文本时不应失败");

        assert_eq!(capture.text, "写到一半的回答");
        assert!(capture.low_confidence);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_text_is_error() {
        let mut profile = profile_with_busy();
        profile.wait_budget_secs = 1;

        let observer = FakeObserver::new(vec![obs(true, None)]);

        let result = detector().wait_for_settle(&observer, &profile).await;
        let err = result.expect_err("超时且没有任何文本应当失败");
        assert!(err.is_question_local());
        assert!(err.to_string().contains("超时"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_gone_but_no_output_is_output_not_found() {
        let observer = FakeObserver::new(vec![obs(true, None), obs(false, None)]);

        let result = detector()
            .wait_for_settle(&observer, &profile_with_busy())
            .await;
        let err = result.expect_err("没有输出节点应当失败");
        assert!(err.to_string().contains(".answer"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_wait_without_busy_locator() {
        let observer = FakeObserver::new(vec![obs(false, Some("固定等待后的回答"))]);

        let capture = detector()
            .wait_for_settle(&observer, &profile_without_busy())
            .await
            .expect("应当成功采集");

        assert_eq!(capture.text, "固定等待后的回答");
        assert!(!capture.low_confidence);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_wait_without_output_fails() {
        let observer = FakeObserver::new(vec![obs(false, None)]);

        let result = detector()
            .wait_for_settle(&observer, &profile_without_busy())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_still_changing_keeps_waiting() {
        // 指示消失后文本仍在增长：要等到连续两次观察一致才算完成
        let observer = FakeObserver::new(vec![
            obs(true, None),
            obs(false, Some("A")),
            obs(false, Some("AB")),
            obs(false, Some("ABC")),
            obs(false, Some("ABC")),
        ]);

        let capture = detector()
            .wait_for_settle(&observer, &profile_with_busy())
            .await
            .expect("应当成功采集");

        assert_eq!(capture.text, "ABC");
    }
}
