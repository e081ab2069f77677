//! 交互驱动 - 业务能力层
//!
//! 针对一个目标配置执行底层 UI 动作：导航、定位输入框、写入题目、
//! 触发提交。只处理单个题目，不关心流程顺序。
//!
//! 所有目标共用同一套驱动逻辑，站点之间的差异完全由 TargetProfile
//! 的数据描述，新增站点不需要新的驱动代码。

use std::time::Duration;

use chromiumoxide::{Element, Page};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::JsExecutor;
use crate::models::{SubmissionMode, TargetProfile};

/// 元素轮询间隔
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 聚焦后、提交前的停顿，模仿人工操作的节奏
const FOCUS_SETTLE_DELAY: Duration = Duration::from_millis(300);
const PRE_SUBMIT_DELAY: Duration = Duration::from_millis(500);

/// 压制 navigator.webdriver 特征，部分站点以此识别自动化
const WEBDRIVER_SUPPRESS_JS: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";

/// 提交回执
///
/// 提交是不可回滚的副作用：文本已写入页面、可能已发往远端。
/// 回执只证明"提交动作执行完毕"，不保证远端收到。
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    /// 提交动作完成的时刻
    pub submitted_at: chrono::DateTime<chrono::Local>,
}

/// 交互驱动
pub struct InteractionDriver {
    /// 等待元素出现的上限
    element_wait: Duration,
}

impl InteractionDriver {
    pub fn new(config: &Config) -> Self {
        Self {
            element_wait: Duration::from_secs(config.element_wait_secs),
        }
    }

    /// 如果当前不在目标页面则导航过去，已在目标站点时不做任何事
    pub async fn navigate_if_needed(
        &self,
        executor: &JsExecutor,
        profile: &TargetProfile,
    ) -> AppResult<()> {
        let page = executor.page();

        if let Ok(Some(current)) = page.url().await {
            if same_site(&current, &profile.address) {
                debug!("已在目标站点，跳过导航: {}", current);
                return Ok(());
            }
        }

        info!("🌐 正在打开 {} ...", profile.address);
        page.goto(profile.address.as_str()).await?;
        // 部分站点首屏之后还有长连接，导航完成信号不可靠，失败不致命
        let _ = page.wait_for_navigation().await;
        let _ = executor.eval(WEBDRIVER_SUPPRESS_JS).await;

        Ok(())
    }

    /// 提交一个题目
    ///
    /// 流程：定位输入框 → 聚焦 → 写入文本 → 按配置触发提交。
    /// 任一步骤失败都可能让页面停留在不确定状态（例如文本已写入但
    /// 按钮点击失败），此时不尝试清理，因为远端是否已收到无从得知。
    pub async fn submit(
        &self,
        executor: &JsExecutor,
        profile: &TargetProfile,
        prompt: &str,
    ) -> AppResult<SubmissionReceipt> {
        let page = executor.page();

        let input = self
            .wait_for_element(page, &profile.input_locator)
            .await?;
        input.click().await?;
        sleep(FOCUS_SETTLE_DELAY).await;

        self.insert_prompt(executor, &profile.input_locator, prompt)
            .await?;
        sleep(PRE_SUBMIT_DELAY).await;

        match profile.submission_mode {
            SubmissionMode::KeyTrigger => {
                debug!("按回车提交");
                input.press_key("Enter").await?;
            }
            SubmissionMode::ButtonClick => {
                // validate 保证按钮模式下 submit_locator 存在
                let locator = profile.submit_locator.as_deref().unwrap_or_default();
                debug!("点击提交按钮: {}", locator);
                let button = self.wait_for_element(page, locator).await?;
                button.click().await?;
            }
        }

        Ok(SubmissionReceipt {
            submitted_at: chrono::Local::now(),
        })
    }

    /// 通过 insertText 写入文本
    ///
    /// 直接设置 value 不会触发 React/Vue 的输入事件，contenteditable
    /// 的输入框也处理不了，所以统一走 execCommand 插入
    async fn insert_prompt(
        &self,
        executor: &JsExecutor,
        selector: &str,
        prompt: &str,
    ) -> AppResult<()> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({selector});
                if (!el) {{
                    return false;
                }}
                el.focus();
                document.execCommand('selectAll', false, null);
                document.execCommand('insertText', false, {text});
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return true;
            }})()
            "#,
            selector = serde_json::to_string(selector)?,
            text = serde_json::to_string(prompt)?,
        );

        let inserted: bool = executor.eval_as(js_code).await?;
        if !inserted {
            return Err(AppError::element_not_found(selector, 0));
        }
        Ok(())
    }

    /// 在限定时间内等待元素出现
    async fn wait_for_element(&self, page: &Page, selector: &str) -> AppResult<Element> {
        let deadline = Instant::now() + self.element_wait;
        loop {
            if let Ok(element) = page.find_element(selector).await {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(AppError::element_not_found(
                    selector,
                    self.element_wait.as_secs(),
                ));
            }
            sleep(ELEMENT_POLL_INTERVAL).await;
        }
    }
}

/// 判断当前 URL 是否已经在目标地址所在的站点
///
/// 登录后站点经常跳转到会话子路径，只要主机一致就不重新导航
fn same_site(current: &str, target: &str) -> bool {
    let normalize = |s: &str| s.trim_end_matches('/').to_string();
    if normalize(current) == normalize(target) {
        return true;
    }

    match (url::Url::parse(current), url::Url::parse(target)) {
        (Ok(c), Ok(t)) => c.host_str().is_some() && c.host_str() == t.host_str(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_site_exact_match() {
        assert!(same_site("https://chatgpt.com", "https://chatgpt.com"));
        assert!(same_site("https://chatgpt.com/", "https://chatgpt.com"));
    }

    #[test]
    fn test_same_site_subpath() {
        // 登录后跳转到会话页，不应该重新导航
        assert!(same_site(
            "https://chatgpt.com/c/abc123",
            "https://chatgpt.com"
        ));
        assert!(same_site(
            "https://claude.ai/chat/xyz",
            "https://claude.ai"
        ));
    }

    #[test]
    fn test_same_site_different_host() {
        assert!(!same_site("https://chatgpt.com", "https://claude.ai"));
        assert!(!same_site("about:blank", "https://claude.ai"));
    }
}
